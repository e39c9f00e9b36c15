//! # Groovy Sandbox Scripting
//!
//! Runs Groovy-flavoured message transforms inside a bounded interpreter.
//!
//! ## Pipeline
//!
//! 1. **Classify** - generic script or host-style `processData(Message)`
//! 2. **Normalize** - drop imports the host layer already provides
//! 3. **Extract** - pull the `processData` body out of host-style scripts
//! 4. **Rewrite** - translate Groovy syntax into the interpreter's dialect
//! 5. **Execute** - run against the emulated host API with operation,
//!    size and wall-clock ceilings
//!
//! ```no_run
//! use groovy_sandbox_config::SandboxConfig;
//! use groovy_sandbox_core::ScriptRequest;
//! use groovy_sandbox_scripting::TransformEngine;
//! use serde_json::json;
//!
//! let engine = TransformEngine::new(SandboxConfig::default());
//! let request = ScriptRequest::new("body.doble = body.valor * 2", json!({"valor": 100}));
//! let result = engine.execute(&request).unwrap();
//! assert_eq!(result.transformed_payload, json!({"valor": 100, "doble": 200}));
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod classifier;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod extractor;
mod host;
pub mod lexer;
pub mod normalizer;
pub mod rewriter;
pub mod sandbox;

pub use classifier::classify;
pub use diagnostics::declared_variables;
pub use engine::{ExecutionFailure, TransformEngine};
pub use error::{Result, ScriptError};
pub use extractor::{extract_entry_point, EntryPoint};
pub use host::{HostMessage, LogSink};
pub use normalizer::normalize_imports;
pub use rewriter::{rewrite, RewrittenProgram};
pub use sandbox::{ExecutionOutput, ExecutionPlan, RhaiSandbox, ScriptExecutor};

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::engine::{ExecutionFailure, TransformEngine};
    pub use crate::error::{Result, ScriptError};
    pub use crate::sandbox::{ExecutionPlan, ScriptExecutor};
    pub use groovy_sandbox_core::{ExecutionResult, Payload, ScriptRequest, TransformResponse};
}
