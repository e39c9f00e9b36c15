//! # Groovy Sandbox Core
//!
//! Core types and error handling shared by the transform engine crates.
//!
//! This crate provides the foundational data model:
//! - Script requests and payloads
//! - Execution results and the serialized response contract
//! - Diagnostics and pipeline stages
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod request;
pub mod response;
pub mod types;

pub use error::{Error, Result};
pub use request::{Payload, ScriptRequest};
pub use response::{ExecutionResult, TransformResponse};
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::request::{Payload, ScriptRequest};
    pub use crate::response::{ExecutionResult, TransformResponse};
    pub use crate::types::*;
}
