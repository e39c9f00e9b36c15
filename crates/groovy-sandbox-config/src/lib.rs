//! # Groovy Sandbox Configuration
//!
//! Execution limits, engine settings and logging for the sandbox, read from
//! a YAML, TOML or JSON file. `${VAR}` and `${VAR:-default}` references are
//! expanded from the environment before parsing, and every loaded config is
//! validated. Without a file the built-in defaults apply.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builder;
pub mod loader;
pub mod types;
pub mod validator;

pub use builder::ConfigBuilder;
pub use loader::{load_config, load_from_file, load_from_str};
pub use types::{EngineConfig, LimitsConfig, LogFormat, LoggingConfig, SandboxConfig};
pub use validator::validate_config;

use groovy_sandbox_core::{Error, Result};
use std::path::Path;

/// Serialization format of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension, ignoring case
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(Error::Config(format!(
                "{}: expected a .yaml, .yml, .toml or .json config file",
                path.display()
            ))),
        }
    }
}
