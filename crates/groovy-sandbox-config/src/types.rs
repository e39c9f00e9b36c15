//! Configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter resource ceilings
    pub limits: LimitsConfig,

    /// Request-level engine settings
    pub engine: EngineConfig,

    /// Logging
    pub logging: LoggingConfig,
}

/// Interpreter resource ceilings applied to every execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum interpreter operations per execution
    pub max_operations: u64,

    /// Maximum function call nesting
    pub max_call_levels: usize,

    /// Maximum expression nesting at global level
    pub max_expr_depth: usize,

    /// Maximum expression nesting inside closures
    pub max_function_expr_depth: usize,

    /// Maximum string length (bytes)
    pub max_string_size: usize,

    /// Maximum array length
    pub max_array_size: usize,

    /// Maximum map size
    pub max_map_size: usize,

    /// Wall-clock budget per execution
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: 32,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 1024 * 1024,
            max_array_size: 100_000,
            max_map_size: 100_000,
            timeout: default_timeout(),
        }
    }
}

/// Request-level engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted script (bytes)
    pub max_script_size: usize,

    /// Log entries kept per execution; further entries are dropped
    pub max_log_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_script_size: 256 * 1024,
            max_log_entries: 10_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

fn default_max_operations() -> u64 {
    1_000_000
}

fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.limits.max_operations, 1_000_000);
        assert_eq!(config.limits.timeout, Duration::from_secs(2));
        assert_eq!(config.engine.max_log_entries, 10_000);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: SandboxConfig =
            serde_json::from_str(r#"{"limits": {"timeout": "500ms"}}"#).unwrap();
        assert_eq!(config.limits.timeout, Duration::from_millis(500));
        assert_eq!(config.limits.max_call_levels, 32);
        assert_eq!(config.logging.level, "info");
    }
}
