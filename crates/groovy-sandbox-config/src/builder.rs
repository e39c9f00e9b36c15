//! Configuration builder

use crate::types::{LogFormat, SandboxConfig};
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: SandboxConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation ceiling
    pub fn max_operations(mut self, max_operations: u64) -> Self {
        self.config.limits.max_operations = max_operations;
        self
    }

    /// Set the wall-clock timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.limits.timeout = timeout;
        self
    }

    /// Set the maximum array size
    pub fn max_array_size(mut self, max_array_size: usize) -> Self {
        self.config.limits.max_array_size = max_array_size;
        self
    }

    /// Set the maximum string size
    pub fn max_string_size(mut self, max_string_size: usize) -> Self {
        self.config.limits.max_string_size = max_string_size;
        self
    }

    /// Set the largest accepted script
    pub fn max_script_size(mut self, max_script_size: usize) -> Self {
        self.config.engine.max_script_size = max_script_size;
        self
    }

    /// Set the per-execution log cap
    pub fn max_log_entries(mut self, max_log_entries: usize) -> Self {
        self.config.engine.max_log_entries = max_log_entries;
        self
    }

    /// Set log level and format
    pub fn logging(mut self, level: impl Into<String>, format: LogFormat) -> Self {
        self.config.logging.level = level.into();
        self.config.logging.format = format;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> groovy_sandbox_core::Result<SandboxConfig> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .max_operations(500)
            .timeout(Duration::from_millis(100))
            .logging("debug", LogFormat::Json)
            .build()
            .unwrap();

        assert_eq!(config.limits.max_operations, 500);
        assert_eq!(config.limits.timeout, Duration::from_millis(100));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_builder_rejects_invalid_limits() {
        let result = ConfigBuilder::new().timeout(Duration::ZERO).build();
        assert!(result.is_err());
    }
}
