//! Configuration validation

use crate::SandboxConfig;
use groovy_sandbox_core::{Error, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &SandboxConfig) -> Result<()> {
    validate_limits(config)?;

    validate_engine(config)?;

    validate_logging(config)?;

    Ok(())
}

fn validate_limits(config: &SandboxConfig) -> Result<()> {
    let limits = &config.limits;

    if limits.max_operations == 0 {
        return Err(Error::Config("limits.max_operations must be > 0".to_string()));
    }

    if limits.max_call_levels == 0 {
        return Err(Error::Config("limits.max_call_levels must be > 0".to_string()));
    }

    if limits.max_expr_depth == 0 || limits.max_function_expr_depth == 0 {
        return Err(Error::Config(
            "limits.max_expr_depth and limits.max_function_expr_depth must be > 0".to_string(),
        ));
    }

    if limits.max_string_size == 0 || limits.max_array_size == 0 || limits.max_map_size == 0 {
        return Err(Error::Config(
            "limits on string, array and map sizes must be > 0".to_string(),
        ));
    }

    if limits.timeout.is_zero() {
        return Err(Error::Config("limits.timeout must be > 0".to_string()));
    }

    if limits.timeout.as_secs() > 60 {
        tracing::warn!(
            timeout_ms = limits.timeout.as_millis() as u64,
            "limits.timeout is very high (>1 minute)"
        );
    }

    Ok(())
}

fn validate_engine(config: &SandboxConfig) -> Result<()> {
    if config.engine.max_script_size == 0 {
        return Err(Error::Config("engine.max_script_size must be > 0".to_string()));
    }

    if config.engine.max_log_entries == 0 {
        tracing::warn!("engine.max_log_entries is 0, script logs will be discarded");
    }

    Ok(())
}

fn validate_logging(config: &SandboxConfig) -> Result<()> {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level: {} (expected one of {})",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}
