//! Groovy Sandbox CLI

mod docs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use groovy_sandbox_config::{load_config, LogFormat, SandboxConfig};
use groovy_sandbox_core::{Payload, ScriptRequest, TransformResponse};
use groovy_sandbox_scripting::TransformEngine;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "groovy-sandbox")]
#[command(about = "Sandboxed Groovy-style message transforms", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script against a payload and print the response
    Run {
        /// Path to the script
        #[arg(short, long)]
        script: PathBuf,

        /// Path to the payload; JSON is parsed, anything else is passed as text
        #[arg(short, long, conflicts_with = "payload_json")]
        payload: Option<PathBuf>,

        /// Inline JSON payload
        #[arg(long)]
        payload_json: Option<String>,

        /// Path to configuration file
        #[arg(short, long, env = "GROOVY_SANDBOX_CONFIG")]
        config: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error); overrides the config
        #[arg(short, long)]
        log_level: Option<String>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },

    /// Print the usage document
    Docs {
        /// Path to configuration file
        #[arg(short, long, env = "GROOVY_SANDBOX_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "groovy-sandbox.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            payload,
            payload_json,
            config,
            log_level,
            pretty,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config, log_level.as_deref())?;

            let raw_script = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let payload = read_payload(payload.as_deref(), payload_json.as_deref())?;
            tracing::debug!(script = %script.display(), "Running script");

            let engine = TransformEngine::new(config);
            let response: TransformResponse =
                match engine.execute_async(ScriptRequest::new(raw_script, payload)).await {
                    Ok(result) => result.into(),
                    Err(failure) => failure.into(),
                };

            print_json(&response, pretty)?;
            if !response.success {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Docs { config } => {
            let config = load_config(config.as_deref())?;
            print_json(&docs::usage(&config), true)
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(Some(&config)) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Timeout: {:?}", cfg.limits.timeout);
                    tracing::info!("  Max operations: {}", cfg.limits.max_operations);
                    tracing::info!("  Max script size: {}", cfg.engine.max_script_size);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }

        Commands::Version => {
            println!("Groovy Sandbox");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Payload from a file, an inline JSON string, or an empty object
fn read_payload(path: Option<&Path>, inline: Option<&str>) -> Result<Payload> {
    if let Some(text) = inline {
        let value: Value = serde_json::from_str(text).context("parsing --payload-json")?;
        return Ok(Payload::from(value));
    }
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading payload {}", path.display()))?;
            Ok(Payload::from_text_lenient(text))
        }
        None => Ok(Payload::Structured(Value::Object(Default::default()))),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

/// Logs go to stderr so stdout carries only the response
fn init_tracing(config: &SandboxConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level `{}`", level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_inline_payload_is_structured() {
        let payload = read_payload(None, Some(r#"{"a": 1}"#)).unwrap();
        assert_eq!(payload, Payload::Structured(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_file_payload_falls_back_to_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<order id=\"1\"/>").unwrap();
        let payload = read_payload(Some(file.path()), None).unwrap();
        assert_eq!(payload, Payload::Text("<order id=\"1\"/>".to_string()));
    }

    #[test]
    fn test_missing_payload_is_empty_object() {
        let payload = read_payload(None, None).unwrap();
        assert_eq!(payload, Payload::Structured(serde_json::json!({})));
    }

    #[test]
    fn test_invalid_inline_payload_is_rejected() {
        assert!(read_payload(None, Some("{broken")).is_err());
    }
}
