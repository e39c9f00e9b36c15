//! The transform pipeline
//!
//! `Classify -> Normalize -> [Extract] -> Rewrite -> Execute`. Every call is
//! self-contained: the log sink, the message object and the interpreter are
//! created for the call and dropped at its end.

use crate::classifier::classify;
use crate::diagnostics::declared_variables;
use crate::error::ScriptError;
use crate::extractor::extract_entry_point;
use crate::host::LogSink;
use crate::normalizer::normalize_imports;
use crate::rewriter::rewrite;
use crate::sandbox::{ExecutionPlan, RhaiSandbox, ScriptExecutor};
use groovy_sandbox_config::SandboxConfig;
use groovy_sandbox_core::{
    Diagnostic, Dialect, ExecutionResult, ScriptRequest, Stage, TransformResponse,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extra time the async wrapper allows past the interpreter's own deadline
const ASYNC_GRACE: Duration = Duration::from_millis(250);

/// Generic scripts that mention `message` get it as their default result
static MESSAGE_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmessage\b").expect("message identifier regex must compile"));

/// A failed execution with whatever was collected before the failure
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    /// What went wrong
    pub error: ScriptError,
    /// Logs produced before the failure, ending with the error line
    pub logs: Vec<String>,
    /// Time spent until the failure
    pub duration_ms: u64,
    /// Dialect, when classification ran
    pub dialect: Option<Dialect>,
    /// Pipeline diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl From<ExecutionFailure> for TransformResponse {
    fn from(failure: ExecutionFailure) -> Self {
        TransformResponse::failure(
            failure.error.to_string(),
            failure.duration_ms,
            failure.logs,
            failure.dialect,
            failure.diagnostics,
        )
    }
}

/// Turns `(rawScript, payload)` into a transformed payload
///
/// Cheap to clone; clones share the executor.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    config: SandboxConfig,
    executor: Arc<dyn ScriptExecutor>,
}

impl TransformEngine {
    /// Engine backed by the Rhai sandbox
    pub fn new(config: SandboxConfig) -> Self {
        let executor = Arc::new(RhaiSandbox::new(config.limits.clone()));
        Self { config, executor }
    }

    /// Engine with a custom executor
    pub fn with_executor(config: SandboxConfig, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self { config, executor }
    }

    /// Active configuration
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run the whole pipeline on the calling thread
    pub fn execute(&self, request: &ScriptRequest) -> Result<ExecutionResult, ExecutionFailure> {
        self.execute_with_sink(request, &self.log_sink())
    }

    fn log_sink(&self) -> LogSink {
        LogSink::with_capacity(self.config.engine.max_log_entries)
    }

    fn execute_with_sink(
        &self,
        request: &ScriptRequest,
        sink: &LogSink,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let started = Instant::now();
        let mut run = Run::new(started);

        if let Err(error) = self.check_request(request) {
            return Err(run.fail(error, Vec::new()));
        }

        let dialect = classify(&request.raw_script);
        run.dialect = Some(dialect);
        run.note(Diagnostic::info(Stage::Classify, format!("classified as {}", dialect)));

        let normalized = normalize_imports(&request.raw_script);
        let (body, binding) = match dialect {
            Dialect::HostStyle => match extract_entry_point(&normalized) {
                Ok(entry) => (entry.body, entry.message_binding),
                Err(error) => {
                    warn!(error = %error, "Entry point extraction failed");
                    return Err(run.fail(error, Vec::new()));
                }
            },
            Dialect::Generic => (normalized.as_str(), generic_binding(&request.raw_script)),
        };

        let program = rewrite(body, binding);
        run.diagnostics.extend(program.diagnostics);
        debug!(
            dialect = %dialect,
            bytes = program.source.len(),
            appended_terminal = program.appended_terminal,
            "Prepared program"
        );

        let plan = ExecutionPlan {
            dialect,
            source: &program.source,
            message_binding: binding,
            payload: &request.payload,
        };
        let outcome = self.executor.run(&plan, sink);
        if sink.dropped() > 0 {
            run.note(Diagnostic::warning(
                Stage::Execute,
                format!("{} log entries dropped past the limit", sink.dropped()),
            ));
        }

        let output = match outcome {
            Ok(output) => output,
            Err(error) => {
                sink.push_terminal(format!("Error: {}", error));
                warn!(
                    dialect = %dialect,
                    kind = error.kind(),
                    executor = self.executor.name(),
                    "Script failed"
                );
                return Err(run.fail(error, sink.entries()));
            }
        };

        let duration_ms = run.elapsed_ms();
        info!(dialect = %dialect, duration_ms, "Script executed");
        Ok(ExecutionResult {
            transformed_payload: output.result,
            logs: sink.entries(),
            duration_ms,
            declared_variables: declared_variables(&request.raw_script),
            dialect,
            diagnostics: run.diagnostics,
            headers: output.headers,
            properties: output.properties,
        })
    }

    /// Run the pipeline on a blocking worker, bounded by the configured timeout
    pub async fn execute_async(
        &self,
        request: ScriptRequest,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let started = Instant::now();
        let budget = self.config.limits.timeout;
        let dialect = classify(&request.raw_script);
        let engine = self.clone();
        let sink = self.log_sink();
        let worker_sink = sink.clone();
        let worker =
            tokio::task::spawn_blocking(move || engine.execute_with_sink(&request, &worker_sink));

        let mut run = Run::new(started);
        run.dialect = Some(dialect);
        match tokio::time::timeout(budget + ASYNC_GRACE, worker).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join)) => Err(run.fail(
                ScriptError::setup(format!("worker failed: {}", join)),
                Vec::new(),
            )),
            Err(_) => {
                warn!(timeout_ms = budget.as_millis() as u64, "Worker missed its deadline");
                let error = ScriptError::timeout(budget);
                sink.push_terminal(format!("Error: {}", error));
                Err(run.fail(error, sink.entries()))
            }
        }
    }

    /// Run and convert to the wire response
    pub fn transform(&self, request: &ScriptRequest) -> TransformResponse {
        match self.execute(request) {
            Ok(result) => result.into(),
            Err(failure) => failure.into(),
        }
    }

    fn check_request(&self, request: &ScriptRequest) -> Result<(), ScriptError> {
        request.validate()?;
        let size = request.raw_script.len();
        let limit = self.config.engine.max_script_size;
        if size > limit {
            return Err(ScriptError::invalid_request(format!(
                "script is {} bytes, limit is {}",
                size, limit
            )));
        }
        Ok(())
    }
}

/// Name a generic script's default result is read from
fn generic_binding(script: &str) -> &'static str {
    if MESSAGE_IDENT.is_match(script) {
        "message"
    } else {
        "body"
    }
}

/// Per-call bookkeeping
struct Run {
    started: Instant,
    dialect: Option<Dialect>,
    diagnostics: Vec<Diagnostic>,
}

impl Run {
    fn new(started: Instant) -> Self {
        Self {
            started,
            dialect: None,
            diagnostics: Vec::new(),
        }
    }

    fn note(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn fail(mut self, error: ScriptError, logs: Vec<String>) -> ExecutionFailure {
        self.diagnostics
            .push(Diagnostic::error(error.stage(), error.to_string()));
        ExecutionFailure {
            duration_ms: self.elapsed_ms(),
            error,
            logs,
            dialect: self.dialect,
            diagnostics: self.diagnostics,
        }
    }
}
