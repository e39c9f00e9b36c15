//! Sandboxed execution of rewritten programs
//!
//! Each run gets a fresh interpreter configured from [`LimitsConfig`], a
//! fresh scope holding the host objects, and a wall-clock deadline checked
//! from the interpreter's progress callback.

use crate::error::{Result, ScriptError, DEADLINE_TOKEN};
use crate::host::{self, value, HostMessage, LogSink};
use groovy_sandbox_config::LimitsConfig;
use groovy_sandbox_core::{Dialect, Payload};
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace};

/// Operations between two deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 128;

/// Symbols scripts may not use
const DISABLED_SYMBOLS: &[&str] = &["eval", "import", "export", "print", "debug"];

/// Precedence of `or_else`, just below `||`
const ELVIS_PRECEDENCE: u8 = 25;

/// Precedence of `compare_to`, between comparison and additive operators
const SPACESHIP_PRECEDENCE: u8 = 115;

/// What to run and against which payload
#[derive(Debug, Clone, Copy)]
pub struct ExecutionPlan<'a> {
    /// Detected dialect
    pub dialect: Dialect,
    /// Rewritten program text
    pub source: &'a str,
    /// Name the message object is bound to
    pub message_binding: &'a str,
    /// Input payload; copied, never mutated
    pub payload: &'a Payload,
}

/// Values read back after a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    /// Transformed payload
    pub result: Value,
    /// Final message headers (host-style only)
    pub headers: Map<String, Value>,
    /// Final message properties (host-style only)
    pub properties: Map<String, Value>,
}

impl ExecutionOutput {
    fn value(result: Value) -> Self {
        Self {
            result,
            headers: Map::new(),
            properties: Map::new(),
        }
    }
}

/// Runs a rewritten program; implementations must be safe to share across threads
pub trait ScriptExecutor: Send + Sync + fmt::Debug {
    /// Executor name for logs
    fn name(&self) -> &str;

    /// Run `plan`, appending script output to `sink`
    fn run(&self, plan: &ExecutionPlan<'_>, sink: &LogSink) -> Result<ExecutionOutput>;
}

/// Rhai-backed executor
#[derive(Debug, Clone)]
pub struct RhaiSandbox {
    limits: LimitsConfig,
}

impl RhaiSandbox {
    /// Create an executor with the given ceilings
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Limits applied to every run
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    fn build_engine(&self, deadline: Instant) -> Result<Engine> {
        let mut engine = Engine::new();
        let limits = &self.limits;
        engine.set_max_operations(limits.max_operations);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        for symbol in DISABLED_SYMBOLS {
            engine.disable_symbol(*symbol);
        }
        engine
            .register_custom_operator("or_else", ELVIS_PRECEDENCE)
            .map_err(|e| ScriptError::setup(format!("cannot register `or_else`: {}", e)))?;
        engine
            .register_custom_operator("compare_to", SPACESHIP_PRECEDENCE)
            .map_err(|e| ScriptError::setup(format!("cannot register `compare_to`: {}", e)))?;

        engine.on_progress(move |ops| {
            if ops % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                Some(DEADLINE_TOKEN.into())
            } else {
                None
            }
        });

        host::register(&mut engine);
        Ok(engine)
    }

    fn bind_inputs(plan: &ExecutionPlan<'_>, scope: &mut Scope<'_>) -> Result<Option<HostMessage>> {
        match plan.dialect {
            Dialect::HostStyle => {
                let message = HostMessage::new(plan.payload.clone());
                scope.push(plan.message_binding.to_string(), message.clone());
                Ok(Some(message))
            }
            Dialect::Generic => {
                // JSON text is parsed; anything else stays an opaque string
                let body = value::from_json(&plan.payload.to_structured_lenient())
                    .map_err(|e| ScriptError::setup(format!("payload conversion: {}", e)))?;
                scope.push_dynamic("body", body.clone());
                scope.push_dynamic("message", body);
                Ok(None)
            }
        }
    }

    /// Resolve the program's value into the transformed payload
    fn resolve(
        returned: Dynamic,
        scope: &Scope<'_>,
        message: Option<&HostMessage>,
    ) -> ExecutionOutput {
        if let Some(message) = message {
            let parts = message.parts();
            let result = if returned.is_unit() || returned.is::<HostMessage>() {
                parts.result
            } else {
                value::to_json(&returned)
            };
            return ExecutionOutput {
                result,
                headers: parts.headers,
                properties: parts.properties,
            };
        }
        if !returned.is_unit() {
            return ExecutionOutput::value(value::to_json(&returned));
        }
        let fallback = ["message", "body"]
            .iter()
            .find_map(|name| scope.get_value::<Dynamic>(name).filter(|v| !v.is_unit()));
        ExecutionOutput::value(fallback.map_or(Value::Null, |v| value::to_json(&v)))
    }
}

impl ScriptExecutor for RhaiSandbox {
    fn name(&self) -> &str {
        "rhai"
    }

    fn run(&self, plan: &ExecutionPlan<'_>, sink: &LogSink) -> Result<ExecutionOutput> {
        let started = Instant::now();
        let deadline = started + self.limits.timeout;
        let engine = self.build_engine(deadline)?;

        let ast = engine.compile(plan.source).map_err(|e| {
            let err: Box<EvalAltResult> = e.into();
            ScriptError::from_eval(&err, self.limits.timeout)
        })?;
        trace!(dialect = %plan.dialect, "Compiled rewritten program");

        let mut scope = Scope::new();
        host::push_globals(&mut scope, sink);
        let message = Self::bind_inputs(plan, &mut scope)?;

        let returned = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| ScriptError::from_eval(&e, self.limits.timeout))?;

        debug!(
            dialect = %plan.dialect,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Script finished"
        );
        Ok(Self::resolve(returned, &scope, message.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn sandbox() -> RhaiSandbox {
        RhaiSandbox::new(LimitsConfig::default())
    }

    fn run_generic(source: &str, payload: Value) -> Result<ExecutionOutput> {
        let payload = Payload::from(payload);
        let plan = ExecutionPlan {
            dialect: Dialect::Generic,
            source,
            message_binding: "message",
            payload: &payload,
        };
        sandbox().run(&plan, &LogSink::with_capacity(100))
    }

    #[test]
    fn test_generic_binds_body_and_message() {
        let out = run_generic("body.b = message.a + 1; body", json!({"a": 1})).unwrap();
        assert_eq!(out.result, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_generic_parses_json_text_payload() {
        let payload = Payload::Text(r#"{"valor": 100}"#.to_string());
        let plan = ExecutionPlan {
            dialect: Dialect::Generic,
            source: "body.doble = body.valor * 2; body",
            message_binding: "message",
            payload: &payload,
        };
        let out = sandbox().run(&plan, &LogSink::with_capacity(10)).unwrap();
        assert_eq!(out.result, json!({"valor": 100, "doble": 200}));
    }

    #[test]
    fn test_generic_keeps_opaque_text() {
        let payload = Payload::Text("not json".to_string());
        let plan = ExecutionPlan {
            dialect: Dialect::Generic,
            source: "body + \"!\"",
            message_binding: "message",
            payload: &payload,
        };
        let out = sandbox().run(&plan, &LogSink::with_capacity(10)).unwrap();
        assert_eq!(out.result, json!("not json!"));
    }

    #[test]
    fn test_unit_result_falls_back_to_message() {
        let out = run_generic("let x = 1;", json!({"a": 1})).unwrap();
        assert_eq!(out.result, json!({"a": 1}));
    }

    #[test]
    fn test_host_style_message_result() {
        let payload = Payload::Text("hello".to_string());
        let plan = ExecutionPlan {
            dialect: Dialect::HostStyle,
            source: "msg.setBody(`{\"greeting\": \"${msg.getBody(String)}\"}`); msg.setHeader(\"h\", 1); return msg;",
            message_binding: "msg",
            payload: &payload,
        };
        let out = sandbox().run(&plan, &LogSink::with_capacity(10)).unwrap();
        assert_eq!(out.result, json!({"greeting": "hello"}));
        assert_eq!(out.headers.get("h"), Some(&json!(1)));
        assert_eq!(payload, Payload::Text("hello".to_string()));
    }

    #[test]
    fn test_logger_writes_to_sink() {
        let sink = LogSink::with_capacity(10);
        let payload = Payload::Structured(json!({}));
        let plan = ExecutionPlan {
            dialect: Dialect::Generic,
            source: "Logger.log(\"a\", 1); Logger.log(()); body",
            message_binding: "message",
            payload: &payload,
        };
        sandbox().run(&plan, &sink).unwrap();
        assert_eq!(sink.entries(), vec!["a 1", "null"]);
    }

    #[test]
    fn test_elvis_operator() {
        let out = run_generic(
            "[() or_else \"d\", \"\" or_else \"d\", 0 or_else \"d\", \"x\" or_else \"d\"]",
            json!({}),
        )
        .unwrap();
        assert_eq!(out.result, json!(["d", "d", "d", "x"]));
    }

    #[test]
    fn test_disabled_eval() {
        assert!(run_generic("eval(\"1\")", json!({})).is_err());
    }

    #[test]
    fn test_operation_limit() {
        let err = run_generic("loop { }", json!({})).unwrap_err();
        assert!(matches!(err, ScriptError::ResourceLimit { .. }));
    }

    #[test]
    fn test_wall_clock_deadline() {
        let limits = LimitsConfig {
            max_operations: u64::MAX,
            timeout: Duration::from_millis(50),
            ..LimitsConfig::default()
        };
        let payload = Payload::Structured(json!({}));
        let plan = ExecutionPlan {
            dialect: Dialect::Generic,
            source: "loop { }",
            message_binding: "message",
            payload: &payload,
        };
        let err = RhaiSandbox::new(limits)
            .run(&plan, &LogSink::with_capacity(1))
            .unwrap_err();
        assert_eq!(err, ScriptError::Timeout { timeout_ms: 50 });
    }

    #[test]
    fn test_thrown_value_is_runtime_error() {
        let err = run_generic("throw Exception(\"bad input\")", json!({})).unwrap_err();
        assert_eq!(err.message(), "bad input");
    }
}
