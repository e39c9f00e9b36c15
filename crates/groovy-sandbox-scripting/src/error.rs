//! Transform pipeline error types

use groovy_sandbox_core::Stage;
use rhai::{Dynamic, EvalAltResult, Map, ParseErrorType};
use std::time::Duration;
use thiserror::Error;

/// Script pipeline result type
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Marker value raised from the progress callback when the wall clock runs out
pub(crate) const DEADLINE_TOKEN: &str = "__deadline_exceeded__";

/// Error kind tag carried by values thrown from `parseText`
pub(crate) const PARSE_ERROR_KIND: &str = "ParseError";

/// Transform pipeline error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The request itself is unusable (empty or oversized script)
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message
        message: String,
    },

    /// Host-style script without a usable `processData(Message)` entry point
    #[error("Missing processData(Message) entry point: {reason}")]
    MissingEntryPoint {
        /// Why extraction failed
        reason: String,
    },

    /// Structured-data parse failure raised inside the script and not caught
    #[error("ParseError: {message}")]
    Parse {
        /// Error message
        message: String,
    },

    /// Any other failure while compiling or running the rewritten program
    #[error("{message}{}", line_suffix(.line))]
    Runtime {
        /// Error message
        message: String,
        /// Line in the rewritten program, when known
        line: Option<usize>,
    },

    /// Wall-clock budget exceeded
    #[error("Timeout: script exceeded {timeout_ms}ms")]
    Timeout {
        /// Budget in milliseconds
        timeout_ms: u64,
    },

    /// An interpreter ceiling was hit (operations, sizes, nesting)
    #[error("Resource limit exceeded: {limit}")]
    ResourceLimit {
        /// Which limit
        limit: String,
    },

    /// The sandbox could not be prepared or its worker died
    #[error("Sandbox setup failed: {message}")]
    Setup {
        /// Error message
        message: String,
    },
}

impl ScriptError {
    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a missing entry point error
    pub fn missing_entry_point<S: Into<String>>(reason: S) -> Self {
        Self::MissingEntryPoint {
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
            line: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(budget: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a setup error
    pub fn setup<S: Into<String>>(message: S) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Pipeline stage the error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidRequest { .. } => Stage::Classify,
            Self::MissingEntryPoint { .. } => Stage::Extract,
            Self::Parse { .. }
            | Self::Runtime { .. }
            | Self::Timeout { .. }
            | Self::ResourceLimit { .. }
            | Self::Setup { .. } => Stage::Execute,
        }
    }

    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MissingEntryPoint { .. } => "missing_entry_point",
            Self::Parse { .. } => "parse",
            Self::Runtime { .. } => "runtime",
            Self::Timeout { .. } => "timeout",
            Self::ResourceLimit { .. } => "resource_limit",
            Self::Setup { .. } => "setup",
        }
    }

    /// Bare message without the category prefix, as scripts see it in `catch`
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::Parse { message }
            | Self::Runtime { message, .. }
            | Self::Setup { message } => message.clone(),
            Self::MissingEntryPoint { reason } => reason.clone(),
            Self::Timeout { timeout_ms } => format!("execution exceeded {}ms", timeout_ms),
            Self::ResourceLimit { limit } => format!("{} exceeded", limit),
        }
    }

    /// Classify an interpreter failure
    pub fn from_eval(err: &EvalAltResult, budget: Duration) -> Self {
        match err {
            EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => Self::from_eval(inner, budget),
            EvalAltResult::ErrorTerminated(token, _) if is_deadline(token) => Self::timeout(budget),
            EvalAltResult::ErrorTooManyOperations(_) => Self::ResourceLimit {
                limit: "operation limit".to_string(),
            },
            EvalAltResult::ErrorDataTooLarge(what, _) => Self::ResourceLimit {
                limit: what.to_string(),
            },
            EvalAltResult::ErrorStackOverflow(_) => Self::ResourceLimit {
                limit: "call depth".to_string(),
            },
            EvalAltResult::ErrorParsing(ParseErrorType::ExprTooDeep, _) => Self::ResourceLimit {
                limit: "expression depth".to_string(),
            },
            EvalAltResult::ErrorRuntime(value, pos) => match thrown_parse_error(value) {
                Some(message) => Self::parse(message),
                None => Self::Runtime {
                    message: thrown_message(value),
                    line: pos.line(),
                },
            },
            other => Self::Runtime {
                message: other.to_string(),
                line: other.position().line(),
            },
        }
    }
}

fn is_deadline(token: &Dynamic) -> bool {
    token
        .read_lock::<rhai::ImmutableString>()
        .map(|s| s.as_str() == DEADLINE_TOKEN)
        .unwrap_or(false)
}

/// Message of a thrown value: maps carry `message`, anything else is displayed
pub(crate) fn thrown_message(value: &Dynamic) -> String {
    if let Some(map) = value.read_lock::<Map>() {
        if let Some(message) = map.get("message") {
            return message.to_string();
        }
    }
    value.to_string()
}

fn thrown_parse_error(value: &Dynamic) -> Option<String> {
    let map = value.read_lock::<Map>()?;
    let kind = map.get("kind")?.read_lock::<rhai::ImmutableString>()?;
    if kind.as_str() != PARSE_ERROR_KIND {
        return None;
    }
    Some(map.get("message").map(|m| m.to_string()).unwrap_or_default())
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {})", l)).unwrap_or_default()
}

impl From<groovy_sandbox_core::Error> for ScriptError {
    fn from(err: groovy_sandbox_core::Error) -> Self {
        match err {
            groovy_sandbox_core::Error::InvalidRequest(message) => Self::InvalidRequest { message },
            other => Self::setup(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Position;

    fn budget() -> Duration {
        Duration::from_millis(1500)
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(ScriptError::invalid_request("x").stage(), Stage::Classify);
        assert_eq!(ScriptError::missing_entry_point("x").stage(), Stage::Extract);
        assert_eq!(ScriptError::parse("x").stage(), Stage::Execute);
        assert_eq!(ScriptError::timeout(budget()).stage(), Stage::Execute);
    }

    #[test]
    fn test_deadline_token_is_timeout() {
        let err = EvalAltResult::ErrorTerminated(DEADLINE_TOKEN.into(), Position::NONE);
        assert_eq!(
            ScriptError::from_eval(&err, budget()),
            ScriptError::Timeout { timeout_ms: 1500 }
        );
    }

    #[test]
    fn test_too_many_operations_is_resource_limit() {
        let err = EvalAltResult::ErrorTooManyOperations(Position::NONE);
        assert_eq!(ScriptError::from_eval(&err, budget()).kind(), "resource_limit");
    }

    #[test]
    fn test_thrown_parse_error_map() {
        let mut map = Map::new();
        map.insert("message".into(), "unexpected end of input".into());
        map.insert("kind".into(), PARSE_ERROR_KIND.into());
        let err = EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE);

        let classified = ScriptError::from_eval(&err, budget());
        assert_eq!(classified, ScriptError::parse("unexpected end of input"));
        assert!(classified.to_string().starts_with("ParseError"));
    }

    #[test]
    fn test_thrown_plain_value_is_runtime() {
        let err = EvalAltResult::ErrorRuntime("boom".into(), Position::NONE);
        match ScriptError::from_eval(&err, budget()) {
            ScriptError::Runtime { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deep_expression_is_resource_limit() {
        let err = EvalAltResult::ErrorParsing(ParseErrorType::ExprTooDeep, Position::NONE);
        assert_eq!(
            ScriptError::from_eval(&err, budget()),
            ScriptError::ResourceLimit {
                limit: "expression depth".to_string()
            }
        );
    }

    #[test]
    fn test_nested_function_call_is_unwrapped() {
        let inner = EvalAltResult::ErrorTooManyOperations(Position::NONE);
        let err = EvalAltResult::ErrorInFunctionCall(
            "map".to_string(),
            String::new(),
            Box::new(inner),
            Position::NONE,
        );
        assert_eq!(ScriptError::from_eval(&err, budget()).kind(), "resource_limit");
    }
}
