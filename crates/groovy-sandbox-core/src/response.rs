//! Execution results and the serialized response contract

use crate::types::{Diagnostic, Dialect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Outcome of a successful script execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Transformed payload produced by the script
    pub transformed_payload: Value,
    /// Script log output in execution order
    pub logs: Vec<String>,
    /// Wall-clock duration of the whole pipeline
    pub duration_ms: u64,
    /// Identifiers declared by the original script
    pub declared_variables: BTreeSet<String>,
    /// Detected dialect
    pub dialect: Dialect,
    /// Pipeline notes collected along the way
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Final message headers (host-style scripts only)
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Final message properties (host-style scripts only)
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Wire-level response for a transform request
///
/// Success: `{success: true, result, executionTimeMs, logs, declaredVariables}`.
/// Failure: `{success: false, error, executionTimeMs, logs}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Whether the script ran to completion
    pub success: bool,

    /// Transformed payload (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message (failure only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Pipeline duration in milliseconds
    pub execution_time_ms: u64,

    /// Script logs (partial on failure)
    pub logs: Vec<String>,

    /// Declared identifiers (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_variables: Option<Vec<String>>,

    /// Detected dialect, when classification ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    /// Pipeline diagnostics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,

    /// Final message headers
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,

    /// Final message properties
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl TransformResponse {
    /// Build a failure response
    pub fn failure(
        error: impl Into<String>,
        execution_time_ms: u64,
        logs: Vec<String>,
        dialect: Option<Dialect>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            execution_time_ms,
            logs,
            declared_variables: None,
            dialect,
            diagnostics,
            headers: Map::new(),
            properties: Map::new(),
        }
    }
}

impl From<ExecutionResult> for TransformResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            success: true,
            result: Some(result.transformed_payload),
            error: None,
            execution_time_ms: result.duration_ms,
            logs: result.logs,
            declared_variables: Some(result.declared_variables.into_iter().collect()),
            dialect: Some(result.dialect),
            diagnostics: result.diagnostics,
            headers: result.headers,
            properties: result.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> ExecutionResult {
        ExecutionResult {
            transformed_payload: json!({"valor": 100, "doble": 200}),
            logs: vec!["hello".to_string()],
            duration_ms: 3,
            declared_variables: ["message".to_string()].into_iter().collect(),
            dialect: Dialect::Generic,
            diagnostics: Vec::new(),
            headers: Map::new(),
            properties: Map::new(),
        }
    }

    #[test]
    fn test_success_shape() {
        let response = TransformResponse::from(sample_result());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], json!(true));
        assert_eq!(json["result"]["doble"], json!(200));
        assert_eq!(json["executionTimeMs"], json!(3));
        assert_eq!(json["declaredVariables"], json!(["message"]));
        assert!(json.get("error").is_none());
        assert!(json.get("headers").is_none());
    }

    #[test]
    fn test_failure_shape() {
        let response = TransformResponse::failure(
            "boom",
            7,
            vec!["partial".to_string()],
            Some(Dialect::HostStyle),
            Vec::new(),
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], json!(false));
        assert_eq!(json["error"], json!("boom"));
        assert_eq!(json["logs"], json!(["partial"]));
        assert!(json.get("result").is_none());
        assert!(json.get("declaredVariables").is_none());
    }
}
