//! End-to-end tests for the transform pipeline
//!
//! Every test goes through the public `TransformEngine` API with the default
//! configuration unless it is checking a limit.

use groovy_sandbox_config::{ConfigBuilder, SandboxConfig};
use groovy_sandbox_core::{Dialect, Payload, ScriptRequest, TransformResponse};
use groovy_sandbox_scripting::{ScriptError, TransformEngine};
use serde_json::{json, Value};
use std::time::Duration;

fn engine() -> TransformEngine {
    TransformEngine::new(SandboxConfig::default())
}

fn run(script: &str, payload: impl Into<Payload>) -> Value {
    match engine().execute(&ScriptRequest::new(script, payload)) {
        Ok(result) => result.transformed_payload,
        Err(failure) => panic!("script failed: {} (logs: {:?})", failure, failure.logs),
    }
}

const HOST_PARSE_SCRIPT: &str = r#"
import com.sap.gateway.ip.core.customdev.util.Message
import groovy.json.JsonSlurper

Message processData(Message message) {
    def body = message.getBody(String)
    def json = new JsonSlurper().parseText(body)
    println "SUCCESS"
    message.setBody(json.toString())
    return message
}
"#;

const HOST_ORDER_SCRIPT: &str = r#"
import com.sap.gateway.ip.core.customdev.util.Message
import groovy.json.JsonSlurper
import groovy.json.JsonOutput

Message processData(Message message) {
    def json = new JsonSlurper().parseText(message.getBody(java.lang.String))
    def total = json.items.sum { it.price * it.qty }
    message.setHeader("X-Count", json.items.size())
    message.setProperty("customer", json.customer)

    def messageLog = messageLogFactory.getMessageLog(message)
    messageLog.setStringProperty("total", total.toString())

    message.setBody(JsonOutput.toJson([customer: json.customer, total: total]))
    return message
}

def helper() {
    return "unused"
}
"#;

#[test]
fn test_scenario_a_doubles_value() {
    let result = run(
        "def message = body; message.doble = message.valor * 2; return message;",
        json!({"valor": 100}),
    );
    assert_eq!(result, json!({"valor": 100, "doble": 200}));
}

#[test]
fn test_scenario_b_filters_even_numbers() {
    let script = r#"
def numeros = body.numeros
def pares = numeros.findAll { it % 2 == 0 }
body.pares = pares
"#;
    let result = run(script, json!({"numeros": [1, 2, 3, 4, 5, 6]}));
    assert_eq!(result["pares"], json!([2, 4, 6]));
    assert_eq!(result["numeros"], json!([1, 2, 3, 4, 5, 6]));
}

#[test]
fn test_scenario_c_malformed_json_is_parse_error() {
    let failure = engine()
        .execute(&ScriptRequest::new(HOST_PARSE_SCRIPT, "{not json"))
        .unwrap_err();

    assert!(matches!(failure.error, ScriptError::Parse { .. }));
    assert_eq!(failure.dialect, Some(Dialect::HostStyle));
    assert!(failure.logs.iter().all(|line| !line.contains("SUCCESS")));

    let response = TransformResponse::from(failure);
    assert!(!response.success);
    assert!(response.error.unwrap_or_default().starts_with("ParseError"));
}

#[test]
fn test_host_style_succeeds_on_valid_json() {
    let result = run(HOST_PARSE_SCRIPT, r#"{"a": 1}"#);
    assert_eq!(result, json!("[a:1]"));
}

#[test]
fn test_collect_upper_cases_items() {
    let script = "body.items = body.items.collect { it.toUpperCase() }\nreturn body";
    let result = run(script, json!({"items": ["a", "b", "c"]}));
    assert_eq!(result["items"], json!(["A", "B", "C"]));
}

#[test]
fn test_elvis_falls_back_on_null_empty_and_zero() {
    let script = r#"
return [
    a: body.a ?: "default",
    b: body.b ?: "default",
    c: body.c ?: "default",
    d: body.d ?: "default",
    e: body.missing ?: "default"
]
"#;
    let result = run(script, json!({"a": null, "b": "", "c": 0, "d": "kept"}));
    assert_eq!(
        result,
        json!({"a": "default", "b": "default", "c": "default", "d": "kept", "e": "default"})
    );
}

#[test]
fn test_missing_entry_point_has_no_logs() {
    let script = "import com.sap.gateway.ip.core.customdev.util.Message\nprintln 'hi'\nreturn message";
    let failure = engine()
        .execute(&ScriptRequest::new(script, json!({})))
        .unwrap_err();

    assert!(matches!(failure.error, ScriptError::MissingEntryPoint { .. }));
    assert!(failure.logs.is_empty());
    assert_eq!(failure.dialect, Some(Dialect::HostStyle));
}

#[test]
fn test_unterminated_entry_point_is_missing() {
    let script = "Message processData(Message message) {\n  return message\n";
    let failure = engine()
        .execute(&ScriptRequest::new(script, json!({})))
        .unwrap_err();
    assert_eq!(failure.error.kind(), "missing_entry_point");
}

#[test]
fn test_generic_result_is_never_empty() {
    let result = run("def unused = 1", json!({"keep": true}));
    assert_eq!(result, json!({"keep": true}));

    let result = run("def x = 2", "plain text");
    assert_eq!(result, json!("plain text"));
}

#[test]
fn test_identical_requests_give_identical_output() {
    let script = r#"
def total = body.numbers.inject(0) { acc, n -> acc + n }
println "total ${total}"
body.total = total
return body
"#;
    let request = ScriptRequest::new(script, json!({"numbers": [3, 4, 5]}));
    let first = engine().execute(&request).unwrap();
    let second = engine().execute(&request).unwrap();

    assert_eq!(first.transformed_payload, second.transformed_payload);
    assert_eq!(first.logs, second.logs);
    assert_eq!(first.logs, vec!["total 12"]);
    assert_eq!(first.transformed_payload["total"], json!(12));
}

#[test]
fn test_json_round_trip() {
    let payload = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}});
    let result = run(
        "return JsonOutput.toJson(new JsonSlurper().parseText(JsonOutput.toJson(body)))",
        payload.clone(),
    );
    let printed = result.as_str().unwrap();
    let reparsed: Value = serde_json::from_str(printed).unwrap();
    assert_eq!(reparsed, payload);
}

#[test]
fn test_json_text_payload_is_parsed_for_generic_scripts() {
    let result = run(
        "def message = body; message.doble = message.valor * 2; return message;",
        r#"{"valor":100}"#,
    );
    assert_eq!(result, json!({"valor": 100, "doble": 200}));
}

#[test]
fn test_request_with_string_body_field() {
    let request: ScriptRequest = serde_json::from_value(json!({
        "script": "body.doble = body.valor * 2\nreturn body",
        "body": "{\"valor\": 100}"
    }))
    .unwrap();
    let result = engine().execute(&request).unwrap();
    assert_eq!(result.transformed_payload, json!({"valor": 100, "doble": 200}));
}

#[test]
fn test_host_style_get_body_is_mutable_map() {
    let script = r#"
import com.sap.gateway.ip.core.customdev.util.Message

Message processData(Message message) {
    def m = message.getBody()
    m.x = 1
    message.setBody(m)
    return message
}
"#;
    let result = run(script, r#"{"a":1}"#);
    assert_eq!(result, json!({"a": 1, "x": 1}));
}

#[test]
fn test_pretty_print_leaves_invalid_json_alone() {
    let result = run("return JsonOutput.prettyPrint('{bad')", json!({}));
    assert_eq!(result, json!("{bad"));
}

#[test]
fn test_unterminated_string_fails_to_compile() {
    let failure = engine()
        .execute(&ScriptRequest::new("def s = 'abc\nreturn s", json!({})))
        .unwrap_err();
    assert_eq!(failure.error.kind(), "runtime");
    assert!(failure.logs.last().is_some_and(|l| l.starts_with("Error: ")));
}

#[test]
fn test_host_style_order_summary() {
    let payload = json!({
        "customer": "ACME",
        "items": [{"price": 10, "qty": 2}, {"price": 5, "qty": 4}]
    });
    let result = engine()
        .execute(&ScriptRequest::new(HOST_ORDER_SCRIPT, payload.clone()))
        .unwrap();

    assert_eq!(result.dialect, Dialect::HostStyle);
    assert_eq!(result.transformed_payload, json!({"customer": "ACME", "total": 40}));
    assert_eq!(result.headers.get("X-Count"), Some(&json!(2)));
    assert_eq!(result.properties.get("customer"), Some(&json!("ACME")));
    assert_eq!(result.logs, vec!["[property] total=40"]);
    assert!(result.declared_variables.contains("messageLog"));
    assert!(result.declared_variables.contains("total"));
}

#[test]
fn test_runtime_error_keeps_partial_logs() {
    let script = "println 'step 1'\ndef x = body.missing.deeper\nprintln 'step 2'";
    let failure = engine()
        .execute(&ScriptRequest::new(script, json!({})))
        .unwrap_err();

    assert_eq!(failure.error.kind(), "runtime");
    assert_eq!(failure.logs.first().map(String::as_str), Some("step 1"));
    assert!(failure.logs.last().unwrap().starts_with("Error: "));
    assert!(!failure.logs.iter().any(|l| l == "step 2"));
}

#[test]
fn test_caught_exception_continues() {
    let script = r#"
def outcome = "none"
try {
    throw new IllegalStateException("nope")
} catch (Exception e) {
    outcome = e.getMessage()
}
return [outcome: outcome]
"#;
    assert_eq!(run(script, json!({})), json!({"outcome": "nope"}));
}

#[test]
fn test_operation_ceiling_stops_runaway_loop() {
    let failure = engine()
        .execute(&ScriptRequest::new("while (true) { }", json!({})))
        .unwrap_err();
    assert!(matches!(failure.error, ScriptError::ResourceLimit { .. }));
}

#[test]
fn test_eval_is_not_available() {
    let failure = engine()
        .execute(&ScriptRequest::new("eval('1 + 1')", json!({})))
        .unwrap_err();
    assert_eq!(failure.error.kind(), "runtime");
}

#[tokio::test]
async fn test_async_execution_times_out() {
    let config = ConfigBuilder::new()
        .max_operations(u64::MAX)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let engine = TransformEngine::new(config);

    let failure = engine
        .execute_async(ScriptRequest::new("def i = 0\nwhile (true) { i++ }", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, ScriptError::Timeout { .. }));
}

#[tokio::test]
async fn test_async_execution_succeeds() {
    let result = engine()
        .execute_async(ScriptRequest::new("body.n = body.n + 1", json!({"n": 1})))
        .await
        .unwrap();
    assert_eq!(result.transformed_payload, json!({"n": 2}));
}

#[test]
fn test_success_response_shape() {
    let response = engine().transform(&ScriptRequest::new(
        "def doble = body.valor * 2\nreturn [doble: doble]",
        json!({"valor": 21}),
    ));
    let wire = serde_json::to_value(&response).unwrap();

    assert_eq!(wire["success"], json!(true));
    assert_eq!(wire["result"], json!({"doble": 42}));
    assert_eq!(wire["declaredVariables"], json!(["body", "doble"]));
    assert!(wire["executionTimeMs"].is_u64());
    assert!(wire.get("error").is_none());
}
