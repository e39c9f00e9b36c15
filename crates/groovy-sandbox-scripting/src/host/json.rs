//! `JsonSlurper` and `JsonOutput`

use super::message::HostMessage;
use super::value::{from_json, to_json, RhaiResult};
use crate::error::PARSE_ERROR_KIND;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Map, Position};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

/// `JsonSlurper` instance; stateless
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JsonSlurper;

/// `JsonOutput` namespace object
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JsonOutput;

/// Strict parse; failures are thrown as catchable `ParseError` values
fn parse_text(text: &Dynamic) -> RhaiResult<Dynamic> {
    let source = if let Some(s) = text.read_lock::<ImmutableString>() {
        s.to_string()
    } else if let Some(message) = text.read_lock::<HostMessage>() {
        message.body_text()
    } else {
        return Err(parse_error("Text must not be null or empty"));
    };
    if source.trim().is_empty() {
        return Err(parse_error("Text must not be null or empty"));
    }
    match serde_json::from_str::<Value>(&source) {
        Ok(value) => from_json(&value),
        Err(e) => Err(parse_error(format!("Unable to parse JSON: {}", e))),
    }
}

fn parse_error(message: impl Into<String>) -> Box<EvalAltResult> {
    let message: String = message.into();
    let mut thrown = Map::new();
    thrown.insert("message".into(), message.into());
    thrown.insert("kind".into(), PARSE_ERROR_KIND.into());
    EvalAltResult::ErrorRuntime(Dynamic::from_map(thrown), Position::NONE).into()
}

fn to_json_text(value: &Dynamic) -> String {
    to_json(value).to_string()
}

/// Re-serialize with four-space indentation; text that is not JSON comes back unchanged
fn pretty_print(input: &Dynamic) -> String {
    let value = match input.read_lock::<ImmutableString>() {
        Some(text) => match serde_json::from_str::<Value>(text.as_str()) {
            Ok(value) => value,
            Err(_) => return text.to_string(),
        },
        None => to_json(input),
    };
    indent(&value)
}

fn indent(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<JsonSlurper>("JsonSlurper")
        .register_fn("JsonSlurper", || JsonSlurper)
        .register_fn("parseText", |_: JsonSlurper, text: Dynamic| parse_text(&text))
        .register_fn("parse", |_: JsonSlurper, text: Dynamic| parse_text(&text));

    engine
        .register_type_with_name::<JsonOutput>("JsonOutput")
        .register_fn("toJson", |_: JsonOutput, value: Dynamic| to_json_text(&value))
        .register_fn("prettyPrint", |_: JsonOutput, input: Dynamic| pretty_print(&input));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_round_trip() {
        let text = r#"{"a":[1,2,{"b":null}],"c":"x"}"#;
        let parsed = parse_text(&Dynamic::from(text)).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&to_json_text(&parsed)).unwrap(),
            serde_json::from_str::<Value>(text).unwrap()
        );
    }

    #[test]
    fn test_malformed_text_is_parse_error() {
        let err = parse_text(&Dynamic::from("{broken")).unwrap_err();
        let classified = ScriptError::from_eval(&err, Duration::from_secs(1));
        assert!(matches!(classified, ScriptError::Parse { .. }));
    }

    #[test]
    fn test_unit_is_rejected() {
        assert!(parse_text(&Dynamic::UNIT).is_err());
    }

    #[test]
    fn test_pretty_print_accepts_text_and_values() {
        let from_text = pretty_print(&Dynamic::from(r#"{"a":1}"#));
        assert_eq!(from_text, "{\n    \"a\": 1\n}");

        let value = from_json(&json!({"a": 1})).unwrap();
        assert_eq!(pretty_print(&value), from_text);
    }

    #[test]
    fn test_pretty_print_returns_invalid_text_unchanged() {
        assert_eq!(pretty_print(&Dynamic::from("{bad")), "{bad");
        assert_eq!(pretty_print(&Dynamic::from("")), "");
    }

    #[test]
    fn test_to_json_is_compact() {
        let value = from_json(&json!({"list": [1, 2]})).unwrap();
        assert_eq!(to_json_text(&value), r#"{"list":[1,2]}"#);
    }
}
