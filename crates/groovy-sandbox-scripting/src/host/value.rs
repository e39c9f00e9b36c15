//! Value helpers shared by the host API: truthiness, display, ordering, JSON

use super::date::DateValue;
use super::message::HostMessage;
use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, Map, Position, FLOAT, INT};
use serde_json::{Number, Value};
use std::cmp::Ordering;

pub(crate) type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Raise a script-visible runtime error
pub(crate) fn runtime_error<T>(message: impl Into<String>) -> RhaiResult<T> {
    let message: String = message.into();
    Err(EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into())
}

/// Groovy truth, used by conditions: empty strings and collections are false
pub(crate) fn is_truthy(value: &Dynamic) -> bool {
    if let Some(array) = value.read_lock::<Array>() {
        return !array.is_empty();
    }
    if let Some(map) = value.read_lock::<Map>() {
        return !map.is_empty();
    }
    is_elvis_truthy(value)
}

/// Truthiness used by `?:`: only unit, `false`, zero and `""` fall back
pub(crate) fn is_elvis_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(i) = value.as_int() {
        return i != 0;
    }
    if let Ok(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return !s.is_empty();
    }
    true
}

/// Numeric view of ints, floats and numeric strings
pub(crate) fn as_number(value: &Dynamic) -> Option<FLOAT> {
    if let Ok(i) = value.as_int() {
        return Some(i as FLOAT);
    }
    if let Ok(f) = value.as_float() {
        return Some(f);
    }
    None
}

/// Groovy-style rendering: `null`, `[a, b]`, `[k:v]`
pub(crate) fn display(value: &Dynamic) -> String {
    if value.is_unit() {
        return "null".to_string();
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return s.to_string();
    }
    if let Some(array) = value.read_lock::<Array>() {
        let items: Vec<String> = array.iter().map(display).collect();
        return format!("[{}]", items.join(", "));
    }
    if let Some(map) = value.read_lock::<Map>() {
        if map.is_empty() {
            return "[:]".to_string();
        }
        let entries: Vec<String> = map
            .iter()
            .map(|(k, v)| format!("{}:{}", k, display(v)))
            .collect();
        return format!("[{}]", entries.join(", "));
    }
    if let Some(message) = value.read_lock::<HostMessage>() {
        return message.body_text();
    }
    if let Some(date) = value.read_lock::<DateValue>() {
        return date.to_string();
    }
    value.to_string()
}

/// Total order used by `sort`, `max` and `min`
pub(crate) fn compare(a: &Dynamic, b: &Dynamic) -> Ordering {
    match (a.is_unit(), b.is_unit()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    if let (Ok(x), Ok(y)) = (a.as_int(), b.as_int()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Ok(x), Ok(y)) = (a.as_bool(), b.as_bool()) {
        return x.cmp(&y);
    }
    display(a).cmp(&display(b))
}

/// Structural equality through the JSON view
pub(crate) fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    to_json(a) == to_json(b)
}

/// Convert JSON into an interpreter value
pub(crate) fn from_json(value: &Value) -> RhaiResult<Dynamic> {
    rhai::serde::to_dynamic(value)
}

/// Convert an interpreter value into JSON; total
///
/// Messages become their `getResult()` view, dates their epoch millis,
/// non-finite floats `null`, and anything else its display string.
pub(crate) fn to_json(value: &Dynamic) -> Value {
    let value = value.flatten_clone();
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Number(i.into());
    }
    if let Ok(f) = value.as_float() {
        return Number::from_f64(f).map_or(Value::Null, Value::Number);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return Value::String(s.to_string());
    }
    if let Some(array) = value.read_lock::<Array>() {
        return Value::Array(array.iter().map(to_json).collect());
    }
    if let Some(map) = value.read_lock::<Map>() {
        return Value::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), to_json(v)))
                .collect(),
        );
    }
    if let Some(message) = value.read_lock::<HostMessage>() {
        return message.result();
    }
    if let Some(date) = value.read_lock::<DateValue>() {
        return Value::Number(date.millis().into());
    }
    Value::String(value.to_string())
}

/// Build a `{key, value}` entry map, the element type of map iteration
pub(crate) fn entry(key: &str, value: Dynamic) -> Dynamic {
    let mut map = Map::new();
    map.insert("key".into(), key.into());
    map.insert("value".into(), value);
    Dynamic::from_map(map)
}

/// Interpret a value as an integer (`toInteger`)
pub(crate) fn to_integer(value: &Dynamic) -> RhaiResult<INT> {
    if let Ok(i) = value.as_int() {
        return Ok(i);
    }
    if let Ok(f) = value.as_float() {
        return Ok(f.trunc() as INT);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(INT::from(b));
    }
    let text = display(value);
    match text.trim().parse::<INT>() {
        Ok(i) => Ok(i),
        Err(_) => runtime_error(format!("For input string: \"{}\"", text)),
    }
}

/// Interpret a value as a float (`toDouble`)
pub(crate) fn to_double(value: &Dynamic) -> RhaiResult<FLOAT> {
    if let Some(f) = as_number(value) {
        return Ok(f);
    }
    let text = display(value);
    match text.trim().parse::<FLOAT>() {
        Ok(f) => Ok(f),
        Err(_) => runtime_error(format!("For input string: \"{}\"", text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_elvis_truthiness() {
        assert!(!is_elvis_truthy(&Dynamic::UNIT));
        assert!(!is_elvis_truthy(&Dynamic::from(false)));
        assert!(!is_elvis_truthy(&Dynamic::from(0 as INT)));
        assert!(!is_elvis_truthy(&Dynamic::from(0.0 as FLOAT)));
        assert!(!is_elvis_truthy(&Dynamic::from("")));
        assert!(is_elvis_truthy(&Dynamic::from_array(Array::new())));
        assert!(is_elvis_truthy(&Dynamic::from("x")));
    }

    #[test]
    fn test_groovy_truth_for_collections() {
        assert!(!is_truthy(&Dynamic::from_array(Array::new())));
        assert!(!is_truthy(&Dynamic::from_map(Map::new())));
        assert!(is_truthy(&Dynamic::from_array(vec![Dynamic::UNIT])));
    }

    #[test]
    fn test_json_round_trip() {
        let value = json!({"a": [1, 2.5, "x", null, true], "b": {"c": {}}});
        let dynamic = from_json(&value).unwrap();
        assert_eq!(to_json(&dynamic), value);
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(to_json(&Dynamic::from(FLOAT::NAN)), Value::Null);
    }

    #[test]
    fn test_display() {
        let value = from_json(&json!({"a": [1, null], "b": "s"})).unwrap();
        assert_eq!(display(&value), "[a:[1, null], b:s]");
        assert_eq!(display(&Dynamic::from_map(Map::new())), "[:]");
    }

    #[test]
    fn test_compare_mixed_numbers() {
        let one = Dynamic::from(1 as INT);
        let half = Dynamic::from(0.5 as FLOAT);
        assert_eq!(compare(&one, &half), Ordering::Greater);
        assert_eq!(compare(&Dynamic::UNIT, &one), Ordering::Less);
        assert_eq!(compare(&Dynamic::from("b"), &Dynamic::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(&Dynamic::from(" 42 ")).unwrap(), 42);
        assert_eq!(to_integer(&Dynamic::from(3.9 as FLOAT)).unwrap(), 3);
        assert!(to_integer(&Dynamic::from("abc")).is_err());
    }
}
