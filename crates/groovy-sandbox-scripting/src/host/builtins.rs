//! Operators, conversions and the Groovy/Java standard library subset

use super::value::{
    compare, display, is_elvis_truthy, is_truthy, runtime_error, to_double, to_integer,
    RhaiResult,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use rhai::{Array, Dynamic, Engine, ImmutableString, Map, FLOAT, INT};
use std::cmp::Ordering;
use uuid::Uuid;

/// `UUID` namespace object
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct UuidFactory;

/// `Math` namespace object
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MathFunctions;

/// Exception constructors; a thrown exception is a `{message, type}` map
const EXCEPTION_TYPES: &[&str] = &[
    "Exception",
    "RuntimeException",
    "IllegalArgumentException",
    "IllegalStateException",
];

fn exception(kind: &str, message: &Dynamic) -> Map {
    let mut map = Map::new();
    map.insert("message".into(), display(message).into());
    map.insert("type".into(), kind.into());
    map
}

fn compile_regex(pattern: &str) -> RhaiResult<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Ok(re),
        Err(e) => runtime_error(format!("invalid regular expression: {}", e)),
    }
}

/// Java replacement strings use `$1`; wrap group numbers so `$1x` keeps working
fn replacement(java: &str) -> String {
    let mut out = String::with_capacity(java.len());
    let mut chars = java.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    if next == '$' {
                        out.push_str("$$");
                    } else {
                        out.push(next);
                    }
                }
            }
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    out.push(d);
                    chars.next();
                }
                out.push('}');
            }
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

fn substring(s: &str, start: INT, end: Option<INT>) -> RhaiResult<String> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as INT;
    let end = end.unwrap_or(len);
    if start < 0 || end > len || start > end {
        return runtime_error(format!(
            "begin {}, end {}, length {}",
            start, end, len
        ));
    }
    Ok(chars[start as usize..end as usize].iter().collect())
}

fn index_of(s: &str, needle: &str) -> INT {
    match s.find(needle) {
        Some(byte) => s[..byte].chars().count() as INT,
        None => -1,
    }
}

fn to_boolean(value: &Dynamic) -> bool {
    if let Ok(b) = value.as_bool() {
        return b;
    }
    let text = display(value);
    matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "y" | "1")
}

/// `String.valueOf`, `Integer.valueOf` and friends dispatch on the type name
fn value_of(type_name: &str, value: &Dynamic) -> RhaiResult<Dynamic> {
    let simple = type_name.rsplit('.').next().unwrap_or(type_name);
    match simple {
        "Integer" | "Long" | "Short" | "BigInteger" => to_integer(value).map(Dynamic::from),
        "Double" | "Float" | "BigDecimal" => to_double(value).map(Dynamic::from),
        "Boolean" => Ok(to_boolean(value).into()),
        _ => Ok(display(value).into()),
    }
}

fn decode_base64(s: &str) -> RhaiResult<String> {
    match STANDARD.decode(s.trim()) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => runtime_error(format!("invalid base64 input: {}", e)),
    }
}

fn round(x: FLOAT) -> INT {
    (x + 0.5).floor() as INT
}

fn register_operators(engine: &mut Engine) {
    engine
        .register_fn("truthy", |v: Dynamic| is_truthy(&v))
        .register_fn("!", |v: Dynamic| !is_truthy(&v))
        .register_fn("or_else", |a: Dynamic, b: Dynamic| {
            if is_elvis_truthy(&a) {
                a
            } else {
                b
            }
        })
        .register_fn("compare_to", |a: Dynamic, b: Dynamic| -> INT {
            match compare(&a, &b) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            }
        });
}

fn register_conversions(engine: &mut Engine) {
    engine
        .register_fn("to_string", |_: ()| "null".to_string())
        .register_fn("to_string", |m: &mut Map| display(&Dynamic::from_map(m.clone())))
        .register_fn("to_string", |a: &mut Array| display(&Dynamic::from_array(a.clone())))
        .register_fn("toString", |v: Dynamic| display(&v))
        .register_fn("String", |v: Dynamic| display(&v))
        .register_fn("toInteger", |v: Dynamic| to_integer(&v))
        .register_fn("toLong", |v: Dynamic| to_integer(&v))
        .register_fn("intValue", |v: Dynamic| to_integer(&v))
        .register_fn("toDouble", |v: Dynamic| to_double(&v))
        .register_fn("toBigDecimal", |v: Dynamic| to_double(&v))
        .register_fn("doubleValue", |v: Dynamic| to_double(&v))
        .register_fn("toBoolean", |v: Dynamic| to_boolean(&v))
        .register_fn("valueOf", |t: &str, v: Dynamic| value_of(t, &v))
        .register_fn("parseInt", |_: &str, v: Dynamic| to_integer(&v))
        .register_fn("parseLong", |_: &str, v: Dynamic| to_integer(&v))
        .register_fn("parseDouble", |_: &str, v: Dynamic| to_double(&v))
        .register_fn("parseBoolean", |_: &str, v: Dynamic| to_boolean(&v));
}

fn register_strings(engine: &mut Engine) {
    engine
        .register_fn("toUpperCase", |s: &str| s.to_uppercase())
        .register_fn("toLowerCase", |s: &str| s.to_lowercase())
        .register_fn("trim", |s: &str| s.trim().to_string())
        .register_fn("size", |s: &str| s.chars().count() as INT)
        .register_fn("length", |s: &str| s.chars().count() as INT)
        .register_fn("isEmpty", |s: &str| s.is_empty())
        .register_fn("startsWith", |s: &str, p: &str| s.starts_with(p))
        .register_fn("endsWith", |s: &str, p: &str| s.ends_with(p))
        .register_fn("equalsIgnoreCase", |s: &str, o: &str| {
            s.to_lowercase() == o.to_lowercase()
        })
        .register_fn("substring", |s: &str, start: INT| substring(s, start, None))
        .register_fn("substring", |s: &str, start: INT, end: INT| {
            substring(s, start, Some(end))
        })
        .register_fn("indexOf", |s: &str, needle: &str| index_of(s, needle))
        .register_fn("replace", |s: &str, from: &str, to: &str| s.replace(from, to))
        .register_fn("replaceAll", |s: &str, pattern: &str, to: &str| -> RhaiResult<String> {
            let re = compile_regex(pattern)?;
            Ok(re.replace_all(s, replacement(to).as_str()).into_owned())
        })
        .register_fn("matches", |s: &str, pattern: &str| -> RhaiResult<bool> {
            let re = compile_regex(&format!("^(?:{})$", pattern))?;
            Ok(re.is_match(s))
        })
        .register_fn("split", |s: &str, pattern: &str| -> RhaiResult<Array> {
            let re = compile_regex(pattern)?;
            let mut parts: Array = re.split(s).map(|p| Dynamic::from(p.to_string())).collect();
            while parts
                .last()
                .is_some_and(|p| p.read_lock::<ImmutableString>().is_some_and(|s| s.is_empty()))
            {
                parts.pop();
            }
            Ok(parts)
        })
        .register_fn("tokenize", |s: &str, delims: &str| {
            s.split(|c| delims.contains(c))
                .filter(|p| !p.is_empty())
                .map(|p| Dynamic::from(p.to_string()))
                .collect::<Array>()
        })
        .register_fn("tokenize", |s: &str| {
            s.split_whitespace()
                .map(|p| Dynamic::from(p.to_string()))
                .collect::<Array>()
        })
        .register_get("bytes", |s: &mut ImmutableString| s.clone())
        .register_fn("getBytes", |s: &str| s.to_string())
        .register_fn("encodeBase64", |s: &str| STANDARD.encode(s.as_bytes()))
        .register_fn("decodeBase64", |s: &str| decode_base64(s));
}

fn register_factories(engine: &mut Engine) {
    engine
        .register_fn("HashMap", Map::new)
        .register_fn("LinkedHashMap", Map::new)
        .register_fn("ArrayList", Array::new)
        .register_fn("ArrayList", |items: Array| items)
        .register_type_with_name::<UuidFactory>("UUID")
        .register_fn("randomUUID", |_: UuidFactory| Uuid::new_v4().to_string())
        .register_type_with_name::<MathFunctions>("Math")
        .register_fn("max", |_: MathFunctions, a: Dynamic, b: Dynamic| {
            if compare(&a, &b) == Ordering::Less {
                b
            } else {
                a
            }
        })
        .register_fn("min", |_: MathFunctions, a: Dynamic, b: Dynamic| {
            if compare(&a, &b) == Ordering::Greater {
                b
            } else {
                a
            }
        })
        .register_fn("abs", |_: MathFunctions, x: Dynamic| -> RhaiResult<Dynamic> {
            match x.as_int() {
                Ok(i) => Ok(i.abs().into()),
                Err(_) => Ok(to_double(&x)?.abs().into()),
            }
        })
        .register_fn("round", |_: MathFunctions, x: Dynamic| -> RhaiResult<INT> {
            Ok(round(to_double(&x)?))
        })
        .register_fn("floor", |_: MathFunctions, x: Dynamic| -> RhaiResult<FLOAT> {
            Ok(to_double(&x)?.floor())
        })
        .register_fn("ceil", |_: MathFunctions, x: Dynamic| -> RhaiResult<FLOAT> {
            Ok(to_double(&x)?.ceil())
        })
        .register_fn("sqrt", |_: MathFunctions, x: Dynamic| -> RhaiResult<FLOAT> {
            Ok(to_double(&x)?.sqrt())
        })
        .register_fn(
            "pow",
            |_: MathFunctions, x: Dynamic, y: Dynamic| -> RhaiResult<FLOAT> {
                Ok(to_double(&x)?.powf(to_double(&y)?))
            },
        );

    for &kind in EXCEPTION_TYPES {
        engine
            .register_fn(kind, move |message: Dynamic| exception(kind, &message))
            .register_fn(kind, move || exception(kind, &Dynamic::UNIT));
    }
    engine.register_fn("getMessage", |e: &mut Map| {
        e.get("message").map_or_else(String::new, display)
    });
}

pub(crate) fn register(engine: &mut Engine) {
    register_operators(engine);
    register_conversions(engine);
    register_strings(engine);
    register_factories(engine);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_replacement_groups() {
        assert_eq!(replacement("$1-x"), "${1}-x");
        assert_eq!(replacement("\\$5"), "$$5");
        assert_eq!(replacement("cost $"), "cost $$");
    }

    #[test]
    fn test_substring_bounds() {
        assert_eq!(substring("héllo", 1, Some(3)).unwrap(), "él");
        assert_eq!(substring("abc", 1, None).unwrap(), "bc");
        assert!(substring("abc", 2, Some(5)).is_err());
    }

    #[test]
    fn test_index_of_counts_chars() {
        assert_eq!(index_of("añb", "b"), 2);
        assert_eq!(index_of("abc", "z"), -1);
    }

    #[test]
    fn test_value_of_dispatch() {
        let n = value_of("java.lang.Integer", &Dynamic::from("12")).unwrap();
        assert_eq!(n.as_int().unwrap(), 12);
        let s = value_of("java.lang.String", &Dynamic::from(12 as INT)).unwrap();
        assert_eq!(s.into_string().unwrap(), "12");
    }

    #[test]
    fn test_base64() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), "hello");
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round(2.5), 3);
        assert_eq!(round(-2.5), -2);
    }
}
