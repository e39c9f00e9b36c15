//! `Date` emulation backed by chrono

use super::value::{runtime_error, RhaiResult};
use chrono::{DateTime, TimeZone, Utc};
use rhai::{Engine, INT};
use std::fmt;

/// Point in time with millisecond precision, always UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DateValue(DateTime<Utc>);

impl DateValue {
    pub(crate) fn now() -> Self {
        Self(Utc::now())
    }

    pub(crate) fn from_millis(millis: INT) -> RhaiResult<Self> {
        match Utc.timestamp_millis_opt(millis).single() {
            Some(at) => Ok(Self(at)),
            None => runtime_error(format!("timestamp out of range: {}", millis)),
        }
    }

    pub(crate) fn millis(&self) -> INT {
        self.0.timestamp_millis()
    }

    pub(crate) fn format(&self, pattern: &str) -> String {
        self.0.format(&java_pattern(pattern)).to_string()
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%a %b %d %H:%M:%S UTC %Y"))
    }
}

/// Translate a `SimpleDateFormat` pattern into a chrono format string
fn java_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let mut j = i + 1;
            if chars.get(j) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            while j < chars.len() && chars[j] != '\'' {
                push_literal(&mut out, chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            ('z', _) => "%Z",
            _ => "",
        };
        if spec.is_empty() {
            for _ in 0..run {
                push_literal(&mut out, c);
            }
        } else {
            out.push_str(spec);
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<DateValue>("Date")
        .register_fn("Date", DateValue::now)
        .register_fn("Date", DateValue::from_millis)
        .register_fn("getTime", |d: DateValue| d.millis())
        .register_get("time", |d: &mut DateValue| d.millis())
        .register_fn("format", |d: DateValue, pattern: &str| d.format(pattern))
        .register_fn("to_string", |d: DateValue| d.to_string())
        .register_fn("toString", |d: DateValue| d.to_string());
}
