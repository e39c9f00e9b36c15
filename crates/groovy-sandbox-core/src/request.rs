//! Script requests and payloads

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Message payload: opaque text or structured JSON
///
/// A JSON string value is always represented as [`Payload::Text`], so the
/// conversion from [`Value`] is total and unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Payload {
    /// Raw text, possibly serialized JSON
    Text(String),
    /// Structured JSON value
    Structured(Value),
}

impl Payload {
    /// Build a payload from text, keeping it structured when it parses as JSON
    pub fn from_text_lenient(text: impl Into<String>) -> Self {
        let text = text.into();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::String(_)) | Err(_) => Self::Text(text),
            Ok(value) => Self::Structured(value),
        }
    }

    /// Text view; structured payloads are serialized compactly
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Strict structured view; text must be valid JSON
    pub fn to_structured(&self) -> Result<Value> {
        match self {
            Self::Text(text) => serde_json::from_str(text).map_err(Error::from),
            Self::Structured(value) => Ok(value.clone()),
        }
    }

    /// Best-effort structured view; unparseable text becomes a JSON string
    pub fn to_structured_lenient(&self) -> Value {
        match self {
            Self::Text(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            Self::Structured(value) => value.clone(),
        }
    }

    /// Whether the payload is opaque text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Value::String(text),
            Payload::Structured(value) => value,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A single transform request: the raw script plus its input payload
///
/// Accepts both `{rawScript, payload}` and the web-facing `{script, body}`
/// field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest {
    /// Groovy-like script source
    #[serde(alias = "script")]
    pub raw_script: String,

    /// Input payload
    #[serde(alias = "body")]
    pub payload: Payload,
}

impl ScriptRequest {
    /// Create a new request
    pub fn new(raw_script: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            raw_script: raw_script.into(),
            payload: payload.into(),
        }
    }

    /// Reject requests that cannot be executed at all
    pub fn validate(&self) -> Result<()> {
        if self.raw_script.trim().is_empty() {
            return Err(Error::InvalidRequest("script is required".to_string()));
        }
        Ok(())
    }
}
