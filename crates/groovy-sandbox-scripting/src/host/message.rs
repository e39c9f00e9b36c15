//! `Message` emulation: body, headers and properties of one execution

use super::value::{display, from_json, to_json, RhaiResult};
use groovy_sandbox_core::Payload;
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, ImmutableString};
use serde_json::{Map as JsonMap, Value};
use std::sync::Arc;

#[derive(Debug)]
struct MessageState {
    body: Payload,
    headers: JsonMap<String, Value>,
    properties: JsonMap<String, Value>,
}

/// Mutable message owned by one execution
///
/// Clones share state, so a script that copies the binding still mutates
/// the message the engine reads back.
#[derive(Debug, Clone)]
pub struct HostMessage {
    state: Arc<Mutex<MessageState>>,
}

/// Final state read back after execution
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MessageParts {
    pub(crate) result: Value,
    pub(crate) headers: JsonMap<String, Value>,
    pub(crate) properties: JsonMap<String, Value>,
}

impl HostMessage {
    /// Wrap an independent copy of the payload
    pub fn new(payload: Payload) -> Self {
        Self {
            state: Arc::new(Mutex::new(MessageState {
                body: payload,
                headers: JsonMap::new(),
                properties: JsonMap::new(),
            })),
        }
    }

    /// Text view of the body
    pub fn body_text(&self) -> String {
        self.state.lock().body.as_text().into_owned()
    }

    /// Best-effort structured view (`getResult()`)
    pub fn result(&self) -> Value {
        self.state.lock().body.to_structured_lenient()
    }

    /// Replace the body; strings are parsed when they hold structured data
    pub fn set_body(&self, value: &Dynamic) {
        let body = if let Some(text) = value.read_lock::<ImmutableString>() {
            Payload::from_text_lenient(text.as_str())
        } else if let Some(other) = value.read_lock::<HostMessage>() {
            other.state.lock().body.clone()
        } else {
            Payload::from(to_json(value))
        };
        self.state.lock().body = body;
    }

    fn get_body(&self, hint: Option<&Dynamic>) -> RhaiResult<Dynamic> {
        let body = self.state.lock().body.clone();
        match hint {
            Some(hint) if is_text_hint(hint) => Ok(body.as_text().into_owned().into()),
            _ => from_json(&body.to_structured_lenient()),
        }
    }

    fn set_entry(&self, which: Section, name: &str, value: &Dynamic) {
        let mut state = self.state.lock();
        let target = match which {
            Section::Headers => &mut state.headers,
            Section::Properties => &mut state.properties,
        };
        target.insert(name.to_string(), to_json(value));
    }

    fn get_entry(&self, which: Section, name: &str, hint: Option<&Dynamic>) -> RhaiResult<Dynamic> {
        let value = {
            let state = self.state.lock();
            let source = match which {
                Section::Headers => &state.headers,
                Section::Properties => &state.properties,
            };
            source.get(name).cloned()
        };
        match value {
            None => Ok(Dynamic::UNIT),
            Some(Value::String(text)) => Ok(text.into()),
            Some(value) if hint.is_some_and(is_text_hint) => Ok(value.to_string().into()),
            Some(value) => from_json(&value),
        }
    }

    fn entries(&self, which: Section) -> RhaiResult<Dynamic> {
        let state = self.state.lock();
        let source = match which {
            Section::Headers => &state.headers,
            Section::Properties => &state.properties,
        };
        from_json(&Value::Object(source.clone()))
    }

    pub(crate) fn parts(&self) -> MessageParts {
        let result = self.result();
        let state = self.state.lock();
        MessageParts {
            result,
            headers: state.headers.clone(),
            properties: state.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Headers,
    Properties,
}

/// Whether a type hint asks for text (`String`, `java.lang.String`, `Reader`)
fn is_text_hint(hint: &Dynamic) -> bool {
    let name = display(hint);
    let simple = name.rsplit('.').next().unwrap_or(&name);
    matches!(simple, "String" | "CharSequence" | "Reader" | "GString")
}

pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<HostMessage>("Message")
        .register_fn("getBody", |m: &mut HostMessage| m.get_body(None))
        .register_fn("getBody", |m: &mut HostMessage, hint: Dynamic| {
            m.get_body(Some(&hint))
        })
        .register_get("body", |m: &mut HostMessage| m.get_body(None))
        .register_fn("setBody", |m: &mut HostMessage, value: Dynamic| m.set_body(&value))
        .register_fn("getResult", |m: &mut HostMessage| from_json(&m.result()))
        .register_fn("getHeader", |m: &mut HostMessage, name: &str| {
            m.get_entry(Section::Headers, name, None)
        })
        .register_fn("getHeader", |m: &mut HostMessage, name: &str, hint: Dynamic| {
            m.get_entry(Section::Headers, name, Some(&hint))
        })
        .register_fn("setHeader", |m: &mut HostMessage, name: &str, value: Dynamic| {
            m.set_entry(Section::Headers, name, &value)
        })
        .register_fn("getHeaders", |m: &mut HostMessage| m.entries(Section::Headers))
        .register_fn("getProperty", |m: &mut HostMessage, name: &str| {
            m.get_entry(Section::Properties, name, None)
        })
        .register_fn("setProperty", |m: &mut HostMessage, name: &str, value: Dynamic| {
            m.set_entry(Section::Properties, name, &value)
        })
        .register_fn("getProperties", |m: &mut HostMessage| {
            m.entries(Section::Properties)
        })
        .register_fn("to_string", |m: &mut HostMessage| m.body_text());
}
