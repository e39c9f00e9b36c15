//! Host API emulation
//!
//! Everything a script can call lives here: the `Message` object, the JSON
//! helpers, `Logger`, `messageLogFactory`, and a small Groovy/Java standard
//! library. Nothing here touches the filesystem, network or process state.

mod builtins;
mod collections;
mod date;
mod json;
mod logger;
mod message;
pub(crate) mod value;

pub use logger::LogSink;
pub use message::HostMessage;

use rhai::{Engine, ImmutableString, Scope};

/// Type names scripts pass as hints (`getBody(String)`, `String.valueOf`)
const TYPE_NAMES: &[(&str, &str)] = &[
    ("String", "java.lang.String"),
    ("Integer", "java.lang.Integer"),
    ("Long", "java.lang.Long"),
    ("Double", "java.lang.Double"),
    ("Float", "java.lang.Float"),
    ("Boolean", "java.lang.Boolean"),
    ("BigDecimal", "java.math.BigDecimal"),
    ("Object", "java.lang.Object"),
    ("Map", "java.util.Map"),
    ("List", "java.util.List"),
    ("Reader", "java.io.Reader"),
];

/// Register every host type and function on `engine`
pub(crate) fn register(engine: &mut Engine) {
    builtins::register(engine);
    collections::register(engine);
    date::register(engine);
    json::register(engine);
    logger::register(engine);
    message::register(engine);
}

/// Push the global objects shared by both dialects
pub(crate) fn push_globals(scope: &mut Scope<'_>, sink: &LogSink) {
    scope
        .push("Logger", logger::ScriptLogger::new(sink.clone()))
        .push("messageLogFactory", logger::MessageLogFactory::new(sink.clone()))
        .push("JsonSlurper", json::JsonSlurper)
        .push("JsonOutput", json::JsonOutput)
        .push("UUID", builtins::UuidFactory)
        .push("Math", builtins::MathFunctions);
    for &(name, qualified) in TYPE_NAMES {
        scope.push(name, ImmutableString::from(qualified));
    }
}
