//! Per-invocation log sink and the script-facing logger objects

use super::value::display;
use parking_lot::Mutex;
use rhai::{Dynamic, Engine};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
struct LogBuffer {
    entries: Vec<String>,
    capacity: usize,
    dropped: usize,
}

/// Ordered log output of one execution
///
/// Cloned handles share the same buffer. Entries past the capacity are
/// counted but not stored; terminal entries are always kept.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    inner: Arc<Mutex<LogBuffer>>,
}

impl LogSink {
    /// Create a sink holding at most `capacity` script entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogBuffer {
                entries: Vec::new(),
                capacity,
                dropped: 0,
            })),
        }
    }

    /// Append a script log entry
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        trace!(target: "groovy_sandbox::script", "{}", line);
        let mut buffer = self.inner.lock();
        if buffer.entries.len() < buffer.capacity {
            buffer.entries.push(line);
        } else {
            buffer.dropped += 1;
        }
    }

    /// Append an entry regardless of capacity (failure reports)
    pub fn push_terminal(&self, line: impl Into<String>) {
        let line = line.into();
        trace!(target: "groovy_sandbox::script", "{}", line);
        self.inner.lock().entries.push(line);
    }

    /// Snapshot of the entries in append order
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    /// Number of entries discarded because the sink was full
    pub fn dropped(&self) -> usize {
        self.inner.lock().dropped
    }
}

/// `Logger` global
#[derive(Debug, Clone)]
pub(crate) struct ScriptLogger {
    sink: LogSink,
}

impl ScriptLogger {
    pub(crate) fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    fn log(&self, parts: &[Dynamic]) {
        let line: Vec<String> = parts.iter().map(display).collect();
        self.sink.push(line.join(" "));
    }
}

/// `messageLogFactory` global
#[derive(Debug, Clone)]
pub(crate) struct MessageLogFactory {
    sink: LogSink,
}

impl MessageLogFactory {
    pub(crate) fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

/// Message processing log handed out by `messageLogFactory`
#[derive(Debug, Clone)]
pub(crate) struct MessageLog {
    sink: LogSink,
}

pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptLogger>("Logger")
        .register_fn("log", |l: ScriptLogger| l.log(&[]))
        .register_fn("log", |l: ScriptLogger, a: Dynamic| l.log(&[a]))
        .register_fn("log", |l: ScriptLogger, a: Dynamic, b: Dynamic| l.log(&[a, b]))
        .register_fn(
            "log",
            |l: ScriptLogger, a: Dynamic, b: Dynamic, c: Dynamic| l.log(&[a, b, c]),
        )
        .register_fn(
            "log",
            |l: ScriptLogger, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                l.log(&[a, b, c, d])
            },
        )
        .register_fn(
            "log",
            |l: ScriptLogger, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic| {
                l.log(&[a, b, c, d, e])
            },
        )
        .register_fn(
            "log",
            |l: ScriptLogger,
             a: Dynamic,
             b: Dynamic,
             c: Dynamic,
             d: Dynamic,
             e: Dynamic,
             f: Dynamic| l.log(&[a, b, c, d, e, f]),
        );

    engine
        .register_type_with_name::<MessageLogFactory>("MessageLogFactory")
        .register_type_with_name::<MessageLog>("MessageLog")
        .register_fn("getMessageLog", |f: MessageLogFactory, _message: Dynamic| {
            MessageLog {
                sink: f.sink.clone(),
            }
        })
        .register_fn(
            "addAttachmentAsString",
            |log: MessageLog, name: &str, text: Dynamic, mime: &str| {
                log.sink
                    .push(format!("[attachment {} ({})] {}", name, mime, display(&text)));
            },
        )
        .register_fn(
            "setStringProperty",
            |log: MessageLog, name: &str, value: Dynamic| {
                log.sink.push(format!("[property] {}={}", name, display(&value)));
            },
        );
}
