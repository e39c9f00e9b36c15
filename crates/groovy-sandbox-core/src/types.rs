//! Common types used throughout the transform pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Script dialect detected by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Plain Groovy-like script operating on `body` / `message` aliases
    Generic,
    /// Integration-platform style script with a `processData(Message)` entry point
    HostStyle,
}

impl Dialect {
    /// Whether the dialect requires entry-point extraction
    pub fn requires_entry_point(&self) -> bool {
        matches!(self, Self::HostStyle)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::HostStyle => write!(f, "host_style"),
        }
    }
}

/// Pipeline stage a diagnostic was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Dialect classification
    Classify,
    /// Entry-point extraction
    Extract,
    /// Syntax rewriting
    Rewrite,
    /// Sandboxed execution
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify => write!(f, "classify"),
            Self::Extract => write!(f, "extract"),
            Self::Rewrite => write!(f, "rewrite"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Diagnostic severity / category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Informational note about what the pipeline did
    Info,
    /// Something was accepted but may not behave as the author expects
    Warning,
    /// The stage failed
    Error,
}

/// A single pipeline diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic category
    pub kind: DiagnosticKind,
    /// Human-readable message
    pub message: String,
    /// Stage that produced the diagnostic
    pub stage: Stage,
}

impl Diagnostic {
    /// Create an informational diagnostic
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Info,
            message: message.into(),
            stage,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            stage,
        }
    }

    /// Create an error diagnostic
    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            message: message.into(),
            stage,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.stage, self.kind, self.message)
    }
}
