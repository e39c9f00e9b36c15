//! Dialect classification

use groovy_sandbox_core::Dialect;
use once_cell::sync::Lazy;
use regex::Regex;

/// Import of the integration platform's message API
static HOST_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*import\s+com\.sap\.gateway\b").expect("host import regex must compile")
});

/// The `Message processData(` entry-point signature
static HOST_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bMessage\s+processData\s*\(").expect("host signature regex must compile")
});

/// Classify a raw script; the first matching rule wins
pub fn classify(script: &str) -> Dialect {
    if HOST_IMPORT.is_match(script) || HOST_SIGNATURE.is_match(script) {
        Dialect::HostStyle
    } else {
        Dialect::Generic
    }
}
