//! Declared-variable scan

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// A declaration keyword followed by the declared name
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:def|let|const|var)\s+([a-zA-Z_$][a-zA-Z0-9_$]*)")
        .expect("declaration regex must compile")
});

/// Context bindings reported whenever they appear in the script text
const CONTEXT_BINDINGS: &[&str] = &["body", "message"];

/// Names declared by the original script, plus referenced context bindings
pub fn declared_variables(script: &str) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = DECLARATION
        .captures_iter(script)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    for binding in CONTEXT_BINDINGS {
        if script.contains(binding) {
            names.insert((*binding).to_string());
        }
    }
    names
}
