//! Import normalization

use once_cell::sync::Lazy;
use regex::Regex;

/// A whole `import ...` line including its line break
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+[^\r\n]*(?:\r?\n|$)").expect("import regex must compile")
});

/// Remove every import line and trim leading whitespace
///
/// Idempotent: normalizing an already-normalized script is a no-op.
pub fn normalize_imports(script: &str) -> String {
    IMPORT_LINE
        .replace_all(script, "")
        .trim_start()
        .to_string()
}
