//! Entry-point extraction for host-style scripts

use crate::error::{Result, ScriptError};
use crate::lexer;
use once_cell::sync::Lazy;
use regex::Regex;

/// `Message processData(Message <name>) {`
static ENTRY_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Message\s+processData\s*\(\s*Message\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\)\s*\{")
        .expect("entry signature regex must compile")
});

/// The body of `processData` and the name its message parameter is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint<'a> {
    /// Statements between the function's braces
    pub body: &'a str,
    /// Declared parameter name
    pub message_binding: &'a str,
}

/// Extract the `processData` body from a normalized host-style script
///
/// The closing brace is found by bracket matching, ignoring braces inside
/// strings and comments, so helper code after the function is not included.
pub fn extract_entry_point(script: &str) -> Result<EntryPoint<'_>> {
    let caps = ENTRY_SIGNATURE.captures(script).ok_or_else(|| {
        ScriptError::missing_entry_point("no `Message processData(Message ...) {` signature found")
    })?;
    let (Some(whole), Some(binding)) = (caps.get(0), caps.get(1)) else {
        return Err(ScriptError::missing_entry_point("malformed processData signature"));
    };

    let open = whole.end() - 1;
    let close = lexer::closing_brace(&script[open..])
        .map(|rel| open + rel)
        .ok_or_else(|| ScriptError::missing_entry_point("unterminated processData body"))?;

    Ok(EntryPoint {
        body: &script[open + 1..close],
        message_binding: binding.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_body_and_binding() {
        let script = "Message processData(Message message) {\n    return message\n}\n";
        let entry = extract_entry_point(script).unwrap();
        assert_eq!(entry.body.trim(), "return message");
        assert_eq!(entry.message_binding, "message");
    }

    #[test]
    fn test_custom_parameter_name() {
        let script = "Message processData(Message msg){ msg.setBody('x'); return msg }";
        let entry = extract_entry_point(script).unwrap();
        assert_eq!(entry.message_binding, "msg");
        assert_eq!(entry.body.trim(), "msg.setBody('x'); return msg");
    }

    #[test]
    fn test_nested_braces_and_trailing_helpers() {
        let script = r#"Message processData(Message message) {
    def items = [1, 2].collect { it * 2 }
    if (items) { message.setBody("}") }
    return message
}

def helper() { return 1 }
"#;
        let entry = extract_entry_point(script).unwrap();
        assert!(entry.body.contains("message.setBody(\"}\")"));
        assert!(!entry.body.contains("helper"));
        assert!(entry.body.trim_end().ends_with("return message"));
    }

    #[test]
    fn test_missing_signature() {
        let err = extract_entry_point("def x = 1").unwrap_err();
        assert!(matches!(err, ScriptError::MissingEntryPoint { .. }));
    }

    #[test]
    fn test_unterminated_body() {
        let err = extract_entry_point("Message processData(Message m) {\n return m\n").unwrap_err();
        assert_eq!(
            err,
            ScriptError::missing_entry_point("unterminated processData body")
        );
    }

    #[test]
    fn test_signature_without_parameter_name() {
        assert!(extract_entry_point("Message processData(Message) { }").is_err());
    }
}
