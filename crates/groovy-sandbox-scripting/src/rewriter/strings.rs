//! String literal conversion
//!
//! Plain strings become double-quoted literals. Strings that interpolate
//! (`${expr}` or `$name.path`) become back-tick templates with every embedded
//! expression rewritten recursively.

use super::rewrite_expression;
use crate::lexer::{self, Quote};

#[derive(Debug, PartialEq, Eq)]
enum Part {
    Text(String),
    Expr(String),
}

/// Convert a string literal token
pub(super) fn convert(text: &str, quote: Quote) -> String {
    let parts = decode(strip_delimiters(text, quote), quote.interpolates());
    encode(&parts)
}

/// Quote a bare map key
pub(super) fn quote_key(name: &str) -> String {
    encode(&[Part::Text(name.to_string())])
}

fn strip_delimiters(text: &str, quote: Quote) -> &str {
    let n = quote.delimiter_len();
    let delimiter = &text[..n.min(text.len())];
    let inner = text.get(n..).unwrap_or("");
    inner.strip_suffix(delimiter).unwrap_or(inner)
}

fn decode(content: &str, interpolate: bool) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = content.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next().map(|(_, e)| e) {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some('b') => text.push('\u{8}'),
                Some('f') => text.push('\u{c}'),
                Some('0') => text.push('\0'),
                Some('\n') => {}
                Some('u') => {
                    let hex: String = (0..4).filter_map(|_| chars.next().map(|(_, h)| h)).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => text.push(decoded),
                        None => {
                            text.push_str("\\u");
                            text.push_str(&hex);
                        }
                    }
                }
                Some(e @ ('\\' | '\'' | '"' | '$' | '`')) => text.push(e),
                Some(other) => {
                    text.push('\\');
                    text.push(other);
                }
                None => text.push('\\'),
            },
            '$' if interpolate => {
                let rest = &content[i + 1..];
                let consumed = if rest.starts_with('{') {
                    lexer::closing_brace(rest).map(|close| {
                        let expr = rest[1..close].trim();
                        if !expr.is_empty() {
                            flush(&mut parts, &mut text);
                            parts.push(Part::Expr(rewrite_expression(expr)));
                        }
                        close + 1
                    })
                } else {
                    let len = dotted_path_len(rest);
                    (len > 0).then(|| {
                        flush(&mut parts, &mut text);
                        parts.push(Part::Expr(rest[..len].to_string()));
                        len
                    })
                };
                match consumed {
                    Some(len) => {
                        let end = i + 1 + len;
                        while matches!(chars.peek(), Some(&(j, _)) if j < end) {
                            chars.next();
                        }
                    }
                    None => text.push('$'),
                }
            }
            _ => text.push(c),
        }
    }
    flush(&mut parts, &mut text);
    parts
}

fn flush(parts: &mut Vec<Part>, text: &mut String) {
    if !text.is_empty() {
        parts.push(Part::Text(std::mem::take(text)));
    }
}

/// Length of `name(.name)*` at the start of `s`
fn dotted_path_len(s: &str) -> usize {
    let ident_len = |s: &str| -> usize {
        let mut chars = s.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return 0,
        }
        chars
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(s.len())
    };

    let mut len = ident_len(s);
    if len == 0 {
        return 0;
    }
    while s[len..].starts_with('.') {
        let next = ident_len(&s[len + 1..]);
        if next == 0 {
            break;
        }
        len += 1 + next;
    }
    len
}

fn encode(parts: &[Part]) -> String {
    let interpolated = parts.iter().any(|p| matches!(p, Part::Expr(_)));
    let mut out = String::new();
    if interpolated {
        out.push('`');
        for part in parts {
            match part {
                Part::Text(text) => out.push_str(&text.replace('`', "``")),
                Part::Expr(expr) => {
                    out.push_str("${");
                    out.push_str(expr);
                    out.push('}');
                }
            }
        }
        out.push('`');
    } else {
        out.push('"');
        for part in parts {
            if let Part::Text(text) = part {
                for c in text.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                        c => out.push(c),
                    }
                }
            }
        }
        out.push('"');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quotes_become_double() {
        assert_eq!(convert(r"'it\'s'", Quote::Single), "\"it's\"");
        assert_eq!(convert(r#"'say "hi"'"#, Quote::Single), r#""say \"hi\"""#);
    }

    #[test]
    fn test_single_quotes_do_not_interpolate() {
        assert_eq!(convert("'${x}'", Quote::Single), "\"${x}\"");
    }

    #[test]
    fn test_plain_double_quoted_string() {
        assert_eq!(convert(r#""a\tb""#, Quote::Double), r#""a\tb""#);
        assert_eq!(convert(r#""cost: \$5""#, Quote::Double), r#""cost: $5""#);
    }

    #[test]
    fn test_braced_interpolation() {
        assert_eq!(
            convert(r#""Error: ${e.message}""#, Quote::Double),
            "`Error: ${e.message}`"
        );
    }

    #[test]
    fn test_interpolated_expression_is_rewritten() {
        assert_eq!(
            convert(r#""name: ${x ?: 'none'}""#, Quote::Double),
            "`name: ${x or_else \"none\"}`"
        );
    }

    #[test]
    fn test_dollar_path_interpolation() {
        assert_eq!(convert(r#""Hi $user.name""#, Quote::Double), "`Hi ${user.name}`");
        assert_eq!(convert(r#""Hi $name.""#, Quote::Double), "`Hi ${name}.`");
        assert_eq!(convert(r#""5 $""#, Quote::Double), "\"5 $\"");
    }

    #[test]
    fn test_backticks_are_doubled_in_templates() {
        assert_eq!(convert(r#""`${a}`""#, Quote::Double), "```${a}```");
    }

    #[test]
    fn test_triple_quoted_keeps_newlines() {
        assert_eq!(
            convert("\"\"\"line1\nline2\"\"\"", Quote::TripleDouble),
            "\"line1\\nline2\""
        );
    }

    #[test]
    fn test_quote_key() {
        assert_eq!(quote_key("nombreCompleto"), "\"nombreCompleto\"");
    }
}
