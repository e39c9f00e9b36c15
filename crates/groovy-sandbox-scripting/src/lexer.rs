//! Groovy-dialect tokenizer
//!
//! The tokenizer is lossless: concatenating the text of every token yields the
//! input. String literals (including `${...}` interpolation and nested quotes)
//! and comments are single tokens, so later passes never rewrite inside them
//! by accident.

/// Quote style of a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `"..."`
    Double,
    /// `'...'`
    Single,
    /// `"""..."""`
    TripleDouble,
    /// `'''...'''`
    TripleSingle,
}

impl Quote {
    /// Delimiter length
    pub fn delimiter_len(self) -> usize {
        match self {
            Self::Double | Self::Single => 1,
            Self::TripleDouble | Self::TripleSingle => 3,
        }
    }

    /// Whether `${...}` is interpolated
    pub fn interpolates(self) -> bool {
        matches!(self, Self::Double | Self::TripleDouble)
    }
}

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Spaces, tabs, lone carriage returns
    Whitespace,
    /// `\n` or `\r\n`
    Newline,
    /// `// ...` up to (excluding) the line break
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// Identifier or keyword
    Ident,
    /// Numeric literal, including any type suffix
    Number,
    /// String literal
    Str(Quote),
    /// Operator or delimiter
    Punct,
}

/// A token borrowing its text from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Category
    pub kind: TokenKind,
    /// Exact source text
    pub text: &'a str,
    /// Byte offset into the source
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Whitespace or comment
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Whether this is the punctuation `p`
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Whether this is the identifier `name`
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    /// Whether the token can end an expression
    pub fn ends_expression(&self) -> bool {
        match self.kind {
            TokenKind::Ident => !CONTINUATION_KEYWORDS.contains(&self.text),
            TokenKind::Number | TokenKind::Str(_) => true,
            TokenKind::Punct => matches!(self.text, ")" | "]" | "}" | "++" | "--"),
            _ => false,
        }
    }
}

/// Keywords after which a statement cannot end
pub const CONTINUATION_KEYWORDS: &[&str] = &[
    "def", "var", "final", "new", "else", "try", "finally", "do", "in", "as", "instanceof",
    "static", "private", "public", "protected",
];

/// Multi-character operators, longest first
const MULTI_PUNCT: &[&str] = &[
    "<=>", ">>>", "**=", "<<=", ">>=", "?.", "?:", "?[", "->", "==", "!=", "<=", ">=", "&&", "||",
    "++", "--", "+=", "-=", "*=", "/=", "%=", "**", "..", "<<", ">>", "=~", "::",
];

/// Tokenize `src`
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    tokens
}

/// Whether a string literal token is closed by its delimiter
pub fn is_terminated(text: &str, quote: Quote) -> bool {
    let mut lexer = Lexer { src: text, pos: 0 };
    lexer.scan_string(quote) && lexer.pos == text.len()
}

/// For every bracket token, the index of its partner (`(`/`)`, `[`/`?[`/`]`, `{`/`}`)
///
/// Unbalanced brackets map to `None`.
pub fn match_brackets(tokens: &[Token<'_>]) -> Vec<Option<usize>> {
    let mut partners = vec![None; tokens.len()];
    let mut stack: Vec<(usize, char)> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        let (opens, closes) = match token.text {
            "(" => (Some('('), None),
            "[" | "?[" => (Some('['), None),
            "{" => (Some('{'), None),
            ")" => (None, Some('(')),
            "]" => (None, Some('[')),
            "}" => (None, Some('{')),
            _ => (None, None),
        };
        if let Some(open) = opens {
            stack.push((i, open));
        } else if let Some(wanted) = closes {
            if let Some(depth) = stack.iter().rposition(|(_, open)| *open == wanted) {
                let (start, _) = stack[depth];
                stack.truncate(depth);
                partners[start] = Some(i);
                partners[i] = Some(start);
            }
        }
    }
    partners
}

/// Byte offset of the `}` closing the `{` at the start of `src`
///
/// Braces inside strings and comments are ignored.
pub fn closing_brace(src: &str) -> Option<usize> {
    let mut depth = 0usize;
    for token in tokenize(src) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "{" => depth += 1,
            "}" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(token.offset);
                }
            }
            _ => {}
        }
    }
    None
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let c = self.peek()?;
        let kind = match c {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            '\r' if self.peek_at(1) == Some('\n') => {
                self.pos += 2;
                TokenKind::Newline
            }
            c if c.is_whitespace() => {
                while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n')
                    && !self.rest().starts_with("\r\n")
                {
                    self.bump();
                }
                TokenKind::Whitespace
            }
            '#' if start == 0 && self.rest().starts_with("#!") => {
                self.skip_line();
                TokenKind::LineComment
            }
            '/' if self.rest().starts_with("//") => {
                self.skip_line();
                TokenKind::LineComment
            }
            '/' if self.rest().starts_with("/*") => {
                self.pos += 2;
                match self.rest().find("*/") {
                    Some(end) => self.pos += end + 2,
                    None => self.pos = self.src.len(),
                }
                TokenKind::BlockComment
            }
            '"' | '\'' => {
                let quote = self.string_quote(c);
                self.scan_string(quote);
                TokenKind::Str(quote)
            }
            c if c.is_ascii_digit() => {
                self.scan_number();
                TokenKind::Number
            }
            c if is_ident_start(c) => {
                while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
                    self.bump();
                }
                TokenKind::Ident
            }
            _ => {
                match MULTI_PUNCT.iter().find(|p| self.rest().starts_with(**p)) {
                    Some(p) => self.pos += p.len(),
                    None => {
                        self.bump();
                    }
                }
                TokenKind::Punct
            }
        };
        Some(Token {
            kind,
            text: &self.src[start..self.pos],
            offset: start,
        })
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || self.rest().starts_with("\r\n") {
                break;
            }
            self.bump();
        }
    }

    fn string_quote(&self, c: char) -> Quote {
        let triple = if c == '"' { "\"\"\"" } else { "'''" };
        match (c, self.rest().starts_with(triple)) {
            ('"', true) => Quote::TripleDouble,
            ('"', false) => Quote::Double,
            (_, true) => Quote::TripleSingle,
            (_, false) => Quote::Single,
        }
    }

    /// Scan a string literal, returning whether its closing delimiter was found
    ///
    /// Unterminated triple-quoted strings run to end of input; single-line
    /// strings stop before the line break.
    fn scan_string(&mut self, quote: Quote) -> bool {
        let delimiter = match quote {
            Quote::Double => "\"",
            Quote::Single => "'",
            Quote::TripleDouble => "\"\"\"",
            Quote::TripleSingle => "'''",
        };
        self.pos += delimiter.len();
        loop {
            if self.rest().starts_with(delimiter) {
                self.pos += delimiter.len();
                return true;
            }
            if quote.delimiter_len() == 1 && matches!(self.peek(), Some('\n' | '\r')) {
                return false;
            }
            match self.bump() {
                None => return false,
                Some('\\') => {
                    self.bump();
                }
                Some('$') if quote.interpolates() && self.peek() == Some('{') => {
                    self.bump();
                    self.skip_interpolation();
                }
                Some(_) => {}
            }
        }
    }

    /// Skip a `${...}` body (opening brace already consumed)
    fn skip_interpolation(&mut self) {
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                '"' | '\'' => {
                    let quote = self.string_quote(c);
                    self.scan_string(quote);
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn scan_number(&mut self) {
        let hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");
        if hex {
            self.pos += 2;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            self.eat_digits();
            if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
            {
                self.bump();
                self.eat_digits();
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_at(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if matches!(self.peek_at(digit_at), Some(c) if c.is_ascii_digit()) {
                    self.pos += digit_at;
                    self.eat_digits();
                }
            }
        }
        if matches!(self.peek(), Some(c) if "lLgGdDfFiI".contains(c))
            && !matches!(self.peek_at(1), Some(c) if is_ident_continue(c))
        {
            self.bump();
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_lossless() {
        let src = "def x = [a: 1, 'b': \"${y ?: \"z\"}\"] // done\r\nprintln x?.a\n";
        let joined: String = tokenize(src).iter().map(|t| t.text).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn test_interpolated_string_is_one_token() {
        let tokens = kinds(r#"println "total: ${items.collect { "${it}" }.size()}""#);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].0, TokenKind::Str(Quote::Double));
    }

    #[test]
    fn test_multi_char_operators() {
        let tokens = kinds("a?.b ?: c?[0] -> i++");
        let puncts: Vec<&str> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Punct)
            .map(|(_, t)| *t)
            .collect();
        assert_eq!(puncts, vec!["?.", "?:", "?[", "]", "->", "++"]);
    }

    #[test]
    fn test_numbers_with_suffix() {
        let tokens = kinds("10L 1.5d 0xFF 2e10 3");
        let numbers: Vec<&str> = tokens.iter().map(|(_, t)| *t).collect();
        assert_eq!(numbers, vec!["10L", "1.5d", "0xFF", "2e10", "3"]);
    }

    #[test]
    fn test_range_is_not_a_decimal() {
        let tokens = kinds("1..5");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Number, "1"),
                (TokenKind::Punct, ".."),
                (TokenKind::Number, "5")
            ]
        );
    }

    #[test]
    fn test_comments_and_triple_strings() {
        let tokens = kinds("/* a { */ '''it's {''' // }\n");
        assert_eq!(tokens[0].0, TokenKind::BlockComment);
        assert_eq!(tokens[1].0, TokenKind::Str(Quote::TripleSingle));
        assert_eq!(tokens[2].0, TokenKind::LineComment);
        assert_eq!(tokens[3].0, TokenKind::Newline);
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        let tokens = kinds("x = \"open");
        assert_eq!(tokens.last().map(|t| t.1), Some("\"open"));
    }

    #[test]
    fn test_single_line_string_stops_at_newline() {
        let tokens = tokenize("def s = 'abc\nreturn s");
        let literal = tokens.iter().find(|t| matches!(t.kind, TokenKind::Str(_))).unwrap();
        assert_eq!(literal.text, "'abc");
        assert!(!is_terminated(literal.text, Quote::Single));
        assert!(tokens.iter().any(|t| t.is_ident("return")));
    }

    #[test]
    fn test_terminated_strings() {
        assert!(is_terminated("'abc'", Quote::Single));
        assert!(is_terminated(r#""a\"b""#, Quote::Double));
        assert!(!is_terminated(r#""a\""#, Quote::Double));
        assert!(is_terminated("'''a\nb'''", Quote::TripleSingle));
    }

    #[test]
    fn test_match_brackets() {
        let tokens = tokenize("f(a[1], { x -> x })");
        let partners = match_brackets(&tokens);
        let open = tokens.iter().position(|t| t.text == "(").unwrap();
        let close = tokens.iter().rposition(|t| t.text == ")").unwrap();
        assert_eq!(partners[open], Some(close));
        let brace = tokens.iter().position(|t| t.text == "{").unwrap();
        let brace_close = tokens.iter().position(|t| t.text == "}").unwrap();
        assert_eq!(partners[brace], Some(brace_close));
    }

    #[test]
    fn test_closing_brace_skips_strings() {
        assert_eq!(closing_brace("{ a = \"}\" } tail"), Some(10));
        assert_eq!(closing_brace("{ open"), None);
    }

    #[test]
    fn test_unbalanced_brackets_have_no_partner() {
        let tokens = tokenize("{ (");
        assert!(match_brackets(&tokens).iter().all(Option::is_none));
    }
}
