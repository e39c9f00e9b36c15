//! Groovy-to-Rhai syntax rewriting
//!
//! A single left-to-right pass over the token stream with a stack of open
//! constructs. Each Groovy idiom is rewritten where it is recognized:
//!
//! - `def`/`var`/typed declarations become `let`
//! - `null` becomes `()`, `new T(...)` becomes `T(...)`
//! - `[k: v]` / `[:]` map literals become object maps
//! - closures become `|params| { ... }`, with collection methods renamed by
//!   arity (`each` -> `for_each`, `findAll` -> `filter`, ...)
//! - `?:` becomes the `or_else` operator, ternaries become `if` expressions
//! - `println x` becomes `Logger.log(x)`
//! - conditions are wrapped in `truthy(...)`
//! - statement terminators are inserted at line ends
//!
//! The pass never fails: unrecognized input is copied through and any
//! resulting syntax error surfaces when the sandbox compiles the program.

mod methods;
mod strings;

use crate::lexer::{self, Token, TokenKind};
use groovy_sandbox_core::{Diagnostic, Stage};
use std::collections::HashSet;
use tracing::trace;

/// Program text ready for the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenProgram {
    /// Rewritten source
    pub source: String,
    /// Whether `return <binding>` was appended
    pub appended_terminal: bool,
    /// Notes about what the rewrite did or could not do
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite a script body
///
/// When the body neither returns nor calls `setBody`, `return <terminal_binding>`
/// is appended so the message binding is the result.
pub fn rewrite(body: &str, terminal_binding: &str) -> RewrittenProgram {
    let mut rewriter = Rewriter::new(body, FrameKind::Root);
    rewriter.run();

    let appended_terminal = !rewriter.has_return && !rewriter.sets_body;
    let open_statement = rewriter.open_statement;
    let mut diagnostics = std::mem::take(&mut rewriter.diagnostics);
    let mut source = rewriter.out;

    if appended_terminal {
        if open_statement {
            source.push_str("\n;");
        }
        source.push_str("\nreturn ");
        source.push_str(terminal_binding);
        source.push_str(";\n");
        diagnostics.push(Diagnostic::info(
            Stage::Rewrite,
            format!("no return statement; appended `return {}`", terminal_binding),
        ));
    }

    trace!(bytes = source.len(), appended_terminal, "Rewrote script body");
    RewrittenProgram {
        source,
        appended_terminal,
        diagnostics,
    }
}

/// Rewrite a single embedded expression (string interpolation)
pub(crate) fn rewrite_expression(expr: &str) -> String {
    let mut rewriter = Rewriter::new(expr, FrameKind::Embedded);
    rewriter.run();
    rewriter.out
}

/// Declaration modifiers that may precede a typed declaration
const MODIFIERS: &[&str] = &["final", "static", "private", "public", "protected"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Top level of a script body
    Root,
    /// Top level of an interpolated expression
    Embedded,
    /// `(...)`; conditions get an implicit block when no brace follows
    Paren { condition: bool },
    /// `[...]` list literal or index
    Index,
    /// `[k: v]` literal
    MapLiteral { expect_key: bool },
    /// `{...}` statement block
    Block,
    /// `{ a -> ... }`; `call` closures also close the method call paren
    Closure { call: bool },
    /// Call opened without parentheses (`println x`, `list << x`)
    CallTail,
    /// Braces added around an unbraced `if`/`else`/loop body
    ImplicitBlock,
    /// `c ? a : b`, emitted as `if truthy(c) { a } else { b }`
    Ternary { in_else: bool },
}

impl FrameKind {
    fn holds_statements(self) -> bool {
        matches!(
            self,
            Self::Root | Self::Block | Self::Closure { .. } | Self::ImplicitBlock
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    has_content: bool,
    /// Output offset where the current expression started
    expr_start: usize,
}

/// Where a method's closure argument sits
#[derive(Debug, Clone, Copy)]
enum ClosureArg {
    /// `name { ... }`
    Bare { brace: usize },
    /// `name(args) { ... }`
    Trailing { paren: usize, close: usize, brace: usize },
    /// `name({ ... })`
    Inside { paren: usize, brace: usize },
}

impl ClosureArg {
    fn brace(self) -> usize {
        match self {
            Self::Bare { brace } | Self::Trailing { brace, .. } | Self::Inside { brace, .. } => {
                brace
            }
        }
    }
}

struct Rewriter<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    partners: Vec<Option<usize>>,
    pos: usize,
    out: String,
    stack: Vec<Frame>,
    /// `)` tokens followed by a trailing closure argument
    trailing_parens: Vec<usize>,
    /// `}` tokens closing statement blocks (never followed by `;`)
    block_closers: HashSet<usize>,
    has_return: bool,
    sets_body: bool,
    /// The output ends in an expression statement without a terminator
    open_statement: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Rewriter<'a> {
    fn new(src: &'a str, base: FrameKind) -> Self {
        let tokens = lexer::tokenize(src);
        let partners = lexer::match_brackets(&tokens);
        Self {
            src,
            tokens,
            partners,
            pos: 0,
            out: String::with_capacity(src.len() + src.len() / 4),
            stack: vec![Frame {
                kind: base,
                has_content: false,
                expr_start: 0,
            }],
            trailing_parens: Vec::new(),
            block_closers: HashSet::new(),
            has_return: false,
            sets_body: false,
            open_statement: false,
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos];
            match token.kind {
                TokenKind::Whitespace | TokenKind::BlockComment => self.copy(),
                TokenKind::LineComment => {
                    match token.text.strip_prefix("#!") {
                        Some(rest) => {
                            self.out.push_str("//");
                            self.out.push_str(rest);
                        }
                        None => self.out.push_str(token.text),
                    }
                    self.pos += 1;
                }
                TokenKind::Newline => self.newline(),
                TokenKind::Str(quote) if !lexer::is_terminated(token.text, quote) => {
                    // left as-is so compilation rejects it
                    self.diagnostics.push(Diagnostic::warning(
                        Stage::Rewrite,
                        "unterminated string literal",
                    ));
                    self.emit(token.text);
                    self.pos += 1;
                }
                TokenKind::Str(quote) => {
                    let converted = strings::convert(token.text, quote);
                    self.map_key_consumed();
                    self.emit(&converted);
                    self.pos += 1;
                }
                TokenKind::Number => {
                    let literal = if self.is_map_key(self.pos) {
                        self.map_key_consumed();
                        strings::quote_key(token.text)
                    } else {
                        methods::number_literal(token.text)
                    };
                    self.emit(&literal);
                    self.pos += 1;
                }
                TokenKind::Ident => self.ident(),
                TokenKind::Punct => self.punct(),
            }
        }
        self.finish();
    }

    // ---- output and frame helpers ----

    fn copy(&mut self) {
        self.out.push_str(self.tokens[self.pos].text);
        self.pos += 1;
    }

    fn emit(&mut self, text: &str) {
        self.top_mut().has_content = true;
        self.out.push_str(text);
    }

    fn emit_advance(&mut self, text: &str) {
        self.emit(text);
        self.pos += 1;
    }

    fn top(&self) -> Frame {
        self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Push a frame; call after emitting the opener
    fn push_frame(&mut self, kind: FrameKind) {
        self.top_mut().has_content = true;
        let expr_start = self.out.len();
        self.stack.push(Frame {
            kind,
            has_content: false,
            expr_start,
        });
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    fn mark_expr_start(&mut self) {
        let at = self.out.len();
        self.top_mut().expr_start = at;
    }

    fn trim_trailing_whitespace(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    /// Insert `text` before any trailing spaces already written
    fn insert_before_trailing_whitespace(&mut self, text: &str) {
        let at = self.out.trim_end_matches([' ', '\t']).len();
        self.out.insert_str(at, text);
    }

    fn close_ternaries(&mut self) {
        while matches!(self.top().kind, FrameKind::Ternary { .. }) && self.stack.len() > 1 {
            self.insert_before_trailing_whitespace(" }");
            self.stack.pop();
        }
    }

    /// Close frames that end with the expression: ternaries and paren-less calls
    fn close_expression_frames(&mut self) {
        loop {
            match self.top().kind {
                FrameKind::Ternary { .. } => self.insert_before_trailing_whitespace(" }"),
                FrameKind::CallTail => self.insert_before_trailing_whitespace(")"),
                _ => return,
            }
            self.stack.pop();
        }
    }

    /// Close implicit blocks that received a statement
    fn close_implicit_blocks(&mut self) -> bool {
        let mut closed = false;
        while self.top().kind == FrameKind::ImplicitBlock && self.top().has_content {
            self.insert_before_trailing_whitespace(if closed { " }" } else { "; }" });
            self.stack.pop();
            closed = true;
        }
        closed
    }

    // ---- token navigation ----

    fn token(&self, idx: usize) -> Option<Token<'a>> {
        self.tokens.get(idx).copied()
    }

    /// First index at or after `idx` that is not whitespace or a comment
    fn skip_trivia(&self, mut idx: usize) -> usize {
        while self.tokens.get(idx).is_some_and(|t| t.is_trivia()) {
            idx += 1;
        }
        idx
    }

    /// Like [`Self::skip_trivia`] but also crosses line breaks
    fn skip_layout(&self, mut idx: usize) -> usize {
        while self
            .tokens
            .get(idx)
            .is_some_and(|t| t.is_trivia() || t.kind == TokenKind::Newline)
        {
            idx += 1;
        }
        idx
    }

    /// Previous significant token index; `None` at a line break unless `cross_lines`
    fn prev_index(&self, idx: usize, cross_lines: bool) -> Option<usize> {
        let mut i = idx;
        while i > 0 {
            i -= 1;
            let token = self.tokens[i];
            if token.is_trivia() {
                continue;
            }
            if token.kind == TokenKind::Newline {
                if cross_lines {
                    continue;
                }
                return None;
            }
            return Some(i);
        }
        None
    }

    fn next_is_ident(&self, idx: usize) -> bool {
        self.token(self.skip_trivia(idx + 1))
            .is_some_and(|t| t.kind == TokenKind::Ident)
    }

    fn at_statement_start(&self, idx: usize) -> bool {
        if !self.top().kind.holds_statements() {
            return false;
        }
        match self.prev_index(idx, false) {
            None => true,
            Some(p) => {
                let t = self.tokens[p];
                if t.kind == TokenKind::Ident && MODIFIERS.contains(&t.text) {
                    return self.at_statement_start(p);
                }
                t.is_punct(";") || t.is_punct("{") || t.is_punct("}") || t.is_punct("->")
            }
        }
    }

    /// Index after a `<...>` generic argument list starting at `lt`
    fn skip_generics(&self, lt: usize) -> Option<usize> {
        let mut depth: i32 = 0;
        let mut i = lt;
        while let Some(t) = self.token(i) {
            match t.text {
                "<" => depth += 1,
                ">" => depth -= 1,
                ">>" => depth -= 2,
                ">>>" => depth -= 3,
                ";" | "{" | "}" | "=" | "(" | ")" => return None,
                _ if t.kind == TokenKind::Newline => return None,
                _ => {}
            }
            i += 1;
            if depth <= 0 {
                return Some(i);
            }
        }
        None
    }

    // ---- statement termination ----

    fn newline(&mut self) {
        let idx = self.pos;
        if self.statement_ends_at(idx) {
            self.close_expression_frames();
            let closed_block = self.close_implicit_blocks();
            if !closed_block && self.needs_terminator(idx) {
                self.out.push(';');
                self.mark_expr_start();
            }
        }
        self.copy();
        if self.top().kind.holds_statements() {
            self.mark_expr_start();
        }
    }

    fn statement_ends_at(&self, idx: usize) -> bool {
        let Some(prev) = self.prev_index(idx, false) else {
            return false;
        };
        if !self.tokens[prev].ends_expression() {
            return false;
        }
        match self.token(self.skip_layout(idx)) {
            None => true,
            Some(next) => !continues_expression(next),
        }
    }

    fn needs_terminator(&self, idx: usize) -> bool {
        let top = self.top();
        if !top.kind.holds_statements() || !top.has_content {
            return false;
        }
        if let Some(prev) = self.prev_index(idx, false) {
            if self.block_closers.contains(&prev) {
                return false;
            }
        }
        match self.token(self.skip_layout(idx)) {
            Some(next) => !(next.is_punct("}") || next.is_punct(")") || next.is_punct("]")),
            None => true,
        }
    }

    fn semicolon(&mut self) {
        self.close_expression_frames();
        self.emit_advance(";");
        self.mark_expr_start();
        while self.top().kind == FrameKind::ImplicitBlock && self.top().has_content {
            self.out.push_str(" }");
            self.stack.pop();
        }
    }

    fn finish(&mut self) {
        let last = self.prev_index(self.tokens.len(), true);
        self.open_statement = last.is_some_and(|i| {
            self.tokens[i].ends_expression() && !self.block_closers.contains(&i)
        });
        while self.stack.len() > 1 {
            match self.top().kind {
                FrameKind::Ternary { .. } => self.out.push_str(" }"),
                FrameKind::CallTail => self.out.push(')'),
                FrameKind::ImplicitBlock => {
                    self.out.push_str(if self.open_statement { "; }" } else { " }" });
                    self.open_statement = false;
                }
                _ => {}
            }
            self.stack.pop();
        }
    }

    // ---- identifiers ----

    fn is_map_key(&self, idx: usize) -> bool {
        matches!(self.top().kind, FrameKind::MapLiteral { expect_key: true })
            && self
                .token(self.skip_layout(idx + 1))
                .is_some_and(|t| t.is_punct(":"))
    }

    fn map_key_consumed(&mut self) {
        if let FrameKind::MapLiteral { expect_key } = &mut self.top_mut().kind {
            *expect_key = false;
        }
    }

    fn ident(&mut self) {
        let idx = self.pos;
        let token = self.tokens[idx];

        if self.is_map_key(idx) {
            self.map_key_consumed();
            self.emit_advance(&strings::quote_key(token.text));
            return;
        }

        match token.text {
            "def" | "var" if self.next_is_ident(idx) => self.emit_advance("let"),
            word if MODIFIERS.contains(&word) && self.next_is_ident(idx) => {
                self.pos = self.skip_trivia(idx + 1)
            }
            "null" => self.emit_advance("()"),
            "new" if self.next_is_ident(idx) => self.constructor(idx),
            "println" | "print" => self.print_call(idx),
            "System" => match self.system_out_print(idx) {
                Some(print) => self.print_call(print),
                None => self.emit_advance("System"),
            },
            "return" => {
                self.has_return = true;
                self.emit_advance("return");
                self.mark_expr_start();
            }
            "catch" => self.catch_clause(idx),
            "for" => self.for_loop(idx),
            "else" => self.else_branch(idx),
            "finally" => {
                self.diagnostics.push(Diagnostic::warning(
                    Stage::Rewrite,
                    "`finally` is not supported; its block runs only when no error escapes",
                ));
                self.pos = self.skip_trivia(idx + 1);
            }
            "as" if self.is_cast(idx) => self.cast(idx),
            word if methods::PACKAGE_ROOTS.contains(&word) => {
                let class = self.class_segment(idx);
                if class == idx {
                    self.emit_advance(word);
                } else {
                    self.pos = class;
                }
            }
            word => {
                if self.at_statement_start(idx) {
                    if let Some(name) = self.typed_declaration(idx) {
                        self.emit("let ");
                        self.pos = name;
                        return;
                    }
                }
                self.emit_advance(word);
            }
        }
    }

    /// Index of the first capitalized segment of `pkg.sub.Class`, or `idx`
    fn class_segment(&self, idx: usize) -> usize {
        let mut i = idx;
        loop {
            let Some(token) = self.token(i) else {
                return idx;
            };
            if token.kind != TokenKind::Ident {
                return idx;
            }
            if token.text.chars().next().is_some_and(char::is_uppercase) {
                return i;
            }
            let dot = self.skip_trivia(i + 1);
            if !self.token(dot).is_some_and(|t| t.is_punct(".")) {
                return idx;
            }
            i = self.skip_trivia(dot + 1);
        }
    }

    /// Index of the variable name when `idx` starts `Type name =`
    fn typed_declaration(&self, idx: usize) -> Option<usize> {
        if !methods::is_type_name(self.tokens[idx].text) {
            return None;
        }
        let mut i = self.skip_trivia(idx + 1);
        if self.token(i)?.is_punct("<") {
            i = self.skip_trivia(self.skip_generics(i)?);
        }
        while self.token(i)?.is_punct("[") {
            let close = self.skip_trivia(i + 1);
            if !self.token(close)?.is_punct("]") {
                return None;
            }
            i = self.skip_trivia(close + 1);
        }
        let name = self.token(i)?;
        if name.kind != TokenKind::Ident || matches!(name.text, "in" | "as" | "instanceof") {
            return None;
        }
        match self.token(self.skip_trivia(i + 1)) {
            None => Some(i),
            Some(t) if t.kind == TokenKind::Newline || t.is_punct("=") || t.is_punct(";") => {
                Some(i)
            }
            _ => None,
        }
    }

    fn constructor(&mut self, idx: usize) {
        let class = self.class_segment(self.skip_trivia(idx + 1));
        let name = self.tokens[class].text;
        self.emit(name);
        let mut next = class + 1;
        let lt = self.skip_trivia(next);
        if self.token(lt).is_some_and(|t| t.is_punct("<")) {
            if let Some(end) = self.skip_generics(lt) {
                next = end;
            }
        }
        self.pos = next;
    }

    /// Index of `println`/`print` in `System.out.println`
    fn system_out_print(&self, idx: usize) -> Option<usize> {
        let dot = self.skip_trivia(idx + 1);
        self.token(dot).filter(|t| t.is_punct("."))?;
        let out = self.skip_trivia(dot + 1);
        self.token(out).filter(|t| t.is_ident("out"))?;
        let dot = self.skip_trivia(out + 1);
        self.token(dot).filter(|t| t.is_punct("."))?;
        let print = self.skip_trivia(dot + 1);
        self.token(print)
            .filter(|t| t.is_ident("println") || t.is_ident("print"))?;
        Some(print)
    }

    fn print_call(&mut self, idx: usize) {
        let next = self.skip_trivia(idx + 1);
        self.emit("Logger.log");
        match self.token(next) {
            Some(t) if t.is_punct("(") => self.pos = next,
            None => {
                self.out.push_str("()");
                self.pos = next;
            }
            Some(t)
                if t.kind == TokenKind::Newline
                    || t.is_punct(";")
                    || t.is_punct("}")
                    || t.is_punct(")") =>
            {
                self.out.push_str("()");
                self.pos = idx + 1;
            }
            Some(_) => {
                self.out.push('(');
                self.push_frame(FrameKind::CallTail);
                self.pos = next;
            }
        }
    }

    fn catch_clause(&mut self, idx: usize) {
        let open = self.skip_trivia(idx + 1);
        let close = self
            .token(open)
            .filter(|t| t.is_punct("("))
            .and_then(|_| self.partners[open]);
        let Some(close) = close else {
            self.emit_advance("catch");
            return;
        };
        let variable = (open + 1..close)
            .rev()
            .map(|i| self.tokens[i])
            .find(|t| t.kind == TokenKind::Ident);
        match variable {
            Some(var) => {
                self.emit("catch (");
                self.out.push_str(var.text);
                self.out.push(')');
                self.pos = close + 1;
            }
            None => self.emit_advance("catch"),
        }
    }

    fn else_branch(&mut self, idx: usize) {
        self.close_expression_frames();
        if self.top().kind == FrameKind::ImplicitBlock {
            self.trim_trailing_whitespace();
            self.out.push_str(" } ");
            self.stack.pop();
        }
        self.emit_advance("else");
        let next = self.token(self.skip_layout(idx + 1));
        if !next.is_some_and(|t| t.is_punct("{") || t.is_ident("if")) {
            self.out.push_str(" {");
            self.push_frame(FrameKind::ImplicitBlock);
        }
    }

    fn is_cast(&self, idx: usize) -> bool {
        self.prev_index(idx, false)
            .is_some_and(|p| self.tokens[p].ends_expression())
            && self.next_is_ident(idx)
    }

    fn cast(&mut self, idx: usize) {
        let type_idx = self.skip_trivia(idx + 1);
        self.trim_trailing_whitespace();
        if let Some(conversion) = methods::cast_conversion(self.tokens[type_idx].text) {
            self.emit(conversion);
        }
        let mut next = type_idx + 1;
        let lt = self.skip_trivia(next);
        if self.token(lt).is_some_and(|t| t.is_punct("<")) {
            if let Some(end) = self.skip_generics(lt) {
                next = end;
            }
        }
        self.pos = next;
    }

    // ---- loops ----

    fn for_loop(&mut self, idx: usize) {
        let open = self.skip_trivia(idx + 1);
        let close = self
            .token(open)
            .filter(|t| t.is_punct("("))
            .and_then(|_| self.partners[open]);
        let Some(close) = close else {
            self.emit_advance("for");
            return;
        };

        let separators = self.top_level_semicolons(open, close);
        let header = if separators.len() == 2 {
            self.counting_loop_header(open, close, separators[0], separators[1])
        } else {
            self.for_in_header(open, close)
        };

        match header {
            Some((text, resume)) => {
                self.emit(&text);
                self.push_frame(FrameKind::Paren { condition: true });
                self.pos = resume;
            }
            None => {
                if separators.len() == 2 {
                    self.diagnostics.push(Diagnostic::warning(
                        Stage::Rewrite,
                        "C-style for loop is only supported as `for (i = a; i < b; i++)`",
                    ));
                }
                self.emit_advance("for");
            }
        }
    }

    fn top_level_semicolons(&self, open: usize, close: usize) -> Vec<usize> {
        let mut depth = 0i32;
        let mut found = Vec::new();
        for i in open + 1..close {
            let t = self.tokens[i];
            match t.text {
                "(" | "[" | "?[" | "{" if t.kind == TokenKind::Punct => depth += 1,
                ")" | "]" | "}" if t.kind == TokenKind::Punct => depth -= 1,
                ";" if t.kind == TokenKind::Punct && depth == 0 => found.push(i),
                _ => {}
            }
        }
        found
    }

    /// `for (x in xs)` / `for (T x : xs)` -> `for x in (xs)`
    fn for_in_header(&self, open: usize, close: usize) -> Option<(String, usize)> {
        let mut variable = None;
        let mut i = self.skip_layout(open + 1);
        while i < close {
            let t = self.tokens[i];
            if t.is_ident("in") || t.is_punct(":") {
                let var = variable?;
                return Some((format!("for {} in (", var), self.skip_trivia(i + 1)));
            }
            if t.kind == TokenKind::Ident {
                variable = Some(t.text);
            } else if !t.is_trivia() {
                return None;
            }
            i += 1;
        }
        None
    }

    /// `for (int i = a; i < b; i++)` -> `for i in (a)..(b)`
    fn counting_loop_header(
        &self,
        open: usize,
        close: usize,
        first: usize,
        second: usize,
    ) -> Option<(String, usize)> {
        let init = self.significant(open + 1, first);
        let eq = init.iter().position(|&i| self.tokens[i].is_punct("="))?;
        let var = self.tokens[*init.get(eq.checked_sub(1)?)?];
        if var.kind != TokenKind::Ident || eq + 1 >= init.len() {
            return None;
        }
        let start = self.source_between(init[eq + 1], first);

        let cond = self.significant(first + 1, second);
        let (head, op) = (cond.first()?, cond.get(1)?);
        if self.tokens[*head].text != var.text || cond.len() < 3 {
            return None;
        }
        let range = match self.tokens[*op].text {
            "<" => "..",
            "<=" => "..=",
            _ => return None,
        };
        let bound = self.source_between(cond[2], second);

        let step: Vec<&str> = self
            .significant(second + 1, close)
            .into_iter()
            .map(|i| self.tokens[i].text)
            .collect();
        let increments = matches!(
            step.as_slice(),
            [v, "++"] | ["++", v] if *v == var.text
        ) || matches!(step.as_slice(), [v, "+=", "1"] if *v == var.text);
        if !increments {
            return None;
        }

        let header = format!(
            "for {} in ({}){}({}",
            var.text,
            rewrite_expression(start.trim()),
            range,
            rewrite_expression(bound.trim())
        );
        Some((header, close))
    }

    fn significant(&self, from: usize, to: usize) -> Vec<usize> {
        (from..to)
            .filter(|&i| !self.tokens[i].is_trivia() && self.tokens[i].kind != TokenKind::Newline)
            .collect()
    }

    fn source_between(&self, from: usize, to: usize) -> &'a str {
        let start = self.tokens[from].offset;
        let end = self.token(to).map_or(self.src.len(), |t| t.offset);
        &self.src[start..end]
    }

    // ---- punctuation ----

    fn punct(&mut self) {
        let idx = self.pos;
        let token = self.tokens[idx];
        match token.text {
            "?:" => self.word_operator(idx, "or_else"),
            "<=>" => self.word_operator(idx, "compare_to"),
            "." | "?." => self.member_access(),
            "(" => self.open_paren(),
            ")" => self.close_paren(),
            "[" | "?[" => self.open_bracket(),
            "]" => {
                self.close_ternaries();
                let text = match self.top().kind {
                    FrameKind::MapLiteral { .. } => "}",
                    _ => "]",
                };
                if matches!(
                    self.top().kind,
                    FrameKind::MapLiteral { .. } | FrameKind::Index
                ) {
                    self.stack.pop();
                }
                self.emit_advance(text);
            }
            "{" => self.open_brace(),
            "}" => self.close_brace(),
            ";" => self.semicolon(),
            "," => {
                self.close_ternaries();
                if let FrameKind::MapLiteral { expect_key } = &mut self.top_mut().kind {
                    *expect_key = true;
                }
                self.emit_advance(",");
                self.mark_expr_start();
            }
            ":" => match self.top().kind {
                FrameKind::Ternary { in_else: false } => {
                    self.trim_trailing_whitespace();
                    self.emit_advance(" } else {");
                    self.top_mut().kind = FrameKind::Ternary { in_else: true };
                    self.mark_expr_start();
                }
                FrameKind::MapLiteral { .. } => {
                    self.emit_advance(":");
                    self.mark_expr_start();
                }
                _ => self.emit_advance(":"),
            },
            "?" => self.ternary(),
            "=" | "+=" | "-=" | "*=" | "/=" | "%=" => {
                self.emit_advance(token.text);
                self.mark_expr_start();
            }
            "++" | "--" => self.increment(idx),
            ".." => {
                let next = self.token(idx + 1);
                if next.is_some_and(|t| t.is_punct("<")) {
                    self.emit(" .. ");
                    self.pos += 2;
                } else {
                    self.emit_advance("..=");
                }
            }
            "<<" if self.top().kind.holds_statements() => {
                self.trim_trailing_whitespace();
                self.emit(".leftShift(");
                self.push_frame(FrameKind::CallTail);
                self.pos = self.skip_trivia(idx + 1);
            }
            text => self.emit_advance(text),
        }
    }

    /// Emit an identifier operator with spaces on both sides
    fn word_operator(&mut self, idx: usize, name: &str) {
        if !self.out.ends_with([' ', '\t', '\n']) {
            self.out.push(' ');
        }
        self.emit(name);
        if !self.token(idx + 1).is_some_and(|t| t.is_trivia()) {
            self.out.push(' ');
        }
        self.pos += 1;
    }

    fn ternary(&mut self) {
        let start = self.top().expr_start.min(self.out.len());
        let leading = self.out[start..].len() - self.out[start..].trim_start().len();
        self.out.insert_str(start + leading, "if truthy(");
        self.trim_trailing_whitespace();
        self.emit(") {");
        self.push_frame(FrameKind::Ternary { in_else: false });
        self.pos += 1;
    }

    fn increment(&mut self, idx: usize) {
        let op = if self.tokens[idx].text == "++" { "+=" } else { "-=" };
        let postfix = self.prev_index(idx, false).is_some_and(|p| {
            let t = self.tokens[p];
            t.kind == TokenKind::Ident || t.is_punct("]") || t.is_punct(")")
        });
        if postfix {
            self.trim_trailing_whitespace();
            self.emit(&format!(" {} 1", op));
            self.pos += 1;
            return;
        }
        let target = self.skip_trivia(idx + 1);
        match self.token(target) {
            Some(t) if t.kind == TokenKind::Ident => {
                self.emit(&format!("{} {} 1", t.text, op));
                self.pos = target + 1;
            }
            _ => self.emit_advance(self.tokens[idx].text),
        }
    }

    fn open_paren(&mut self) {
        let idx = self.pos;
        let keyword = self.prev_index(idx, false).map(|p| self.tokens[p]);
        let condition = match keyword {
            Some(t) if t.is_ident("if") => true,
            Some(t) if t.is_ident("while") => !self.closes_do_block(idx),
            _ => false,
        };
        let is_while = keyword.is_some_and(|t| t.is_ident("while"));
        self.emit_advance(if condition || is_while { "truthy(" } else { "(" });
        self.push_frame(FrameKind::Paren { condition });
    }

    /// Whether the `while` before `paren` ends a `do { ... }` block
    fn closes_do_block(&self, paren: usize) -> bool {
        let Some(keyword) = self.prev_index(paren, false) else {
            return false;
        };
        let Some(brace) = self.prev_index(keyword, true) else {
            return false;
        };
        if !self.tokens[brace].is_punct("}") {
            return false;
        }
        self.partners[brace]
            .and_then(|open| self.prev_index(open, true))
            .is_some_and(|p| self.tokens[p].is_ident("do"))
    }

    fn close_paren(&mut self) {
        self.close_ternaries();
        let idx = self.pos;
        let frame = match self.top().kind {
            FrameKind::Paren { .. } => self.pop_frame(),
            _ => None,
        };

        if let Some(slot) = self.trailing_parens.iter().position(|&c| c == idx) {
            self.trailing_parens.swap_remove(slot);
            if frame.is_some_and(|f| f.has_content) {
                self.out.push_str(", ");
            }
            let brace = self.skip_layout(idx + 1);
            self.open_closure(brace, true);
            return;
        }

        self.emit_advance(")");
        if let Some(Frame {
            kind: FrameKind::Paren { condition: true },
            ..
        }) = frame
        {
            let next = self.token(self.skip_layout(self.pos));
            if !next.is_some_and(|t| t.is_punct("{") || t.is_punct(";")) {
                self.out.push_str(" {");
                self.push_frame(FrameKind::ImplicitBlock);
            }
        }
    }

    fn open_bracket(&mut self) {
        let idx = self.pos;
        if self.tokens[idx].text == "?[" {
            self.emit_advance("?[");
            self.push_frame(FrameKind::Index);
            return;
        }

        let first = self.skip_layout(idx + 1);
        let after_first = self.skip_layout(first + 1);
        let first_token = self.token(first);
        let second_token = self.token(after_first);

        if first_token.is_some_and(|t| t.is_punct(":"))
            && second_token.is_some_and(|t| t.is_punct("]"))
        {
            self.emit("#{}");
            self.pos = after_first + 1;
            return;
        }

        let key_like = first_token.is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Ident | TokenKind::Str(_) | TokenKind::Number
            )
        });
        if key_like && second_token.is_some_and(|t| t.is_punct(":")) {
            self.emit_advance("#{");
            self.push_frame(FrameKind::MapLiteral { expect_key: true });
        } else {
            self.emit_advance("[");
            self.push_frame(FrameKind::Index);
        }
    }

    fn open_brace(&mut self) {
        let idx = self.pos;
        let literal = self.prev_index(idx, true).is_some_and(|p| {
            let t = self.tokens[p];
            t.is_ident("return")
                || (t.kind == TokenKind::Punct
                    && matches!(t.text, "=" | "(" | "," | ":" | "?:" | "[" | "<<"))
        });
        if literal {
            self.open_closure(idx, false);
        } else {
            if let Some(close) = self.partners[idx] {
                self.block_closers.insert(close);
            }
            self.emit_advance("{");
            self.push_frame(FrameKind::Block);
        }
    }

    fn close_brace(&mut self) {
        self.close_expression_frames();
        while self.top().kind == FrameKind::ImplicitBlock {
            self.out.push_str(" }");
            self.stack.pop();
        }
        let text = match self.pop_frame().map(|f| f.kind) {
            Some(FrameKind::Closure { call: true }) => "})",
            _ => "}",
        };
        self.emit_advance(text);
    }

    // ---- closures and member access ----

    /// Parameters of the closure opening at `brace` and the index its body starts at
    fn closure_params(&self, brace: usize) -> (Vec<&'a str>, usize) {
        let mut params = Vec::new();
        let mut i = self.skip_layout(brace + 1);
        while let Some(token) = self.token(i) {
            if token.is_punct("->") {
                return (params, i + 1);
            }
            if token.kind != TokenKind::Ident {
                break;
            }
            let next = self.skip_trivia(i + 1);
            match self.token(next) {
                // `Type name`: the type is dropped
                Some(t) if t.kind == TokenKind::Ident => i = next,
                Some(t) if t.is_punct(",") => {
                    params.push(token.text);
                    i = self.skip_layout(next + 1);
                }
                Some(t) if t.is_punct("->") => {
                    params.push(token.text);
                    i = next;
                }
                _ => break,
            }
        }
        (vec!["it"], brace + 1)
    }

    fn open_closure(&mut self, brace: usize, call: bool) {
        let (params, body) = self.closure_params(brace);
        self.emit("|");
        self.out.push_str(&params.join(", "));
        self.out.push_str("| {");
        self.push_frame(FrameKind::Closure { call });
        self.pos = body;
    }

    /// Locate a closure argument following a method name
    fn closure_argument(&self, after_name: usize) -> Option<ClosureArg> {
        let token = self.token(after_name)?;
        if token.is_punct("{") {
            return Some(ClosureArg::Bare { brace: after_name });
        }
        if !token.is_punct("(") {
            return None;
        }
        let close = self.partners[after_name]?;
        let brace = self.skip_trivia(close + 1);
        if self.token(brace).is_some_and(|t| t.is_punct("{")) {
            return Some(ClosureArg::Trailing {
                paren: after_name,
                close,
                brace,
            });
        }
        let inner = self.skip_layout(after_name + 1);
        let inner_close = self
            .token(inner)
            .filter(|t| t.is_punct("{"))
            .and_then(|_| self.partners[inner])?;
        (self.skip_layout(inner_close + 1) == close).then_some(ClosureArg::Inside {
            paren: after_name,
            brace: inner,
        })
    }

    fn member_access(&mut self) {
        let idx = self.pos;
        let dot = self.tokens[idx].text;
        let name_idx = self.skip_trivia(idx + 1);
        let Some(name) = self.token(name_idx).filter(|t| t.kind == TokenKind::Ident) else {
            self.emit_advance(dot);
            return;
        };

        if name.text == "class" {
            self.pos = name_idx + 1;
            return;
        }
        if name.text == "setBody" {
            self.sets_body = true;
        }

        let after = self.skip_trivia(name_idx + 1);
        let Some(arg) = self.closure_argument(after) else {
            self.emit(dot);
            self.out.push_str(name.text);
            self.pos = name_idx + 1;
            return;
        };

        let arity = self.closure_params(arg.brace()).0.len();
        let mapped = methods::closure_method(name.text, arity).unwrap_or(name.text);
        self.emit(dot);
        self.out.push_str(mapped);
        match arg {
            ClosureArg::Bare { brace } => {
                self.out.push('(');
                self.open_closure(brace, true);
            }
            ClosureArg::Trailing { paren, close, .. } => {
                self.trailing_parens.push(close);
                self.pos = paren;
            }
            ClosureArg::Inside { paren, .. } => self.pos = paren,
        }
    }
}

/// Whether a line starting with `next` continues the previous line's expression
fn continues_expression(next: Token<'_>) -> bool {
    match next.kind {
        TokenKind::Ident => matches!(
            next.text,
            "else" | "catch" | "finally" | "in" | "as" | "instanceof"
        ),
        TokenKind::Punct => matches!(
            next.text,
            "." | "?."
                | "?:"
                | "?"
                | ":"
                | "+"
                | "*"
                | "/"
                | "%"
                | "&&"
                | "||"
                | "=="
                | "!="
                | "<"
                | ">"
                | "<="
                | ">="
                | "="
                | "+="
                | "-="
                | "*="
                | "/="
                | "&"
                | "|"
                | "^"
                | "**"
                | ".."
                | "->"
                | ","
                | "{"
                | "<<"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str) -> String {
        let mut rewriter = Rewriter::new(src, FrameKind::Root);
        rewriter.run();
        rewriter.out
    }

    #[test]
    fn test_declarations_and_null() {
        assert_eq!(body("def x = null\nvar y = 2"), "let x = ();\nlet y = 2");
        assert_eq!(body("String s = 'a'\nint n = 1"), "let s = \"a\";\nlet n = 1");
        assert_eq!(body("final Map<String, Object> m = [:]"), "let m = #{}");
    }

    #[test]
    fn test_map_literal_keys_are_quoted() {
        assert_eq!(
            body("def r = [nombre: 'x', \"edad\": 3, 1: true]"),
            "let r = #{\"nombre\": \"x\", \"edad\": 3, \"1\": true}"
        );
    }

    #[test]
    fn test_list_literal_and_index_are_untouched() {
        assert_eq!(body("def xs = [1, 2, 3]\nxs[0]"), "let xs = [1, 2, 3];\nxs[0]");
    }

    #[test]
    fn test_closure_methods() {
        assert_eq!(
            body("items.findAll { it % 2 == 0 }"),
            "items.filter(|it| { it % 2 == 0 })"
        );
        assert_eq!(
            body("m.each { k, v -> println k }"),
            "m.for_each_pair(|k, v| { Logger.log(k) })"
        );
        assert_eq!(
            body("xs.inject(0) { acc, x -> acc + x }"),
            "xs.inject(0, |acc, x| { acc + x })"
        );
        assert_eq!(
            body("xs.collect({ String s -> s.toUpperCase() })"),
            "xs.map(|s| { s.toUpperCase() })"
        );
    }

    #[test]
    fn test_closure_literal() {
        assert_eq!(body("def f = { x -> x * 2 }"), "let f = |x| { x * 2 }");
        assert_eq!(body("def g = { -> 1 }"), "let g = || { 1 }");
    }

    #[test]
    fn test_elvis_and_safe_navigation() {
        assert_eq!(body("def n = a?.b ?: 'none'"), "let n = a?.b or_else \"none\"");
    }

    #[test]
    fn test_spaceship_and_modifiers() {
        assert_eq!(
            body("xs.sort { a, b -> a.n<=>b.n }"),
            "xs.sort_with(|a, b| { a.n compare_to b.n })"
        );
        assert_eq!(body("static int n = 1"), "let n = 1");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            body("def x = a > 1 ? 'big' : 'small'"),
            "let x = if truthy(a > 1) { \"big\" } else { \"small\" }"
        );
    }

    #[test]
    fn test_println_without_parens() {
        assert_eq!(
            body("println \"total: ${n}\"\nprintln()"),
            "Logger.log(`total: ${n}`);\nLogger.log()"
        );
        assert_eq!(body("System.out.println('x')"), "Logger.log(\"x\")");
    }

    #[test]
    fn test_braceless_if_else() {
        assert_eq!(
            body("if (a) x = 1\nelse x = 2\n"),
            "if truthy(a) { x = 1\n } else { x = 2; }\n"
        );
    }

    #[test]
    fn test_braced_if_has_no_stray_semicolon() {
        assert_eq!(
            body("if (a) {\n  x = 1\n}\ny = 2"),
            "if truthy(a) {\n  x = 1\n}\ny = 2"
        );
    }

    #[test]
    fn test_try_catch() {
        assert_eq!(
            body("try {\n  f()\n} catch (Exception e) {\n  g(e)\n}"),
            "try {\n  f()\n} catch (e) {\n  g(e)\n}"
        );
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(body("for (x in xs) { s += x }"), "for x in (xs) { s += x }");
        assert_eq!(body("for (String x : xs) { }"), "for x in (xs) { }");
        assert_eq!(
            body("for (int i = 0; i < n.size(); i++) { }"),
            "for i in (0)..(n.size()) { }"
        );
    }

    #[test]
    fn test_constructor_and_qualified_names() {
        assert_eq!(
            body("def s = new groovy.json.JsonSlurper()"),
            "let s = JsonSlurper()"
        );
        assert_eq!(body("def m = new HashMap<String, Object>()"), "let m = HashMap()");
        assert_eq!(body("x.getBody(java.lang.String)"), "x.getBody(String)");
        assert_eq!(body("x.getBody(String.class)"), "x.getBody(String)");
    }

    #[test]
    fn test_casts_and_increments() {
        assert_eq!(body("def n = s as Integer"), "let n = s.toInteger()");
        assert_eq!(body("i++"), "i += 1");
        assert_eq!(body("++i"), "i += 1");
    }

    #[test]
    fn test_left_shift_statement() {
        assert_eq!(body("out << [a: 1]\n"), "out.leftShift(#{\"a\": 1});\n");
    }

    #[test]
    fn test_multiline_expression_continues() {
        assert_eq!(
            body("def total = a +\n  b\n  .size()"),
            "let total = a +\n  b\n  .size()"
        );
    }

    #[test]
    fn test_multiline_map_literal() {
        assert_eq!(
            body("def r = [\n  a: 1,\n  b: 2\n]\nreturn r"),
            "let r = #{\n  \"a\": 1,\n  \"b\": 2\n};\nreturn r"
        );
    }

    #[test]
    fn test_appends_terminal_when_no_return() {
        let program = rewrite("def x = 1", "message");
        assert!(program.appended_terminal);
        assert!(program.source.ends_with("\n;\nreturn message;\n"));
        assert_eq!(program.diagnostics.len(), 1);
    }

    #[test]
    fn test_no_terminal_after_return_or_set_body() {
        assert!(!rewrite("return 1", "message").appended_terminal);
        assert!(!rewrite("msg.setBody('x')", "msg").appended_terminal);
    }

    #[test]
    fn test_strings_are_not_rewritten() {
        assert_eq!(body("def s = 'def x = null'"), "let s = \"def x = null\"");
    }

    #[test]
    fn test_unterminated_string_is_left_for_the_compiler() {
        let program = rewrite("def s = 'abc\nreturn s", "message");
        assert!(program.source.contains("'abc"));
        assert!(program
            .diagnostics
            .iter()
            .any(|d| d.message == "unterminated string literal"));
    }

    #[test]
    fn test_finally_is_reported() {
        let program = rewrite("try { f() } finally { g() }\nreturn 1", "message");
        assert!(program
            .diagnostics
            .iter()
            .any(|d| d.kind == groovy_sandbox_core::DiagnosticKind::Warning));
    }
}
