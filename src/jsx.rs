//! Rewrites JSX syntax into classic-runtime calls such as
//! `React.createElement("div", {id: "x"}, "text")`.
//!
//! Only JSX is touched. Everything else, including strings, template
//! literals and comments, is copied through verbatim. Newlines swallowed by
//! an element are re-emitted before the call's closing parenthesis so that
//! line numbers after the element still match the original file.

use crate::transpile::{Transpile, TranspileError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxTranspiler {
    factory: String,
    fragment: String,
}

impl JsxTranspiler {
    pub fn new(factory: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for JsxTranspiler {
    fn default() -> Self {
        Self::new("React.createElement", "React.Fragment")
    }
}

impl Transpile for JsxTranspiler {
    fn transform(&self, source: &str) -> Result<String, TranspileError> {
        let mut rewriter = Rewriter {
            chars: source.chars().collect(),
            pos: 0,
            factory: &self.factory,
            fragment: &self.fragment,
        };
        rewriter.code(Stop::Eof)
    }
}

/// Keywords after which `<` or `/` opens an expression rather than an operator.
pub(crate) const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "yield", "await", "default", "case", "typeof", "void", "else", "do", "in", "of",
    "throw",
];

/// Punctuation after which `<` or `/` opens an expression rather than an operator.
pub(crate) const EXPRESSION_PUNCTUATION: &str = "([{,;=:?!&|>+-*%~^";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eof,
    Brace,
}

struct Rewriter<'a> {
    chars: Vec<char>,
    pos: usize,
    factory: &'a str,
    fragment: &'a str,
}

impl Rewriter<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: &str) -> bool {
        let matches = expected
            .chars()
            .enumerate()
            .all(|(offset, c)| self.peek_at(offset) == Some(c));
        if matches {
            self.pos += expected.chars().count();
        }
        matches
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn line(&self) -> u32 {
        let end = self.pos.min(self.chars.len());
        1 + self.chars[..end].iter().filter(|c| **c == '\n').count() as u32
    }

    fn error(&self, message: impl Into<String>) -> TranspileError {
        TranspileError::new(message).with_line(self.line())
    }

    /// Copies plain code up to the end of input or, with `Stop::Brace`, up to
    /// the `}` closing the current expression container. That brace is
    /// consumed but not emitted.
    fn code(&mut self, stop: Stop) -> Result<String, TranspileError> {
        let mut out = String::new();
        let mut depth = 0usize;
        let mut jsx_allowed = true;
        let mut word = String::new();

        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                word.push(c);
                out.push(c);
                self.pos += 1;
                continue;
            }
            if !word.is_empty() {
                jsx_allowed = EXPRESSION_KEYWORDS.contains(&word.as_str());
                word.clear();
            }
            match c {
                '"' | '\'' => {
                    self.string(c, &mut out)?;
                    jsx_allowed = false;
                }
                '`' => {
                    self.template(&mut out)?;
                    jsx_allowed = false;
                }
                '/' if self.peek_at(1) == Some('/') => self.line_comment(&mut out),
                '/' if self.peek_at(1) == Some('*') => self.block_comment(&mut out)?,
                '/' if jsx_allowed => {
                    self.regex(&mut out)?;
                    jsx_allowed = false;
                }
                '<' if jsx_allowed && self.at_element_start() => {
                    let element = self.element()?;
                    out.push_str(&element);
                    jsx_allowed = false;
                }
                '{' => {
                    depth += 1;
                    out.push(c);
                    self.pos += 1;
                    jsx_allowed = true;
                }
                '}' => {
                    self.pos += 1;
                    if depth == 0 && stop == Stop::Brace {
                        return Ok(out);
                    }
                    depth = depth.saturating_sub(1);
                    out.push(c);
                    jsx_allowed = true;
                }
                c if c.is_whitespace() => {
                    out.push(c);
                    self.pos += 1;
                }
                _ => {
                    out.push(c);
                    self.pos += 1;
                    jsx_allowed = EXPRESSION_PUNCTUATION.contains(c);
                }
            }
        }

        if stop == Stop::Brace {
            return Err(self.error("unterminated `{` expression in JSX"));
        }
        Ok(out)
    }

    fn string(&mut self, quote: char, out: &mut String) -> Result<(), TranspileError> {
        out.push(quote);
        self.pos += 1;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => {
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some(c) if c == quote => {
                    out.push(c);
                    return Ok(());
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn template(&mut self, out: &mut String) -> Result<(), TranspileError> {
        out.push('`');
        self.pos += 1;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated template literal")),
                Some('\\') => {
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some('`') => {
                    out.push('`');
                    return Ok(());
                }
                Some('$') if self.peek() == Some('{') => {
                    self.pos += 1;
                    out.push_str("${");
                    let inner = self.code(Stop::Brace)?;
                    out.push_str(&inner);
                    out.push('}');
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Copies a regular expression literal, flags excluded, verbatim.
    fn regex(&mut self, out: &mut String) -> Result<(), TranspileError> {
        out.push('/');
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated regular expression")),
                Some('\\') => {
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some(c) => {
                    out.push(c);
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }

    fn line_comment(&mut self, out: &mut String) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
    }

    fn block_comment(&mut self, out: &mut String) -> Result<(), TranspileError> {
        out.push_str("/*");
        self.pos += 2;
        loop {
            if self.eat("*/") {
                out.push_str("*/");
                return Ok(());
            }
            match self.bump() {
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated block comment")),
            }
        }
    }

    fn at_element_start(&self) -> bool {
        match self.peek_at(1) {
            Some('>') => true,
            Some(c) => is_ident_start(c),
            None => false,
        }
    }

    /// Parses one element or fragment starting at `<`.
    fn element(&mut self) -> Result<String, TranspileError> {
        let start = self.pos;
        self.pos += 1;
        self.skip_ws();

        if self.peek() == Some('>') {
            self.pos += 1;
            let children = self.children(None)?;
            let fragment = self.fragment.to_string();
            return Ok(self.finish_call(start, &fragment, "null", children));
        }

        let name = self.tag_name()?;
        let (props, self_closing) = self.attributes()?;
        let children = if self_closing {
            Vec::new()
        } else {
            self.children(Some(&name))?
        };
        Ok(self.finish_call(start, &element_type(&name), &props, children))
    }

    fn tag_name(&mut self) -> Result<String, TranspileError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) || matches!(c, '.' | '-' | ':') {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("expected a JSX tag name"));
        }
        Ok(name)
    }

    /// Returns the props expression and whether the tag closed itself.
    fn attributes(&mut self) -> Result<(String, bool), TranspileError> {
        let mut parts = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.error("unterminated JSX opening tag")),
                Some('/') => {
                    self.pos += 1;
                    self.skip_ws();
                    if self.bump() != Some('>') {
                        return Err(self.error("expected `>` after `/` in JSX tag"));
                    }
                    return Ok((props_object(&parts), true));
                }
                Some('>') => {
                    self.pos += 1;
                    return Ok((props_object(&parts), false));
                }
                Some('{') => {
                    self.pos += 1;
                    self.skip_ws();
                    if !self.eat("...") {
                        return Err(self.error("expected `...` in JSX spread attribute"));
                    }
                    let expr = self.code(Stop::Brace)?;
                    parts.push(format!("...{}", expr.trim()));
                }
                Some(c) if is_ident_start(c) => {
                    let name = self.attribute_name();
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.pos += 1;
                        self.skip_ws();
                        self.attribute_value()?
                    } else {
                        "true".to_string()
                    };
                    parts.push(format!("{}: {value}", property_key(&name)));
                }
                Some(c) => return Err(self.error(format!("unexpected `{c}` in JSX tag"))),
            }
        }
    }

    fn attribute_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) || matches!(c, '-' | ':') {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn attribute_value(&mut self) -> Result<String, TranspileError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut raw = String::new();
                loop {
                    match self.bump() {
                        None => return Err(self.error("unterminated JSX attribute string")),
                        Some(c) if c == quote => return Ok(quote_js(&raw)),
                        Some(c) => raw.push(c),
                    }
                }
            }
            Some('{') => {
                self.pos += 1;
                let expr = self.code(Stop::Brace)?;
                if is_blank_expression(&expr) {
                    return Err(self.error("JSX attribute expression must not be empty"));
                }
                Ok(expr.trim().to_string())
            }
            Some('<') => self.element(),
            _ => Err(self.error("expected a JSX attribute value")),
        }
    }

    fn children(&mut self, closing: Option<&str>) -> Result<Vec<String>, TranspileError> {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None => {
                    let message = match closing {
                        Some(name) => format!("unterminated JSX element `<{name}>`"),
                        None => "unterminated JSX fragment".to_string(),
                    };
                    return Err(self.error(message));
                }
                Some('<') if self.at_closing_tag() => {
                    self.close_tag(closing.unwrap_or(""))?;
                    return Ok(children);
                }
                Some('<') => children.push(self.element()?),
                Some('{') => {
                    self.pos += 1;
                    let expr = self.code(Stop::Brace)?;
                    if !is_blank_expression(&expr) {
                        children.push(expr.trim().to_string());
                    }
                }
                Some(_) => {
                    let mut raw = String::new();
                    while let Some(c) = self.peek() {
                        if c == '<' || c == '{' {
                            break;
                        }
                        raw.push(c);
                        self.pos += 1;
                    }
                    if let Some(text) = jsx_text(&raw) {
                        children.push(text);
                    }
                }
            }
        }
    }

    fn at_closing_tag(&self) -> bool {
        let mut offset = 1;
        while self.peek_at(offset).is_some_and(char::is_whitespace) {
            offset += 1;
        }
        self.peek_at(offset) == Some('/')
    }

    fn close_tag(&mut self, expected: &str) -> Result<(), TranspileError> {
        self.pos += 1;
        self.skip_ws();
        self.pos += 1;
        self.skip_ws();
        let name = if self.peek() == Some('>') {
            String::new()
        } else {
            self.tag_name()?
        };
        self.skip_ws();
        if self.bump() != Some('>') {
            return Err(self.error("expected `>` in JSX closing tag"));
        }
        if name != expected {
            return Err(self.error(format!(
                "expected closing tag `</{expected}>`, found `</{name}>`"
            )));
        }
        Ok(())
    }

    fn finish_call(&self, start: usize, element: &str, props: &str, children: Vec<String>) -> String {
        let mut call = format!("{}({element}, {props}", self.factory);
        for child in children {
            call.push_str(", ");
            call.push_str(&child);
        }
        let consumed = self.chars[start..self.pos].iter().filter(|c| **c == '\n').count();
        let emitted = call.matches('\n').count();
        for _ in emitted..consumed {
            call.push('\n');
        }
        call.push(')');
        call
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Lower-case intrinsic tags become strings; components stay expressions.
fn element_type(name: &str) -> String {
    let intrinsic = name.chars().next().is_some_and(char::is_lowercase) && !name.contains('.');
    if intrinsic {
        quote_js(name)
    } else {
        name.to_string()
    }
}

fn property_key(name: &str) -> String {
    if name.chars().all(is_ident_char) {
        name.to_string()
    } else {
        quote_js(name)
    }
}

fn props_object(parts: &[String]) -> String {
    if parts.is_empty() {
        "null".to_string()
    } else {
        format!("{{{}}}", parts.join(", "))
    }
}

/// JSX text: trim every line break away, drop blank lines, join with spaces.
fn jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.lines().collect();
    let last = lines.len().saturating_sub(1);
    let pieces: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let line = if idx > 0 { line.trim_start() } else { line };
            if idx < last || raw.ends_with('\n') {
                line.trim_end()
            } else {
                line
            }
        })
        .filter(|line| !line.is_empty())
        .collect();
    if pieces.is_empty() {
        None
    } else {
        Some(quote_js(&pieces.join(" ")))
    }
}

/// True when an expression container holds nothing but comments.
fn is_blank_expression(expr: &str) -> bool {
    let mut rest = expr.trim();
    loop {
        if let Some(after) = rest.strip_prefix("/*") {
            match after.find("*/") {
                Some(end) => rest = after[end + 2..].trim_start(),
                None => return false,
            }
        } else if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |end| after[end..].trim_start());
        } else {
            return rest.is_empty();
        }
    }
}

fn quote_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
