//! WASM bindings for the browser editor.
//!
//! Every function takes program text and returns plain JS values built from
//! the serde forms of the solver types. Failures surface as JS `Error`s.

use wasm_bindgen::prelude::*;

use crate::lexer::{Lexer, TokenKind};
use crate::parser::{ParseError, Parser};
use crate::solve::steps_to;
use lpstep_solver::format::format_program;
use lpstep_solver::{Converter, StateKind};

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Parse source code and return the program as JSON
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsValue> {
    let program = Parser::parse(source).map_err(js_error)?;
    to_js(&program)
}

/// Tokenize source code and return tokens as JSON
#[wasm_bindgen]
pub fn tokenize(source: &str) -> Result<JsValue, JsValue> {
    let tokens: Vec<TokenInfo> = Lexer::tokenize(source)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| TokenInfo {
            kind: token_class(t.kind),
            text: t.text,
            start: t.span.start,
            end: t.span.end,
        })
        .collect();
    to_js(&tokens)
}

#[derive(serde::Serialize)]
struct TokenInfo {
    kind: &'static str,
    text: String,
    start: usize,
    end: usize,
}

fn token_class(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Min | TokenKind::Max | TokenKind::NonNegative | TokenKind::Unrestricted => {
            "keyword"
        }
        TokenKind::Ident => "variable",
        TokenKind::Number => "number",
        TokenKind::Plus | TokenKind::Minus | TokenKind::Slash => "operator",
        TokenKind::Lt | TokenKind::Le | TokenKind::Eq | TokenKind::Ge | TokenKind::Gt => "relation",
        TokenKind::Comma => "delimiter",
        TokenKind::Newline => "whitespace",
        TokenKind::Error | TokenKind::Eof => "error",
    }
}

/// Validate source code and return diagnostics as JSON
#[wasm_bindgen]
pub fn check(source: &str) -> JsValue {
    let diagnostics = diagnostics(source);
    serde_wasm_bindgen::to_value(&diagnostics).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct Diagnostic {
    /// 1-based line, absent for whole-program errors
    line: Option<usize>,
    start: usize,
    end: usize,
    severity: &'static str,
    message: String,
}

fn diagnostics(source: &str) -> Vec<Diagnostic> {
    let Err(e) = Parser::parse(source) else {
        return Vec::new();
    };

    let line = match &e {
        ParseError::AtLine { line, .. } => Some(*line),
        _ => None,
    };
    let (start, end) = line
        .and_then(|n| line_range(source, n))
        .unwrap_or((0, source.len()));

    vec![Diagnostic {
        line,
        start,
        end,
        severity: "error",
        message: e.root().to_string(),
    }]
}

/// Byte range of the 1-based line `number`, without its line break.
fn line_range(source: &str, number: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for (i, line) in source.split('\n').enumerate() {
        if i + 1 == number {
            return Some((start, start + line.trim_end_matches('\r').len()));
        }
        start += line.len() + 1;
    }
    None
}

/// Drive the program to `target` (a state kind name such as `"solution"`)
/// and return every step as JSON
#[wasm_bindgen]
pub fn steps(source: &str, target: &str) -> Result<JsValue, JsValue> {
    let target = StateKind::ALL
        .into_iter()
        .find(|k| k.name() == target)
        .ok_or_else(|| js_error(format!("Unknown state kind: {}", target)))?;
    let steps = steps_to(&Converter::new(), source, target).map_err(js_error)?;
    to_js(&steps)
}

/// Reformat source code
#[wasm_bindgen]
pub fn format(source: &str) -> Result<String, JsValue> {
    let program = Parser::parse(source).map_err(js_error)?;
    Ok(format_program(&program))
}
