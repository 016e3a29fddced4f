use std::str::Chars;

use lpstep_solver::Relation;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// True when `other` starts exactly where `self` ends.
    pub fn touches(self, other: Span) -> bool {
        self.end == other.start
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Min,
    Max,
    NonNegative,
    Unrestricted,

    // Literals
    Ident,
    Number,

    // Operators
    Plus,
    Minus,
    Slash,
    Comma,

    // Relations
    Lt,
    Le,
    Eq,
    Ge,
    Gt,

    // Special
    Newline,
    Eof,
    Error,
}

impl TokenKind {
    pub fn relation(self) -> Option<Relation> {
        match self {
            TokenKind::Lt => Some(Relation::Lt),
            TokenKind::Le => Some(Relation::Le),
            TokenKind::Eq => Some(Relation::Eq),
            TokenKind::Ge => Some(Relation::Ge),
            TokenKind::Gt => Some(Relation::Gt),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current;
        self.current = self.chars.next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Unsigned integer or decimal: `12`, `1.5`, `.5`. A sign is always a
    /// separate token.
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        self.skip_digits();

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // consume the dot
            self.skip_digits();
        }

        Token::new(
            TokenKind::Number,
            Span::new(start, self.pos),
            &self.source[start..self.pos],
        )
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.advance();
        }

        let text = &self.source[start..self.pos];
        let kind = match text {
            "min" => TokenKind::Min,
            "max" => TokenKind::Max,
            "unrestricted" => TokenKind::Unrestricted,
            "non" if self.at_keyword_suffix("-negative") => {
                for _ in 0.."-negative".len() {
                    self.advance();
                }
                TokenKind::NonNegative
            }
            _ => TokenKind::Ident,
        };
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    /// Whether the remaining input begins with `suffix` followed by a word boundary.
    fn at_keyword_suffix(&self, suffix: &str) -> bool {
        let rest = &self.source[self.pos..];
        rest.strip_prefix(suffix)
            .is_some_and(|after| !after.starts_with(|c: char| c.is_ascii_alphanumeric()))
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    /// `<` / `>` optionally followed by `=`.
    fn relation(&mut self, bare: TokenKind, with_eq: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        let kind = if self.peek() == Some('=') {
            self.advance();
            with_eq
        } else {
            bare
        };
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), "");
        };

        match c {
            '\n' => self.single(TokenKind::Newline),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '/' => self.single(TokenKind::Slash),
            ',' => self.single(TokenKind::Comma),
            '=' => self.single(TokenKind::Eq),
            '<' => self.relation(TokenKind::Lt, TokenKind::Le),
            '>' => self.relation(TokenKind::Gt, TokenKind::Ge),
            '.' if self.peek_next().is_some_and(|n| n.is_ascii_digit()) => self.read_number(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() => self.read_ident(),
            _ => self.single(TokenKind::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("min max non-negative unrestricted"),
            vec![
                TokenKind::Min,
                TokenKind::Max,
                TokenKind::NonNegative,
                TokenKind::Unrestricted,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_non_without_suffix_is_ident() {
        assert_eq!(
            kinds("non-negatives"),
            vec![TokenKind::Ident, TokenKind::Minus, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::tokenize("100 8.5 .25 3/4");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["100", "8.5", ".25", "3", "/", "4", ""]);
    }

    #[test]
    fn test_sign_is_separate() {
        let tokens = Lexer::tokenize("-2x1");
        assert_eq!(tokens[0].kind, TokenKind::Minus);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert!(tokens[0].span.touches(tokens[1].span));
        assert!(tokens[1].span.touches(tokens[2].span));
    }

    #[test]
    fn test_relations() {
        assert_eq!(
            kinds("< <= = >= >"),
            vec![
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Eq,
                TokenKind::Ge,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
        assert_eq!(TokenKind::Ge.relation(), Some(Relation::Ge));
        assert_eq!(TokenKind::Plus.relation(), None);
    }

    #[test]
    fn test_program_snippet() {
        let source = "max z = x1 + 2x2\nx1 + x2 <= 3\nx1, x2 non-negative";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Max,
                TokenKind::Ident, // z
                TokenKind::Eq,
                TokenKind::Ident, // x1
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Ident, // x2
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Plus,
                TokenKind::Ident,
                TokenKind::Le,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::NonNegative,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let tokens = Lexer::tokenize("2 * x1");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].text, "*");
    }
}
