use lpstep_solver::{
    Coefficient, Constraint, MinMax, Objective, Polynomial, Program, Restriction,
    VariableRestrictions,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed term near '{0}'")]
    MalformedTerm(String),
    #[error("Variable '{0}' appears more than once in one expression")]
    DuplicateVariable(String),
    #[error("Not a constraint or a variable declaration: {0}")]
    InvalidLine(String),
    #[error("Variable '{0}' is used but never declared")]
    UndeclaredVariable(String),
    #[error("Variable '{0}' is declared but never used")]
    UnusedDeclaration(String),
    #[error("Variable '{0}' is declared more than once")]
    DuplicateDeclaration(String),
    #[error("Objective variable '{0}' cannot appear in expressions or declarations")]
    ResultVariableReused(String),
    #[error("Unexpected token: expected {expected}, found '{found}' at column {}", .span.start + 1)]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Program is empty")]
    EmptyProgram,
    #[error("Line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<ParseError>,
    },
}

impl ParseError {
    pub fn at_line(self, line: usize) -> Self {
        ParseError::AtLine {
            line,
            source: Box::new(self),
        }
    }

    /// True when the input does not have the shape of the rule at all, as
    /// opposed to having the right shape with a bad value in it.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self.root(),
            ParseError::MalformedTerm(_) | ParseError::UnexpectedToken { .. }
        )
    }

    /// The error with any line information stripped.
    pub fn root(&self) -> &ParseError {
        match self {
            ParseError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Variable names are one ASCII letter followed by optional digits.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_digit())
}

/// Recursive-descent parser over the tokens of one line.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Variables named by the terms parsed so far, zero coefficients included
    mentioned: Vec<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            mentioned: Vec::new(),
        }
    }

    fn for_line(line: &str) -> Self {
        Self::new(Lexer::tokenize(line))
    }

    /// Parse a whole program.
    ///
    /// The first non-blank line is the objective. Every later non-blank line
    /// must read as a constraint or, failing that, as a declaration. Afterwards
    /// the variables with non-zero terms and the declared ones must match
    /// exactly.
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let mut lines = source
            .lines()
            .enumerate()
            .map(|(i, text)| (i + 1, text))
            .filter(|(_, text)| !text.trim().is_empty());

        let mut mentioned = Vec::new();

        let (first, text) = lines.next().ok_or(ParseError::EmptyProgram)?;
        trace!(line = first, "parsing objective");
        let objective = parse_line(first, Lexer::tokenize(text), &mut mentioned, Parser::objective)?;

        let mut constraints = Vec::new();
        let mut variables = VariableRestrictions::new();

        for (number, text) in lines {
            let tokens = Lexer::tokenize(text);

            match parse_line(number, tokens.clone(), &mut mentioned, Parser::constraint) {
                Ok(constraint) => {
                    trace!(line = number, "parsed constraint");
                    constraints.push(constraint);
                    continue;
                }
                Err(e) if !e.is_shape_mismatch() => return Err(e),
                Err(_) => {}
            }

            match parse_line(number, tokens, &mut mentioned, Parser::variable_declaration) {
                Ok(declared) => {
                    trace!(line = number, "parsed declaration");
                    for (name, restriction) in declared {
                        if !variables.declare(name.clone(), restriction) {
                            return Err(ParseError::DuplicateDeclaration(name).at_line(number));
                        }
                    }
                }
                Err(e) if !e.is_shape_mismatch() => return Err(e),
                Err(_) => {
                    return Err(ParseError::InvalidLine(text.trim().to_string()).at_line(number));
                }
            }
        }

        if mentioned.contains(&objective.variable) || variables.contains(&objective.variable) {
            return Err(ParseError::ResultVariableReused(objective.variable));
        }

        let program = Program {
            objective,
            constraints,
            variables,
        };

        // Zero terms are not stored, so only non-zero terms count as a use.
        let used = program.used_variables();
        if let Some(name) = used.iter().find(|name| !program.variables.contains(name)) {
            return Err(ParseError::UndeclaredVariable(name.to_string()));
        }
        if let Some(name) = program.variables.names().find(|name| !used.contains(name)) {
            return Err(ParseError::UnusedDeclaration(name.to_string()));
        }

        debug!(
            constraints = program.constraints.len(),
            variables = program.variables.len(),
            "parsed program"
        );

        Ok(program)
    }

    /// Parse a term coefficient on its own: empty (1), `-` (-1) or a value.
    pub fn parse_coefficient(text: &str) -> Result<Coefficient, ParseError> {
        Self::for_line(text).whole(Parser::term_coefficient)
    }

    pub fn parse_polynomial(text: &str) -> Result<Polynomial, ParseError> {
        Self::for_line(text).whole(Parser::polynomial)
    }

    pub fn parse_objective(text: &str) -> Result<Objective, ParseError> {
        Self::for_line(text).whole(Parser::objective)
    }

    pub fn parse_constraint(text: &str) -> Result<Constraint, ParseError> {
        Self::for_line(text).whole(Parser::constraint)
    }

    pub fn parse_variable_declaration(text: &str) -> Result<Vec<(String, Restriction)>, ParseError> {
        Self::for_line(text).whole(Parser::variable_declaration)
    }

    fn whole<T>(mut self, rule: fn(&mut Parser) -> Result<T, ParseError>) -> Result<T, ParseError> {
        let value = rule(&mut self)?;
        self.expect_end()?;
        Ok(value)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    /// Whether the current token has `kind` and starts right where `span` ends.
    fn peek_adjacent(&self, kind: TokenKind, span: Span) -> bool {
        self.current()
            .is_some_and(|t| t.kind == kind && span.touches(t.span))
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let (found, span) = match self.current() {
            Some(t) if t.kind != TokenKind::Eof => (t.text.clone(), t.span),
            t => ("end of line".to_string(), t.map(|t| t.span).unwrap_or(Span::new(0, 0))),
        };
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            span,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        if self.peek_kind() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    /// Consume a variable name if one is next.
    fn variable_name(&mut self) -> Option<String> {
        let token = self.current().filter(|t| t.kind == TokenKind::Ident && is_variable_name(&t.text))?;
        let name = token.text.clone();
        self.advance();
        Some(name)
    }

    /// The rest of a number literal whose first token has been consumed: an
    /// optional `/denominator` written without spaces.
    fn finish_value(&mut self, negative: bool, number: &Token) -> Result<Coefficient, ParseError> {
        let mut literal = if negative {
            format!("-{}", number.text)
        } else {
            number.text.clone()
        };

        if self.peek_adjacent(TokenKind::Slash, number.span) {
            let slash = self.advance().map(|t| t.span).unwrap_or(number.span);
            literal.push('/');
            if !self.peek_adjacent(TokenKind::Number, slash) {
                return Err(self.unexpected("denominator"));
            }
            if let Some(denom) = self.advance() {
                literal.push_str(&denom.text);
            }
        }

        literal
            .parse::<Coefficient>()
            .map_err(|_| ParseError::InvalidNumber(literal))
    }

    /// A signed value: `[-]number[/number]`, no spaces inside.
    fn value(&mut self) -> Result<Coefficient, ParseError> {
        let negative = match self.current() {
            Some(t) if t.kind == TokenKind::Minus => {
                let span = t.span;
                self.advance();
                if !self.peek_adjacent(TokenKind::Number, span) {
                    return Err(self.unexpected("number"));
                }
                true
            }
            _ => false,
        };
        let number = self.expect(TokenKind::Number, "number")?;
        self.finish_value(negative, &number)
    }

    /// Coefficient in front of a variable: nothing means 1 and a lone `-`
    /// means -1; a `-` directly touching a number makes it negative.
    fn term_coefficient(&mut self) -> Result<Coefficient, ParseError> {
        match self.current().cloned() {
            Some(t) if t.kind == TokenKind::Minus => {
                self.advance();
                if self.peek_adjacent(TokenKind::Number, t.span) {
                    let number = self.expect(TokenKind::Number, "number")?;
                    self.finish_value(true, &number)
                } else {
                    Ok(Coefficient::from(-1))
                }
            }
            Some(t) if t.kind == TokenKind::Number => {
                self.advance();
                self.finish_value(false, &t)
            }
            _ => Ok(Coefficient::from(1)),
        }
    }

    fn term(&mut self, negate: bool) -> Result<(String, Coefficient), ParseError> {
        let coefficient = self.term_coefficient()?;
        let Some(name) = self.variable_name() else {
            return Err(match self.current() {
                Some(t) if t.kind != TokenKind::Eof => ParseError::MalformedTerm(t.text.clone()),
                _ => ParseError::MalformedTerm("end of line".to_string()),
            });
        };
        Ok((name, if negate { -coefficient } else { coefficient }))
    }

    /// Terms joined by `+` or `-`, each variable at most once.
    fn polynomial(&mut self) -> Result<Polynomial, ParseError> {
        let mut poly = Polynomial::new();
        let mut seen: Vec<String> = Vec::new();
        let mut negate = false;

        loop {
            let (name, coefficient) = self.term(negate)?;
            if seen.contains(&name) {
                return Err(ParseError::DuplicateVariable(name));
            }
            seen.push(name.clone());
            poly.insert(name, coefficient);

            negate = match self.peek_kind() {
                TokenKind::Plus => false,
                TokenKind::Minus => true,
                _ => break,
            };
            self.advance();
        }

        self.mentioned.extend(seen);
        Ok(poly)
    }

    /// `(min|max) var = polynomial`
    fn objective(&mut self) -> Result<Objective, ParseError> {
        let minmax = match self.peek_kind() {
            TokenKind::Min => MinMax::Min,
            TokenKind::Max => MinMax::Max,
            _ => return Err(self.unexpected("min or max")),
        };
        self.advance();

        let variable = self
            .variable_name()
            .ok_or_else(|| self.unexpected("objective variable"))?;
        self.expect(TokenKind::Eq, "=")?;
        let expression = self.polynomial()?;

        Ok(Objective {
            minmax,
            variable,
            expression,
        })
    }

    /// `polynomial relation value`
    fn constraint(&mut self) -> Result<Constraint, ParseError> {
        let expression = self.polynomial()?;
        let relation = self
            .peek_kind()
            .relation()
            .ok_or_else(|| self.unexpected("relation"))?;
        self.advance();
        let rhs = self.value()?;

        Ok(Constraint {
            expression,
            relation,
            rhs,
        })
    }

    /// `var(, var)* (non-negative|unrestricted)`
    fn variable_declaration(&mut self) -> Result<Vec<(String, Restriction)>, ParseError> {
        let mut names = Vec::new();
        loop {
            let name = self.variable_name().ok_or_else(|| self.unexpected("variable"))?;
            names.push(name);
            if self.peek_kind() != TokenKind::Comma {
                break;
            }
            self.advance();
        }

        let restriction = match self.peek_kind() {
            TokenKind::NonNegative => Restriction::NonNegative,
            TokenKind::Unrestricted => Restriction::Unrestricted,
            _ => return Err(self.unexpected("non-negative or unrestricted")),
        };
        self.advance();

        Ok(names.into_iter().map(|name| (name, restriction)).collect())
    }
}

/// Run `rule` over one line of a program, tagging failures with the line
/// number and collecting the variables it mentions.
fn parse_line<T>(
    number: usize,
    tokens: Vec<Token>,
    mentioned: &mut Vec<String>,
    rule: fn(&mut Parser) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    let mut parser = Parser::new(tokens);
    let value = rule(&mut parser)
        .and_then(|value| parser.expect_end().map(|()| value))
        .map_err(|e| e.at_line(number))?;
    mentioned.append(&mut parser.mentioned);
    Ok(value)
}

pub fn is_coefficient(text: &str) -> bool {
    Parser::parse_coefficient(text).is_ok()
}

pub fn is_polynomial(text: &str) -> bool {
    Parser::parse_polynomial(text).is_ok()
}

pub fn is_objective(text: &str) -> bool {
    Parser::parse_objective(text).is_ok()
}

pub fn is_constraint(text: &str) -> bool {
    Parser::parse_constraint(text).is_ok()
}

pub fn is_variable_declaration(text: &str) -> bool {
    Parser::parse_variable_declaration(text).is_ok()
}

pub fn is_program(text: &str) -> bool {
    Parser::parse(text).is_ok()
}
