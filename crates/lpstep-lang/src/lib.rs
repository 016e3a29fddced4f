pub mod lexer;
pub mod parser;
pub mod solve;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{
    is_coefficient, is_constraint, is_objective, is_polynomial, is_program,
    is_variable_declaration, is_variable_name, ParseError, Parser,
};
pub use solve::{parse_program, solve, solve_with, steps_to, SolveError};
