//! Exact-arithmetic linear programming with an explained, step-by-step simplex.
//!
//! A [`Program`] is driven through typed [`State`]s by a [`Converter`]; every
//! transformation yields a [`ConversionStep`] saying what was done and how.

mod coefficient;
mod convert;
pub mod format;
mod polynomial;
mod problem;
mod simplex;
mod solution;
mod standardize;
mod state;
mod tableau;

pub use coefficient::{ArithmeticError, Coefficient};
pub use convert::{convert_to, run_simplex, ChainError, Conversion, Converter};
pub use polynomial::Polynomial;
pub use problem::{
    Constraint, MinMax, Objective, Program, Relation, Restriction, VariableRestrictions,
};
pub use simplex::{
    find_basic_feasible_solution, find_leaving_variable, pick_entering_variable, pivot,
    ratio_test, simplex_iteration, EnteringTableau, LeavingTableau, PivotRule, PivotedTableau,
    Ratio, RowOperation, SimplexError,
};
pub use solution::{read_solution, solution_from_tableau, Solution};
pub use standardize::{standardize, standardize_program, StandardizeError};
pub use state::{ConversionStep, State, StateKind};
pub use tableau::{build_tableau, tableau_from_program, Tableau, TableauError, RHS};
