use lpstep_solver::{ChainError, ConversionStep, Converter, Program, State, StateKind};
use thiserror::Error;

use crate::parser::{ParseError, Parser};

/// Failure anywhere between program text and its last step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::parse(source)
}

/// Parse `source` and drive it to `target` with `converter`.
pub fn steps_to(
    converter: &Converter,
    source: &str,
    target: StateKind,
) -> Result<Vec<ConversionStep>, SolveError> {
    let program = Parser::parse(source)?;
    Ok(converter.convert_to(State::Program(program), target)?)
}

/// Parse and solve with default settings. The last step holds the
/// `Solution`, or the `Unbounded` tableau.
pub fn solve(source: &str) -> Result<Vec<ConversionStep>, SolveError> {
    solve_with(&Converter::new(), source)
}

pub fn solve_with(converter: &Converter, source: &str) -> Result<Vec<ConversionStep>, SolveError> {
    steps_to(converter, source, StateKind::Solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpstep_solver::{Coefficient, PivotRule, SimplexError, StandardizeError};
    use pretty_assertions::assert_eq;

    const WORKED_EXAMPLE: &str = "max z = x1 + 2x2\nx1 + x2 <= 3\nx1, x2 non-negative";

    fn int(n: i64) -> Coefficient {
        Coefficient::from(n)
    }

    #[test]
    fn test_solve_worked_example() {
        let steps = solve(WORKED_EXAMPLE).unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "standardize_program",
                "build_tableau",
                "find_basic_feasible_solution",
                "simplex_iteration",
                "simplex_iteration",
                "read_solution",
            ]
        );

        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.value("x1"), Some(&int(0)));
        assert_eq!(solution.value("x2"), Some(&int(3)));
        assert_eq!(solution.value("z"), Some(&int(6)));
    }

    #[test]
    fn test_fractional_optimum() {
        // Optimum at the intersection x1 = 8/5, x2 = 6/5.
        let source = "max z = x1 + x2\n2x1 + x2 <= 22/5\nx1 + 3x2 <= 26/5\nx1, x2 non-negative";
        let steps = solve_with(&Converter::new().with_pivot_rule(PivotRule::Bland), source).unwrap();
        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.value("x1"), Some(&Coefficient::new(8, 5).unwrap()));
        assert_eq!(solution.value("x2"), Some(&Coefficient::new(6, 5).unwrap()));
        assert_eq!(solution.objective_value, Coefficient::new(14, 5).unwrap());
    }

    #[test]
    fn test_decimal_input_stays_exact() {
        let source = "max z = 0.1x1\nx1 <= 0.2\nx1 non-negative";
        let steps = solve(source).unwrap();
        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.objective_value, Coefficient::new(1, 50).unwrap());
    }

    #[test]
    fn test_steps_to_intermediate_state() {
        let steps = steps_to(&Converter::new(), WORKED_EXAMPLE, StateKind::UnknownTableau).unwrap();
        assert_eq!(steps.len(), 2);
        let tableau = steps[1].result.tableau().unwrap();
        assert_eq!(tableau.variables, vec!["z", "x1", "x2", "e1", "rhs"]);
    }

    #[test]
    fn test_errors_propagate() {
        assert_eq!(solve(""), Err(SolveError::Parse(ParseError::EmptyProgram)));
        assert!(matches!(
            solve("max z = x1\nx1 < 3\nx1 non-negative"),
            Err(SolveError::Chain(ChainError::Standardize(
                StandardizeError::UnsupportedRelation { .. }
            )))
        ));
        assert!(matches!(
            solve("max z = x1\nx1 >= 3\nx1 <= -1\nx1 non-negative"),
            Err(SolveError::Chain(ChainError::Simplex(SimplexError::InfeasibleStart { row: 2, .. })))
        ));
    }
}
