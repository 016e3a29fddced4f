//! Plain-text rendering of coefficients, expressions, programs and tableaus.
//!
//! [`format_program`] output is valid program text and parses back to an equal
//! program.

use num_traits::{One, Zero};

use crate::coefficient::Coefficient;
use crate::polynomial::Polynomial;
use crate::problem::{Constraint, Objective, Program, Relation, Restriction};
use crate::solution::Solution;
use crate::tableau::Tableau;

pub fn format_coefficient(c: &Coefficient) -> String {
    c.to_string()
}

/// Coefficient as written in front of a variable: `1` is implicit and `-1` is `-`.
pub fn format_term_coefficient(c: &Coefficient) -> String {
    if c.is_one() {
        String::new()
    } else if (-c).is_one() {
        "-".to_string()
    } else {
        c.to_string()
    }
}

/// Split a variable name into its stem and trailing digits: `x12` -> (`x`, `12`).
pub fn split_subscript(name: &str) -> (&str, &str) {
    let stem_len = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name.split_at(stem_len)
}

/// Variable name with its trailing digits as Unicode subscripts.
pub fn format_variable(name: &str) -> String {
    const SUBSCRIPTS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];
    let (stem, digits) = split_subscript(name);
    let mut out = stem.to_string();
    for d in digits.bytes() {
        out.push(SUBSCRIPTS[usize::from(d - b'0')]);
    }
    out
}

pub fn format_relation(relation: Relation) -> &'static str {
    relation.symbol()
}

/// Render `poly` with terms ordered by `order`; variables missing from `order`
/// follow in name order. The empty polynomial renders as `0`.
pub fn format_polynomial<S: AsRef<str>>(poly: &Polynomial, order: &[S]) -> String {
    let mut terms: Vec<(&str, &Coefficient)> = poly.iter_in(order).collect();
    terms.extend(
        poly.iter()
            .filter(|(var, _)| !order.iter().any(|o| o.as_ref() == *var)),
    );

    if terms.is_empty() {
        return "0".to_string();
    }

    let mut out = String::new();
    for (i, (var, c)) in terms.into_iter().enumerate() {
        if i == 0 {
            out.push_str(&format_term_coefficient(c));
        } else if c.is_negative() {
            out.push_str(" - ");
            out.push_str(&format_term_coefficient(&c.abs()));
        } else {
            out.push_str(" + ");
            out.push_str(&format_term_coefficient(c));
        }
        out.push_str(var);
    }
    out
}

pub fn format_objective<S: AsRef<str>>(objective: &Objective, order: &[S]) -> String {
    format!(
        "{} {} = {}",
        objective.minmax,
        objective.variable,
        format_polynomial(&objective.expression, order)
    )
}

pub fn format_constraint<S: AsRef<str>>(constraint: &Constraint, order: &[S]) -> String {
    format!(
        "{} {} {}",
        format_polynomial(&constraint.expression, order),
        constraint.relation,
        constraint.rhs
    )
}

/// Render a program as text. Declarations keep their order, one line per run
/// of consecutive variables sharing a restriction.
pub fn format_program(program: &Program) -> String {
    let order = program.variable_names();
    let mut lines = vec![format_objective(&program.objective, &order)];
    lines.extend(program.constraints.iter().map(|c| format_constraint(c, &order)));

    let mut runs: Vec<(Vec<&str>, Restriction)> = Vec::new();
    for (name, restriction) in program.variables.iter() {
        match runs.last_mut() {
            Some((names, r)) if *r == restriction => names.push(name),
            _ => runs.push((vec![name], restriction)),
        }
    }
    lines.extend(
        runs.into_iter()
            .map(|(names, restriction)| format!("{} {}", names.join(", "), restriction)),
    );
    lines.join("\n")
}

/// Render a tableau as an aligned table. The first column names each row's
/// basic variable, `-` when the row has none.
pub fn format_tableau(tableau: &Tableau) -> String {
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(tableau.rows.len() + 1);

    let mut header = vec!["basic".to_string()];
    header.extend(tableau.variables.iter().map(|v| format_variable(v)));
    grid.push(header);

    for (i, row) in tableau.rows.iter().enumerate() {
        let basic = tableau
            .basic_variable(i)
            .map(format_variable)
            .unwrap_or_else(|| "-".to_string());
        let mut cells = vec![basic];
        cells.extend(row.iter().map(format_coefficient));
        grid.push(cells);
    }

    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|j| {
            grid.iter()
                .filter_map(|r| r.get(j))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    grid.iter()
        .map(|cells| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width.saturating_sub(cell.chars().count());
                    format!("{}{}", " ".repeat(pad), cell)
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `name = value` line per variable, then the objective value.
pub fn format_solution(solution: &Solution) -> String {
    let mut lines: Vec<String> = solution
        .values
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect();
    lines.push(format!("{} = {}", solution.objective_var, solution.objective_value));
    lines.join("\n")
}

/// Short description of a coefficient's sign, used in narration.
pub(crate) fn sign_word(c: &Coefficient) -> &'static str {
    if c.is_zero() {
        "zero"
    } else if c.is_negative() {
        "negative"
    } else {
        "positive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::frac;
    use crate::problem::{MinMax, VariableRestrictions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_term_coefficients() {
        assert_eq!(format_term_coefficient(&frac(1, 1)), "");
        assert_eq!(format_term_coefficient(&frac(-1, 1)), "-");
        assert_eq!(format_term_coefficient(&frac(3, 2)), "3/2");
        assert_eq!(format_coefficient(&frac(1, 1)), "1");
    }

    #[test]
    fn test_variables() {
        assert_eq!(split_subscript("x12"), ("x", "12"));
        assert_eq!(split_subscript("z"), ("z", ""));
        assert_eq!(format_variable("x12"), "x₁₂");
        assert_eq!(format_variable("rhs"), "rhs");
    }

    #[test]
    fn test_polynomial() {
        let poly: Polynomial = [("x1", frac(-1, 1)), ("x2", frac(-3, 2)), ("x3", frac(1, 1))]
            .into_iter()
            .collect();
        assert_eq!(format_polynomial(&poly, &["x3", "x1", "x2"]), "x3 - x1 - 3/2x2");
        assert_eq!(format_polynomial(&poly, &["x2"]), "-3/2x2 - x1 + x3");
        assert_eq!(format_polynomial(&Polynomial::new(), &["x1"]), "0");
    }

    #[test]
    fn test_program() {
        let mut variables = VariableRestrictions::new();
        variables.declare("x1", Restriction::NonNegative);
        variables.declare("x2", Restriction::NonNegative);
        variables.declare("x3", Restriction::Unrestricted);
        let program = Program {
            objective: Objective {
                minmax: MinMax::Max,
                variable: "z".to_string(),
                expression: [("x1", frac(1, 1)), ("x2", frac(2, 1))].into_iter().collect(),
            },
            constraints: vec![Constraint {
                expression: [("x1", frac(1, 1)), ("x2", frac(1, 1)), ("x3", frac(-1, 2))]
                    .into_iter()
                    .collect(),
                relation: Relation::Le,
                rhs: frac(3, 1),
            }],
            variables,
        };
        assert_eq!(
            format_program(&program),
            "max z = x1 + 2x2\nx1 + x2 - 1/2x3 <= 3\nx1, x2 non-negative\nx3 unrestricted"
        );
    }
}
