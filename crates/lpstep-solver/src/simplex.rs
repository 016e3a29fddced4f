use std::fmt;

use num_traits::Zero;
use thiserror::Error;
use tracing::debug;

use crate::coefficient::{ArithmeticError, Coefficient};
use crate::convert::{ChainError, Converter};
use crate::format::{format_tableau, sign_word};
use crate::problem::MinMax;
use crate::state::{ConversionStep, State, StateKind};
use crate::tableau::Tableau;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimplexError {
    #[error("Row {row} has no basic variable; a starting basis would need artificial variables")]
    NoBasicVariable { row: usize },
    #[error("Row {row} has negative right-hand side {rhs}, so the starting basis is infeasible")]
    InfeasibleStart { row: usize, rhs: Coefficient },
    #[error("Tableau has no column '{0}'")]
    MissingColumn(String),
    #[error("Objective value {computed} disagrees with the tableau's {tableau}")]
    InconsistentObjective { computed: Coefficient, tableau: Coefficient },
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// How entering and leaving variables are chosen when several qualify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PivotRule {
    /// Largest improving reduced cost enters; the lowest tied row leaves.
    #[default]
    Dantzig,
    /// Lowest-index improving column enters; among tied rows, the one whose
    /// basic variable has the lowest column index leaves. Never cycles.
    Bland,
}

/// Result of the min-ratio test for one row.
///
/// `Finite` orders before `Infinite`, so the minimum over rows is the binding one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ratio {
    Finite(Coefficient),
    Infinite,
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Finite(c) => write!(f, "{}", c),
            Ratio::Infinite => write!(f, "∞"),
        }
    }
}

/// A tableau with its entering variable chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnteringTableau {
    pub tableau: Tableau,
    pub entering_var: String,
}

/// A tableau with both pivot variables chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeavingTableau {
    pub tableau: Tableau,
    pub entering_var: String,
    pub leaving_var: String,
    pub leaving_row: usize,
    /// Min-ratio test value of every row, row 0 included
    pub ratios: Vec<Ratio>,
}

/// An elementary row operation performed during a pivot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowOperation {
    /// `row <- factor * row`
    Scale { row: usize, factor: Coefficient },
    /// `row <- row + factor * source`
    AddMultiple { row: usize, factor: Coefficient, source: usize },
}

impl fmt::Display for RowOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOperation::Scale { row, factor } => write!(f, "R{row} <- ({factor}) * R{row}"),
            RowOperation::AddMultiple { row, factor, source } => {
                write!(f, "R{row} <- R{row} + ({factor}) * R{source}")
            }
        }
    }
}

/// A freshly pivoted tableau with the record of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotedTableau {
    pub tableau: Tableau,
    /// The tableau after only the pivot row was scaled
    pub scaled: Tableau,
    pub operations: Vec<RowOperation>,
}

/// Accept the slack/excess columns as the starting basis.
///
/// No other basis is searched for: every constraint row must already own a
/// basic variable and have a non-negative right-hand side.
pub fn find_basic_feasible_solution(tableau: &Tableau) -> Result<ConversionStep, SimplexError> {
    let basics = tableau.basic_variables();
    for (row, basic) in basics.iter().enumerate().skip(1) {
        if basic.is_none() {
            return Err(SimplexError::NoBasicVariable { row });
        }
        if let Some(rhs) = tableau.rhs(row).filter(|rhs| rhs.is_negative()) {
            return Err(SimplexError::InfeasibleStart { row, rhs: rhs.clone() });
        }
    }

    let names: Vec<&str> = basics.iter().skip(1).flatten().copied().collect();
    let how = format!(
        "A basic feasible solution has one basic variable per constraint. The variables \
         added during standardization form an identity block, so they are taken as the \
         initial basis: {}.",
        names.join(", ")
    );

    Ok(ConversionStep::new(
        "find_basic_feasible_solution",
        "Find a basic feasible solution",
        how,
        State::BasicFeasible(tableau.clone()),
    ))
}

/// Choose the entering variable, or report that the tableau is optimal.
pub fn pick_entering_variable(tableau: &Tableau, rule: PivotRule) -> ConversionStep {
    let reduced_costs = tableau.reduced_costs();
    let improving: Vec<(&str, &Coefficient)> = reduced_costs
        .iter()
        .copied()
        .filter(|(_, c)| tableau.improves(c))
        .collect();

    let (direction, extreme) = match tableau.minmax {
        MinMax::Max => ("negative", "most negative"),
        MinMax::Min => ("positive", "most positive"),
    };
    let mut how = format!(
        "The entering variable of a {} problem has the {} reduced cost (row-0 value). \
         Ignoring {} and rhs, the reduced costs are:",
        tableau.minmax,
        extreme,
        tableau.objective_variable()
    );
    for (name, c) in &reduced_costs {
        how.push_str(&format!("\n  {} = {}", name, c));
    }

    let chosen = match rule {
        PivotRule::Bland => improving.first().copied(),
        // Strict comparison keeps the first of equally good candidates.
        PivotRule::Dantzig => improving
            .iter()
            .copied()
            .reduce(|best, cur| if cur.1.abs() > best.1.abs() { cur } else { best }),
    };

    match chosen {
        None => {
            how.push_str(&format!(
                "\nNo reduced cost is {}, so the current tableau is optimal.",
                direction
            ));
            debug!("tableau is optimal");
            ConversionStep::new(
                "pick_entering_variable",
                "Try to find an entering variable",
                how,
                State::Optimal(tableau.clone()),
            )
        }
        Some((name, value)) => {
            let candidates: Vec<String> = improving.iter().map(|(_, c)| c.to_string()).collect();
            how.push_str(&format!(
                "\nThe {} values ({}) mean the tableau is not optimal yet. {} = {} is picked \
                 as the entering variable.",
                direction,
                candidates.join(", "),
                name,
                value
            ));
            debug!(entering = name, "picked entering variable");
            ConversionStep::new(
                "pick_entering_variable",
                "Try to find an entering variable",
                how,
                State::Entering(EnteringTableau {
                    tableau: tableau.clone(),
                    entering_var: name.to_string(),
                }),
            )
        }
    }
}

/// Min-ratio test value of every row for the column `entering`.
///
/// A row binds only when its entering value is strictly positive; all other
/// rows, and the objective row, get [`Ratio::Infinite`].
pub fn ratio_test(tableau: &Tableau, entering: &str) -> Result<Vec<Ratio>, SimplexError> {
    let col = tableau
        .column(entering)
        .ok_or_else(|| SimplexError::MissingColumn(entering.to_string()))?;
    let rhs_col = tableau.rhs_column();

    tableau
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| match (row.get(col), row.get(rhs_col)) {
            (Some(value), Some(rhs)) if i > 0 && value.is_positive() => {
                Ok(Ratio::Finite(rhs.checked_div(value)?))
            }
            (Some(_), Some(_)) => Ok(Ratio::Infinite),
            _ => Err(SimplexError::MissingColumn(entering.to_string())),
        })
        .collect()
}

/// Choose the leaving variable by the min-ratio test, or report that the
/// entering variable is unbounded.
pub fn find_leaving_variable(
    entering: &EnteringTableau,
    rule: PivotRule,
) -> Result<ConversionStep, SimplexError> {
    let tableau = &entering.tableau;
    let ratios = ratio_test(tableau, &entering.entering_var)?;
    let basics = tableau.basic_variables();

    let mut how = String::from(
        "The min-ratio test divides each row's rhs (the value of its basic variable) by its \
         entry in the entering column. Rows whose entry is not positive get ratio ∞.",
    );
    for (i, ratio) in ratios.iter().enumerate() {
        let entry = tableau.get(i, &entering.entering_var).cloned().unwrap_or_default();
        let rhs = tableau.rhs(i).cloned().unwrap_or_default();
        how.push_str(&format!(
            "\n  Row {} ({}): {} / {} ({}) => {}",
            i,
            basics[i].unwrap_or("-"),
            rhs,
            entry,
            sign_word(&entry),
            ratio
        ));
    }

    let min = ratios.iter().min().cloned().unwrap_or(Ratio::Infinite);
    if min == Ratio::Infinite {
        how.push_str(&format!(
            "\nNo row limits {}, so it can grow without bound: the problem is unbounded.",
            entering.entering_var
        ));
        debug!(entering = %entering.entering_var, "problem is unbounded");
        return Ok(ConversionStep::new(
            "find_leaving_variable",
            "Find the leaving variable",
            how,
            State::Unbounded(entering.clone()),
        ));
    }

    let tied = ratios.iter().enumerate().filter(|(_, r)| **r == min).map(|(i, _)| i);
    let leaving_row = match rule {
        PivotRule::Dantzig => tied.min(),
        PivotRule::Bland => tied.min_by_key(|&i| {
            basics[i]
                .and_then(|name| tableau.column(name))
                .unwrap_or(usize::MAX)
        }),
    }
    .ok_or(SimplexError::NoBasicVariable { row: 0 })?;
    let leaving_var = basics[leaving_row]
        .ok_or(SimplexError::NoBasicVariable { row: leaving_row })?
        .to_string();

    how.push_str(&format!(
        "\nThe smallest ratio is {} in row {}, so its basic variable {} leaves the basis.",
        min, leaving_row, leaving_var
    ));
    debug!(leaving = %leaving_var, row = leaving_row, "picked leaving variable");

    Ok(ConversionStep::new(
        "find_leaving_variable",
        "Find the leaving variable",
        how,
        State::Leaving(LeavingTableau {
            tableau: tableau.clone(),
            entering_var: entering.entering_var.clone(),
            leaving_var,
            leaving_row,
            ratios,
        }),
    ))
}

/// Pivot on the cell at the entering column and leaving row.
///
/// The leaving row is scaled so the pivot cell becomes 1, then a multiple of
/// it is added to every other row with a nonzero entering entry so the
/// entering column becomes a unit column.
pub fn pivot(leaving: &LeavingTableau) -> Result<ConversionStep, SimplexError> {
    let tableau = &leaving.tableau;
    let row = leaving.leaving_row;
    let col = tableau
        .column(&leaving.entering_var)
        .ok_or_else(|| SimplexError::MissingColumn(leaving.entering_var.clone()))?;
    let pivot_cell = tableau
        .rows
        .get(row)
        .and_then(|r| r.get(col))
        .ok_or_else(|| SimplexError::MissingColumn(leaving.entering_var.clone()))?;
    let factor = pivot_cell.recip()?;

    let pivot_row: Vec<Coefficient> = tableau.rows[row].iter().map(|c| c * &factor).collect();
    let mut operations = vec![RowOperation::Scale { row, factor }];

    let mut scaled = tableau.clone();
    scaled.rows[row] = pivot_row.clone();

    let mut next = scaled.clone();
    for (i, current) in next.rows.iter_mut().enumerate() {
        if i == row {
            continue;
        }
        let entry = current.get(col).cloned().unwrap_or_default();
        if entry.is_zero() {
            continue;
        }
        let multiple = -entry;
        for (cell, p) in current.iter_mut().zip(&pivot_row) {
            *cell = &*cell + &(&multiple * p);
        }
        operations.push(RowOperation::AddMultiple { row: i, factor: multiple, source: row });
    }

    debug!(
        entering = %leaving.entering_var,
        leaving = %leaving.leaving_var,
        row,
        "pivoted"
    );

    let ops: Vec<String> = operations.iter().map(|op| format!("  {}", op)).collect();
    let how = format!(
        "Pivot on the cell where column {} meets row {} (basic variable {}). The row is first \
         divided by the pivot cell, then a multiple of it is added to every other row so that \
         {} becomes basic:\n{}\n{}",
        leaving.entering_var,
        row,
        leaving.leaving_var,
        leaving.entering_var,
        ops.join("\n"),
        format_tableau(&next)
    );

    Ok(ConversionStep::new(
        "pivot",
        "Pivot to the next feasible solution",
        how,
        State::PivotedNext(PivotedTableau {
            tableau: next,
            scaled,
            operations,
        }),
    ))
}

/// Run one full simplex iteration: pick entering, find leaving, pivot.
///
/// The result is the next basic feasible tableau, or the optimal or unbounded
/// tableau if the iteration stopped early. The inner steps are kept as substeps.
pub fn simplex_iteration(converter: &Converter, tableau: &Tableau) -> Result<ConversionStep, ChainError> {
    let steps = converter.convert_to_any(
        State::BasicFeasible(tableau.clone()),
        &[StateKind::PivotedNext, StateKind::Optimal, StateKind::Unbounded],
    )?;

    let result = match steps.last().map(|s| &s.result) {
        Some(State::PivotedNext(p)) => State::BasicFeasible(p.tableau.clone()),
        Some(state @ (State::Optimal(_) | State::Unbounded(_))) => state.clone(),
        Some(state) => {
            return Err(ChainError::StateMismatch {
                expected: StateKind::PivotedNext,
                found: state.kind(),
            });
        }
        None => {
            return Err(ChainError::StateMismatch {
                expected: StateKind::PivotedNext,
                found: StateKind::BasicFeasible,
            });
        }
    };

    let how = steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. ({}) {}", i + 1, s.step_name, s.what))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ConversionStep::new(
        "simplex_iteration",
        "Perform an iteration of the simplex algorithm",
        how,
        result,
    )
    .with_substeps(steps))
}
