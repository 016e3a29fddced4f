use num_traits::{One, Zero};
use thiserror::Error;
use tracing::{debug, warn};

use crate::coefficient::Coefficient;
use crate::format::{format_polynomial, format_tableau};
use crate::polynomial::Polynomial;
use crate::problem::{MinMax, Objective, Program, Relation, Restriction};
use crate::state::{ConversionStep, State};

/// Name of the right-hand-side column, always last.
pub const RHS: &str = "rhs";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableauError {
    #[error("Program is not in standard form: constraint {index} uses '{relation}'")]
    NotStandardForm { index: usize, relation: Relation },
}

/// A simplex tableau.
///
/// Columns are the objective variable, the problem variables in declaration
/// order, then [`RHS`]. Row 0 is the objective row; row `i` is constraint `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tableau {
    pub minmax: MinMax,
    pub variables: Vec<String>,
    pub rows: Vec<Vec<Coefficient>>,
    /// Objective of the program the tableau was built from
    pub objective: Objective,
}

impl Tableau {
    pub fn objective_variable(&self) -> &str {
        &self.objective.variable
    }

    pub fn rhs_column(&self) -> usize {
        self.variables.len().saturating_sub(1)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Coefficient> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col)
    }

    pub fn rhs(&self, row: usize) -> Option<&Coefficient> {
        self.rows.get(row)?.get(self.rhs_column())
    }

    pub fn num_constraints(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Columns of problem variables: everything but the objective and rhs columns.
    pub fn decision_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        let rhs = self.rhs_column();
        self.variables
            .iter()
            .enumerate()
            .filter(move |(j, _)| *j != 0 && *j != rhs)
            .map(|(j, v)| (j, v.as_str()))
    }

    /// Row-0 entries of the problem variables.
    pub fn reduced_costs(&self) -> Vec<(&str, &Coefficient)> {
        let Some(objective_row) = self.rows.first() else {
            return Vec::new();
        };
        self.decision_columns()
            .filter_map(|(j, v)| objective_row.get(j).map(|c| (v, c)))
            .collect()
    }

    /// Whether raising a variable with this reduced cost improves the objective.
    pub fn improves(&self, reduced_cost: &Coefficient) -> bool {
        match self.minmax {
            MinMax::Max => reduced_cost.is_negative(),
            MinMax::Min => reduced_cost.is_positive(),
        }
    }

    /// A max tableau is optimal when no reduced cost is negative, a min tableau
    /// when none is positive.
    pub fn is_optimal(&self) -> bool {
        self.reduced_costs().into_iter().all(|(_, c)| !self.improves(c))
    }

    /// The variable whose column is 1 in `row` and 0 in every other row.
    pub fn basic_variable(&self, row: usize) -> Option<&str> {
        let rhs = self.rhs_column();
        (0..rhs)
            .find(|&j| {
                self.rows.iter().enumerate().all(|(i, r)| match r.get(j) {
                    Some(c) if i == row => c.is_one(),
                    Some(c) => c.is_zero(),
                    None => false,
                })
            })
            .map(|j| self.variables[j].as_str())
    }

    pub fn basic_variables(&self) -> Vec<Option<&str>> {
        (0..self.rows.len()).map(|i| self.basic_variable(i)).collect()
    }
}

/// Lay out a standard-form program as a tableau.
pub fn tableau_from_program(program: &Program) -> Result<Tableau, TableauError> {
    if let Some((index, c)) = program
        .constraints
        .iter()
        .enumerate()
        .find(|(_, c)| c.relation != Relation::Eq)
    {
        return Err(TableauError::NotStandardForm { index, relation: c.relation });
    }

    let unrestricted: Vec<&str> = program
        .variables
        .iter()
        .filter(|(_, r)| *r == Restriction::Unrestricted)
        .map(|(n, _)| n)
        .collect();
    if !unrestricted.is_empty() {
        warn!(?unrestricted, "unrestricted variables are treated as non-negative by the simplex");
    }

    let problem_vars = program.variable_names();
    let mut variables = Vec::with_capacity(problem_vars.len() + 2);
    variables.push(program.objective.variable.clone());
    variables.extend(problem_vars.iter().cloned());
    variables.push(RHS.to_string());

    let mut rows = Vec::with_capacity(program.constraints.len() + 1);

    let mut objective_row = vec![Coefficient::one()];
    objective_row.extend(program.objective.expression.dense(&problem_vars).into_iter().map(|c| -c));
    objective_row.push(Coefficient::zero());
    rows.push(objective_row);

    for constraint in &program.constraints {
        let mut row = vec![Coefficient::zero()];
        row.extend(constraint.expression.dense(&problem_vars));
        row.push(constraint.rhs.clone());
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = variables.len(), "built tableau");

    Ok(Tableau {
        minmax: program.objective.minmax,
        variables,
        rows,
        objective: program.objective.clone(),
    })
}

/// Build the tableau of a standard-form program, explaining the objective row.
pub fn build_tableau(program: &Program) -> Result<ConversionStep, TableauError> {
    let tableau = tableau_from_program(program)?;
    let order = program.variable_names();
    let objective = &program.objective;

    let moved: Polynomial = std::iter::once((objective.variable.clone(), Coefficient::one()))
        .chain(objective.expression.iter().map(|(v, c)| (v.to_string(), -c)))
        .collect();
    let mut moved_order = vec![objective.variable.clone()];
    moved_order.extend(order.iter().cloned());

    let how = format!(
        "A tableau only has constants on the right, so the objective function\n  {} = {}\n\
         is rewritten as\n  {} = 0\nwhich forms the top row. Each constraint becomes one row below it.\n{}",
        objective.variable,
        format_polynomial(&objective.expression, &order),
        format_polynomial(&moved, &moved_order),
        format_tableau(&tableau)
    );

    Ok(ConversionStep::new(
        "build_tableau",
        "Represent the program with a tableau",
        how,
        State::UnknownTableau(tableau),
    ))
}
