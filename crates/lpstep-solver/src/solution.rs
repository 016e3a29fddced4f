use num_traits::Zero;
use tracing::debug;

use crate::coefficient::Coefficient;
use crate::format::format_solution;
use crate::simplex::SimplexError;
use crate::state::{ConversionStep, State};
use crate::tableau::Tableau;

/// Values read off an optimal tableau
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Name of the objective variable (e.g. `z`)
    pub objective_var: String,
    pub objective_value: Coefficient,
    /// Value of every tableau variable, slack and excess included, in column order
    pub values: Vec<(String, Coefficient)>,
    /// Basic variable of each constraint row
    pub basis: Vec<String>,
}

impl Solution {
    /// Value of a variable, or of the objective variable itself.
    pub fn value(&self, name: &str) -> Option<&Coefficient> {
        if name == self.objective_var {
            return Some(&self.objective_value);
        }
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_basic(&self, name: &str) -> bool {
        self.basis.iter().any(|b| b == name)
    }
}

/// Extract the solution of an optimal tableau.
///
/// Each basic variable takes its row's rhs and every other variable is 0. The
/// objective value is recomputed from the original objective expression and
/// must match row 0's rhs.
pub fn solution_from_tableau(tableau: &Tableau) -> Result<Solution, SimplexError> {
    let mut basis = Vec::with_capacity(tableau.num_constraints());
    let mut values = Vec::new();

    for row in 1..tableau.rows.len() {
        let name = tableau
            .basic_variable(row)
            .ok_or(SimplexError::NoBasicVariable { row })?;
        basis.push(name.to_string());
    }

    for (_, name) in tableau.decision_columns() {
        let value = match basis.iter().position(|b| b == name) {
            Some(i) => tableau
                .rhs(i + 1)
                .cloned()
                .ok_or_else(|| SimplexError::MissingColumn(name.to_string()))?,
            None => Coefficient::zero(),
        };
        values.push((name.to_string(), value));
    }

    let computed = tableau.objective.expression.evaluate(|var| {
        values
            .iter()
            .find(|(n, _)| n == var)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    });
    let recorded = tableau.rhs(0).cloned().unwrap_or_default();
    if computed != recorded {
        return Err(SimplexError::InconsistentObjective { computed, tableau: recorded });
    }

    debug!(objective = %computed, "read solution");

    Ok(Solution {
        objective_var: tableau.objective_variable().to_string(),
        objective_value: computed,
        values,
        basis,
    })
}

/// Read the solution of an optimal tableau as a step.
pub fn read_solution(tableau: &Tableau) -> Result<ConversionStep, SimplexError> {
    let solution = solution_from_tableau(tableau)?;
    let how = format!(
        "Each basic variable ({}) equals the rhs of its row; every other variable is 0. \
         Substituting into the objective gives the optimal value:\n{}",
        solution.basis.join(", "),
        format_solution(&solution)
    );
    Ok(ConversionStep::new(
        "read_solution",
        "Read the solution from the optimal tableau",
        how,
        State::Solution(solution),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::frac;
    use crate::problem::{MinMax, Objective};
    use pretty_assertions::assert_eq;

    fn optimal(rhs0: i64) -> Tableau {
        Tableau {
            minmax: MinMax::Max,
            variables: ["z", "x1", "x2", "e1", "rhs"].iter().map(|v| v.to_string()).collect(),
            rows: vec![
                vec![frac(1, 1), frac(1, 1), frac(0, 1), frac(2, 1), frac(rhs0, 1)],
                vec![frac(0, 1), frac(1, 1), frac(1, 1), frac(1, 1), frac(3, 1)],
            ],
            objective: Objective {
                minmax: MinMax::Max,
                variable: "z".to_string(),
                expression: [("x1", frac(1, 1)), ("x2", frac(2, 1))].into_iter().collect(),
            },
        }
    }

    #[test]
    fn test_reads_basic_and_non_basic_values() {
        let solution = solution_from_tableau(&optimal(6)).unwrap();
        assert_eq!(solution.basis, vec!["x2"]);
        assert_eq!(solution.value("x1"), Some(&frac(0, 1)));
        assert_eq!(solution.value("x2"), Some(&frac(3, 1)));
        assert_eq!(solution.value("e1"), Some(&frac(0, 1)));
        assert_eq!(solution.value("z"), Some(&frac(6, 1)));
        assert_eq!(solution.value("y"), None);
        assert!(solution.is_basic("x2"));
    }

    #[test]
    fn test_objective_mismatch_is_reported() {
        assert_eq!(
            solution_from_tableau(&optimal(7)),
            Err(SimplexError::InconsistentObjective { computed: frac(6, 1), tableau: frac(7, 1) })
        );
    }

    #[test]
    fn test_step_narration() {
        let step = read_solution(&optimal(6)).unwrap();
        assert_eq!(step.step_name, "read_solution");
        assert!(step.how.contains("x2 = 3"));
        assert!(step.how.contains("z = 6"));
    }
}
