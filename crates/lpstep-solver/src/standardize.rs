use num_traits::One;
use thiserror::Error;
use tracing::debug;

use crate::coefficient::Coefficient;
use crate::format::format_constraint;
use crate::problem::{Constraint, Program, Relation, Restriction, VariableRestrictions};
use crate::state::{ConversionStep, State};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StandardizeError {
    #[error("Cannot standardize strict '{relation}' constraint (constraint {index})")]
    UnsupportedRelation { index: usize, relation: Relation },
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),
}

/// Rewrite every inequality as an equality.
///
/// Each `<=` constraint gains a fresh non-negative slack variable named from
/// `e1, e2, ...` and each `>=` constraint a fresh non-negative excess variable
/// named from `s1, s2, ...`, both with coefficient 1. Equalities pass through.
pub fn standardize(program: &Program) -> Result<Program, StandardizeError> {
    let mut variables = program.variables.clone();
    let mut constraints = Vec::with_capacity(program.constraints.len());

    for (index, constraint) in program.constraints.iter().enumerate() {
        let prefix = match constraint.relation {
            Relation::Eq => {
                constraints.push(constraint.clone());
                continue;
            }
            Relation::Le => "e",
            Relation::Ge => "s",
            relation @ (Relation::Lt | Relation::Gt) => {
                return Err(StandardizeError::UnsupportedRelation { index, relation });
            }
        };

        let name = fresh_name(&variables, prefix, &program.objective.variable);
        variables.declare(name.clone(), Restriction::NonNegative);
        debug!(constraint = index, variable = %name, "introduced auxiliary variable");

        constraints.push(Constraint {
            expression: constraint.expression.clone().with_term(name, Coefficient::one()),
            relation: Relation::Eq,
            rhs: constraint.rhs.clone(),
        });
    }

    Ok(Program {
        objective: program.objective.clone(),
        constraints,
        variables,
    })
}

/// First of `prefix1`, `prefix2`, ... that is neither declared nor `reserved`.
fn fresh_name(variables: &VariableRestrictions, prefix: &str, reserved: &str) -> String {
    let mut i = 1;
    loop {
        let name = format!("{}{}", prefix, i);
        if name != reserved && !variables.contains(&name) {
            return name;
        }
        i += 1;
    }
}

/// Standardize `program`, explaining each rewritten constraint.
pub fn standardize_program(program: &Program) -> Result<ConversionStep, StandardizeError> {
    let standard = standardize(program)?;
    let order = standard.variable_names();

    let mut how = String::from(
        "To put a program in standard form every inequality must become an equality. \
         A non-negative slack variable is added to each <= constraint and a non-negative \
         excess variable to each >= constraint:",
    );
    for (old, new) in program.constraints.iter().zip(&standard.constraints) {
        how.push_str(&format!(
            "\n  {}  becomes  {}",
            format_constraint(old, &order),
            format_constraint(new, &order)
        ));
    }

    Ok(ConversionStep::new(
        "standardize_program",
        "Convert to standard form",
        how,
        State::StdProgram(standard),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::frac;
    use crate::problem::{MinMax, Objective};
    use pretty_assertions::assert_eq;

    fn program(constraints: Vec<(Vec<(&str, i64)>, Relation, i64)>, declared: &[&str]) -> Program {
        let mut variables = VariableRestrictions::new();
        for name in declared {
            variables.declare(*name, Restriction::NonNegative);
        }
        Program {
            objective: Objective {
                minmax: MinMax::Max,
                variable: "z".to_string(),
                expression: [("x1", frac(1, 1))].into_iter().collect(),
            },
            constraints: constraints
                .into_iter()
                .map(|(terms, relation, rhs)| Constraint {
                    expression: terms.into_iter().map(|(v, c)| (v, frac(c, 1))).collect(),
                    relation,
                    rhs: frac(rhs, 1),
                })
                .collect(),
            variables,
        }
    }

    #[test]
    fn test_slack_and_excess_variables() {
        let p = program(
            vec![
                (vec![("x1", 1), ("x2", 1)], Relation::Le, 3),
                (vec![("x1", 1)], Relation::Ge, 1),
                (vec![("x2", 1)], Relation::Eq, 2),
                (vec![("x2", 2)], Relation::Le, 8),
            ],
            &["x1", "x2"],
        );
        let std = standardize(&p).unwrap();

        assert!(std.is_standard());
        assert_eq!(std.variable_names(), vec!["x1", "x2", "e1", "s1", "e2"]);
        assert_eq!(std.constraints[0].expression.coefficient("e1"), frac(1, 1));
        assert_eq!(std.constraints[1].expression.coefficient("s1"), frac(1, 1));
        assert_eq!(std.constraints[2], p.constraints[2]);
        assert_eq!(std.constraints[3].expression.coefficient("e2"), frac(1, 1));
        assert_eq!(std.variables.get("e2"), Some(Restriction::NonNegative));
        assert_eq!(std.objective, p.objective);
    }

    #[test]
    fn test_generated_names_skip_existing() {
        let p = program(
            vec![
                (vec![("e1", 1)], Relation::Le, 3),
                (vec![("e2", 1)], Relation::Le, 3),
            ],
            &["e1", "e2"],
        );
        let std = standardize(&p).unwrap();
        assert_eq!(std.variable_names(), vec!["e1", "e2", "e3", "e4"]);
    }

    #[test]
    fn test_generated_names_skip_objective_variable() {
        let mut p = program(vec![(vec![("x1", 1)], Relation::Le, 3)], &["x1"]);
        p.objective.variable = "e1".to_string();
        let std = standardize(&p).unwrap();
        assert_eq!(std.variable_names(), vec!["x1", "e2"]);
    }

    #[test]
    fn test_input_is_untouched() {
        let p = program(vec![(vec![("x1", 1)], Relation::Le, 3)], &["x1"]);
        let before = p.clone();
        standardize_program(&p).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_strict_relations_are_rejected() {
        let p = program(
            vec![
                (vec![("x1", 1)], Relation::Le, 3),
                (vec![("x1", 1)], Relation::Gt, 1),
            ],
            &["x1"],
        );
        assert_eq!(
            standardize(&p),
            Err(StandardizeError::UnsupportedRelation { index: 1, relation: Relation::Gt })
        );
    }

    #[test]
    fn test_step_narration() {
        let p = program(vec![(vec![("x1", 1)], Relation::Le, 3)], &["x1"]);
        let step = standardize_program(&p).unwrap();
        assert_eq!(step.step_name, "standardize_program");
        assert!(step.how.contains("x1 <= 3  becomes  x1 + e1 = 3"));
        assert!(matches!(step.result, State::StdProgram(_)));
    }

    #[test]
    fn test_new_variable_count_matches_inequalities() {
        let p = program(
            vec![
                (vec![("x1", 1)], Relation::Le, 3),
                (vec![("x1", 1)], Relation::Eq, 2),
                (vec![("x1", 1)], Relation::Ge, 1),
            ],
            &["x1"],
        );
        let std = standardize(&p).unwrap();
        let inequalities = p.constraints.iter().filter(|c| c.relation != Relation::Eq).count();
        assert_eq!(std.variables.len() - p.variables.len(), inequalities);
    }
}
