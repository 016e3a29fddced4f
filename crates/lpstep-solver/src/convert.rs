//! The conversion graph: named transformations between state kinds and the
//! engine that drives a state forward along them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::problem::Program;
use crate::simplex::{
    find_basic_feasible_solution, find_leaving_variable, pick_entering_variable, pivot,
    simplex_iteration, EnteringTableau, LeavingTableau, PivotRule, PivotedTableau, SimplexError,
};
use crate::solution::read_solution;
use crate::standardize::{standardize_program, StandardizeError};
use crate::state::{ConversionStep, State, StateKind};
use crate::tableau::{build_tableau, Tableau, TableauError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("No conversion path from {from} to {to}")]
    NoPathFound { from: StateKind, to: StateKind },
    #[error("Target not reached within {limit} steps")]
    IterationLimitExceeded { limit: usize },
    #[error("Conversion expects a {expected} state, got {found}")]
    StateMismatch { expected: StateKind, found: StateKind },
    #[error(transparent)]
    Standardize(#[from] StandardizeError),
    #[error(transparent)]
    Tableau(#[from] TableauError),
    #[error(transparent)]
    Simplex(#[from] SimplexError),
}

type ApplyFn = fn(&Converter, &State) -> Result<ConversionStep, ChainError>;

/// A named edge of the conversion graph.
#[derive(Clone, Copy)]
pub struct Conversion {
    pub from: StateKind,
    /// Kind the conversion normally produces. Some conversions may also end in
    /// a different kind (e.g. `Optimal` instead of `Entering`).
    pub to: StateKind,
    pub name: &'static str,
    apply: ApplyFn,
}

impl Conversion {
    pub fn apply(&self, converter: &Converter, state: &State) -> Result<ConversionStep, ChainError> {
        (self.apply)(converter, state)
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("name", &self.name)
            .finish()
    }
}

/// Build a [`Conversion`] that unwraps the payload of a `$from` state and hands
/// it to `$apply`.
macro_rules! conversion {
    ($from:ident => $to:ident, $name:literal, $apply:expr) => {
        Conversion {
            from: StateKind::$from,
            to: StateKind::$to,
            name: $name,
            apply: |converter, state| match state {
                State::$from(payload) => Ok(($apply)(converter, payload)?),
                other => Err(ChainError::StateMismatch {
                    expected: StateKind::$from,
                    found: other.kind(),
                }),
            },
        }
    };
}

fn registry() -> Vec<Conversion> {
    vec![
        conversion!(Program => StdProgram, "standardize_program", |_: &Converter, p: &Program| {
            standardize_program(p)
        }),
        conversion!(StdProgram => UnknownTableau, "build_tableau", |_: &Converter, p: &Program| {
            build_tableau(p)
        }),
        conversion!(
            UnknownTableau => BasicFeasible,
            "find_basic_feasible_solution",
            |_: &Converter, t: &Tableau| find_basic_feasible_solution(t)
        ),
        conversion!(BasicFeasible => Optimal, "simplex_iteration", |c: &Converter, t: &Tableau| {
            simplex_iteration(c, t)
        }),
        conversion!(
            BasicFeasible => Entering,
            "pick_entering_variable",
            |c: &Converter, t: &Tableau| Ok::<_, ChainError>(pick_entering_variable(t, c.pivot_rule))
        ),
        conversion!(
            Entering => Leaving,
            "find_leaving_variable",
            |c: &Converter, e: &EnteringTableau| find_leaving_variable(e, c.pivot_rule)
        ),
        conversion!(Leaving => PivotedNext, "pivot", |_: &Converter, l: &LeavingTableau| pivot(l)),
        conversion!(
            PivotedNext => BasicFeasible,
            "continue_from_pivot",
            |_: &Converter, p: &PivotedTableau| Ok::<_, ChainError>(ConversionStep::new(
                "continue_from_pivot",
                "Continue from the pivoted tableau",
                "The pivot keeps every rhs non-negative, so the new tableau is again basic feasible.",
                State::BasicFeasible(p.tableau.clone()),
            ))
        ),
        conversion!(Optimal => Solution, "read_solution", |_: &Converter, t: &Tableau| {
            read_solution(t)
        }),
    ]
}

/// Drives states through the conversion graph.
///
/// # Example
///
/// ```
/// use lpstep_solver::{
///     ChainError, Coefficient, Constraint, Converter, MinMax, Objective, PivotRule, Polynomial,
///     Program, Relation, Restriction, State, StateKind, VariableRestrictions,
/// };
///
/// # fn main() -> Result<(), ChainError> {
/// let mut variables = VariableRestrictions::new();
/// variables.declare("x1", Restriction::NonNegative);
/// let program = Program {
///     objective: Objective {
///         minmax: MinMax::Max,
///         variable: "z".to_string(),
///         expression: Polynomial::new().with_term("x1", Coefficient::from(2)),
///     },
///     constraints: vec![Constraint {
///         expression: Polynomial::new().with_term("x1", Coefficient::from(1)),
///         relation: Relation::Le,
///         rhs: Coefficient::from(4),
///     }],
///     variables,
/// };
///
/// let steps = Converter::new()
///     .with_pivot_rule(PivotRule::Bland)
///     .convert_to(State::Program(program), StateKind::Solution)?;
/// let solution = steps.last().and_then(|step| step.result.solution());
/// assert_eq!(solution.map(|s| s.objective_value.clone()), Some(Coefficient::from(8)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    max_steps: usize,
    pivot_rule: PivotRule,
    conversions: Vec<Conversion>,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            max_steps: 100,
            pivot_rule: PivotRule::default(),
            conversions: registry(),
        }
    }
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on the steps one `convert_to` call may apply.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_pivot_rule(mut self, rule: PivotRule) -> Self {
        self.pivot_rule = rule;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn pivot_rule(&self) -> PivotRule {
        self.pivot_rule
    }

    /// Every registered conversion, in registration order.
    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    /// Kinds reachable from `from` through one or more conversions.
    pub fn reachable_from(&self, from: StateKind) -> BTreeSet<StateKind> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(kind) = queue.pop_front() {
            for c in self.conversions.iter().filter(|c| c.from == kind) {
                if seen.insert(c.to) {
                    queue.push_back(c.to);
                }
            }
        }
        seen
    }

    /// Names of the shortest sequence of conversions from `from` to `to`.
    pub fn find_conversion_chain(
        &self,
        from: StateKind,
        to: StateKind,
    ) -> Result<Vec<&'static str>, ChainError> {
        Ok(self.plan(from, to)?.into_iter().map(|c| c.name).collect())
    }

    /// Breadth-first search over the registry. Ties between equally short
    /// paths go to the conversion registered first.
    fn plan(&self, from: StateKind, to: StateKind) -> Result<Vec<&Conversion>, ChainError> {
        let mut via: BTreeMap<StateKind, &Conversion> = BTreeMap::new();
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(kind) = queue.pop_front() {
            if kind == to {
                let mut path = Vec::new();
                let mut current = to;
                while let Some(c) = via.get(&current).filter(|_| current != from) {
                    path.push(*c);
                    current = c.from;
                }
                path.reverse();
                return Ok(path);
            }
            for c in self.conversions.iter().filter(|c| c.from == kind) {
                if seen.insert(c.to) {
                    via.insert(c.to, c);
                    queue.push_back(c.to);
                }
            }
        }

        Err(ChainError::NoPathFound { from, to })
    }

    /// Drive `state` forward until it becomes a `target`.
    pub fn convert_to(&self, state: State, target: StateKind) -> Result<Vec<ConversionStep>, ChainError> {
        self.convert_to_any(state, &[target])
    }

    /// Drive `state` forward until it reaches any of `targets` or a terminal
    /// state, returning every step taken.
    ///
    /// The path is planned toward the first target and re-planned after each
    /// step, since a conversion may land on a different kind than it names.
    pub fn convert_to_any(
        &self,
        state: State,
        targets: &[StateKind],
    ) -> Result<Vec<ConversionStep>, ChainError> {
        let Some(&goal) = targets.first() else {
            return Ok(Vec::new());
        };

        let mut steps: Vec<ConversionStep> = Vec::new();
        let mut current = state;
        loop {
            let kind = current.kind();
            if targets.contains(&kind) || kind.is_terminal() {
                return Ok(steps);
            }
            if steps.len() >= self.max_steps {
                return Err(ChainError::IterationLimitExceeded { limit: self.max_steps });
            }

            let chain = self.plan(kind, goal)?;
            let conversion = chain
                .first()
                .ok_or(ChainError::NoPathFound { from: kind, to: goal })?;
            let step = conversion.apply(self, &current)?;
            debug!(
                conversion = conversion.name,
                from = %kind,
                to = %step.kind(),
                "applied conversion"
            );

            current = step.result.clone();
            steps.push(step);
        }
    }

    /// Run the simplex method on a freshly built tableau, ending in a
    /// `Solution` (or `Unbounded`) step.
    pub fn run_simplex(&self, tableau: &Tableau) -> Result<Vec<ConversionStep>, ChainError> {
        self.convert_to(State::UnknownTableau(tableau.clone()), StateKind::Solution)
    }
}

/// [`Converter::run_simplex`] with default settings.
pub fn run_simplex(tableau: &Tableau) -> Result<Vec<ConversionStep>, ChainError> {
    Converter::new().run_simplex(tableau)
}

/// [`Converter::convert_to`] with default settings.
pub fn convert_to(state: State, target: StateKind) -> Result<Vec<ConversionStep>, ChainError> {
    Converter::new().convert_to(state, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::frac;
    use crate::problem::{Constraint, MinMax, Objective, Relation, Restriction, VariableRestrictions};
    use crate::tableau::tableau_from_program;
    use pretty_assertions::assert_eq;

    fn program(
        minmax: MinMax,
        objective: Vec<(&str, i64)>,
        constraints: Vec<(Vec<(&str, i64)>, Relation, i64)>,
    ) -> Program {
        let mut variables = VariableRestrictions::new();
        for (name, _) in objective.iter().chain(constraints.iter().flat_map(|(t, _, _)| t)) {
            variables.declare(*name, Restriction::NonNegative);
        }
        Program {
            objective: Objective {
                minmax,
                variable: "z".to_string(),
                expression: objective.into_iter().map(|(v, c)| (v, frac(c, 1))).collect(),
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

    fn worked_example() -> Program {
        program(
            MinMax::Max,
            vec![("x1", 1), ("x2", 2)],
            vec![(vec![("x1", 1), ("x2", 1)], Relation::Le, 3)],
        )
    }

    fn kinds(steps: &[ConversionStep]) -> Vec<StateKind> {
        steps.iter().map(ConversionStep::kind).collect()
    }

    #[test]
    fn test_worked_example_chain() {
        let steps = convert_to(State::Program(worked_example()), StateKind::Solution).unwrap();
        assert_eq!(
            kinds(&steps),
            vec![
                StateKind::StdProgram,
                StateKind::UnknownTableau,
                StateKind::BasicFeasible,
                StateKind::BasicFeasible,
                StateKind::Optimal,
                StateKind::Solution,
            ]
        );

        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.value("x1"), Some(&frac(0, 1)));
        assert_eq!(solution.value("x2"), Some(&frac(3, 1)));
        assert_eq!(solution.objective_value, frac(6, 1));
    }

    #[test]
    fn test_bland_rule_reaches_same_optimum() {
        let steps = Converter::new()
            .with_pivot_rule(PivotRule::Bland)
            .convert_to(State::Program(worked_example()), StateKind::Solution)
            .unwrap();
        let basic_feasible = steps.iter().filter(|s| s.kind() == StateKind::BasicFeasible).count();
        // One from the basic-feasible check, two from iterations.
        assert_eq!(basic_feasible, 3);
        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.objective_value, frac(6, 1));
        assert_eq!(solution.value("x2"), Some(&frac(3, 1)));
    }

    #[test]
    fn test_stops_at_intermediate_target() {
        let steps = convert_to(State::Program(worked_example()), StateKind::UnknownTableau).unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(names, vec!["standardize_program", "build_tableau"]);
    }

    #[test]
    fn test_already_at_target() {
        let state = State::Program(worked_example());
        assert!(convert_to(state, StateKind::Program).unwrap().is_empty());
    }

    #[test]
    fn test_minimization() {
        // min z = x1 - x2 with x2 <= 4 and x1 + x2 <= 6
        let p = program(
            MinMax::Min,
            vec![("x1", 1), ("x2", -1)],
            vec![
                (vec![("x2", 1)], Relation::Le, 4),
                (vec![("x1", 1), ("x2", 1)], Relation::Le, 6),
            ],
        );
        let steps = convert_to(State::Program(p), StateKind::Solution).unwrap();
        let solution = steps.last().and_then(|s| s.result.solution()).unwrap();
        assert_eq!(solution.value("x2"), Some(&frac(4, 1)));
        assert_eq!(solution.objective_value, frac(-4, 1));
    }

    #[test]
    fn test_unbounded_stops_the_chain() {
        let p = program(
            MinMax::Max,
            vec![("x1", 1)],
            vec![(vec![("x1", 1), ("x2", -1)], Relation::Le, 1)],
        );
        let steps = convert_to(State::Program(p), StateKind::Solution).unwrap();
        let last = steps.last().unwrap();
        assert_eq!(last.kind(), StateKind::Unbounded);
        let State::Unbounded(e) = &last.result else {
            panic!("expected unbounded state");
        };
        assert_eq!(e.entering_var, "x2");
    }

    #[test]
    fn test_iteration_limit() {
        let result = Converter::new()
            .with_max_steps(3)
            .convert_to(State::Program(worked_example()), StateKind::Solution);
        assert_eq!(result, Err(ChainError::IterationLimitExceeded { limit: 3 }));
    }

    #[test]
    fn test_chain_planning() {
        let converter = Converter::new();
        assert_eq!(
            converter
                .find_conversion_chain(StateKind::Program, StateKind::Solution)
                .unwrap(),
            vec![
                "standardize_program",
                "build_tableau",
                "find_basic_feasible_solution",
                "simplex_iteration",
                "read_solution",
            ]
        );
        assert_eq!(
            converter
                .find_conversion_chain(StateKind::BasicFeasible, StateKind::PivotedNext)
                .unwrap(),
            vec!["pick_entering_variable", "find_leaving_variable", "pivot"]
        );
        assert!(converter
            .find_conversion_chain(StateKind::Optimal, StateKind::Optimal)
            .unwrap()
            .is_empty());
        assert_eq!(
            converter.find_conversion_chain(StateKind::Solution, StateKind::Program),
            Err(ChainError::NoPathFound { from: StateKind::Solution, to: StateKind::Program })
        );
    }

    #[test]
    fn test_terminal_kinds_have_no_outgoing_conversions() {
        let converter = Converter::new();
        for kind in [StateKind::Unbounded, StateKind::Solution] {
            assert!(converter.reachable_from(kind).is_empty());
        }
        assert!(converter.reachable_from(StateKind::Program).contains(&StateKind::Solution));
        assert!(!converter.reachable_from(StateKind::Optimal).contains(&StateKind::Unbounded));
    }

    #[test]
    fn test_state_mismatch() {
        let converter = Converter::new();
        let standardize = converter
            .conversions()
            .iter()
            .find(|c| c.name == "standardize_program")
            .unwrap();
        let tableau = tableau_from_program(&crate::standardize::standardize(&worked_example()).unwrap())
            .unwrap();
        assert_eq!(
            standardize.apply(&converter, &State::Optimal(tableau)).unwrap_err(),
            ChainError::StateMismatch { expected: StateKind::Program, found: StateKind::Optimal }
        );
    }

    #[test]
    fn test_callback_errors_propagate() {
        let p = program(MinMax::Max, vec![("x1", 1)], vec![(vec![("x1", 1)], Relation::Lt, 3)]);
        assert_eq!(
            convert_to(State::Program(p), StateKind::Solution),
            Err(ChainError::Standardize(StandardizeError::UnsupportedRelation {
                index: 0,
                relation: Relation::Lt,
            }))
        );
    }

    #[test]
    fn test_run_simplex() {
        let standard = crate::standardize::standardize(&worked_example()).unwrap();
        let steps = run_simplex(&tableau_from_program(&standard).unwrap()).unwrap();
        assert_eq!(steps.first().map(|s| s.step_name.as_str()), Some("find_basic_feasible_solution"));
        assert_eq!(steps.last().map(ConversionStep::kind), Some(StateKind::Solution));
    }
}
