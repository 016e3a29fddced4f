//! Typed states of the solving pipeline and the step records linking them.

use std::fmt;

use crate::problem::Program;
use crate::simplex::{EnteringTableau, LeavingTableau, PivotedTableau};
use crate::solution::Solution;
use crate::tableau::Tableau;

/// The kind of a pipeline state, used to route conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StateKind {
    Program,
    StdProgram,
    UnknownTableau,
    BasicFeasible,
    Entering,
    Leaving,
    PivotedNext,
    Optimal,
    Unbounded,
    Solution,
}

impl StateKind {
    pub const ALL: [StateKind; 10] = [
        StateKind::Program,
        StateKind::StdProgram,
        StateKind::UnknownTableau,
        StateKind::BasicFeasible,
        StateKind::Entering,
        StateKind::Leaving,
        StateKind::PivotedNext,
        StateKind::Optimal,
        StateKind::Unbounded,
        StateKind::Solution,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Program => "program",
            StateKind::StdProgram => "std-program",
            StateKind::UnknownTableau => "unknown-tableau",
            StateKind::BasicFeasible => "basic-feasible",
            StateKind::Entering => "entering",
            StateKind::Leaving => "leaving",
            StateKind::PivotedNext => "pivoted-next",
            StateKind::Optimal => "optimal",
            StateKind::Unbounded => "unbounded",
            StateKind::Solution => "solution",
        }
    }

    /// States the pipeline cannot leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StateKind::Unbounded | StateKind::Solution)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pipeline state together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "kebab-case"))]
pub enum State {
    Program(Program),
    /// A program whose constraints are all equalities
    StdProgram(Program),
    /// A tableau not yet checked for a basic feasible solution
    UnknownTableau(Tableau),
    BasicFeasible(Tableau),
    Entering(EnteringTableau),
    Leaving(LeavingTableau),
    PivotedNext(PivotedTableau),
    Optimal(Tableau),
    /// The entering variable can grow without bound
    Unbounded(EnteringTableau),
    Solution(Solution),
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            State::Program(_) => StateKind::Program,
            State::StdProgram(_) => StateKind::StdProgram,
            State::UnknownTableau(_) => StateKind::UnknownTableau,
            State::BasicFeasible(_) => StateKind::BasicFeasible,
            State::Entering(_) => StateKind::Entering,
            State::Leaving(_) => StateKind::Leaving,
            State::PivotedNext(_) => StateKind::PivotedNext,
            State::Optimal(_) => StateKind::Optimal,
            State::Unbounded(_) => StateKind::Unbounded,
            State::Solution(_) => StateKind::Solution,
        }
    }

    pub fn program(&self) -> Option<&Program> {
        match self {
            State::Program(p) | State::StdProgram(p) => Some(p),
            _ => None,
        }
    }

    /// The tableau carried by any tableau-shaped state.
    pub fn tableau(&self) -> Option<&Tableau> {
        match self {
            State::UnknownTableau(t) | State::BasicFeasible(t) | State::Optimal(t) => Some(t),
            State::Entering(e) | State::Unbounded(e) => Some(&e.tableau),
            State::Leaving(l) => Some(&l.tableau),
            State::PivotedNext(p) => Some(&p.tableau),
            State::Program(_) | State::StdProgram(_) | State::Solution(_) => None,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            State::Solution(s) => Some(s),
            _ => None,
        }
    }
}

/// One applied transformation: what was done, how, and the state it produced.
///
/// Each step owns its result, so every intermediate state stays inspectable
/// after later steps have run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionStep {
    /// Name of the transformation that produced this step
    pub step_name: String,
    /// One-line description of the transformation
    pub what: String,
    /// Explanation of how the result was obtained
    pub how: String,
    pub result: State,
    /// Finer-grained steps this step is made of (one simplex iteration)
    pub substeps: Vec<ConversionStep>,
}

impl ConversionStep {
    pub fn new(step_name: &str, what: impl Into<String>, how: impl Into<String>, result: State) -> Self {
        Self {
            step_name: step_name.to_string(),
            what: what.into(),
            how: how.into(),
            result,
            substeps: Vec::new(),
        }
    }

    pub fn with_substeps(mut self, substeps: Vec<ConversionStep>) -> Self {
        self.substeps = substeps;
        self
    }

    pub fn kind(&self) -> StateKind {
        self.result.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<_> = StateKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), StateKind::ALL.len());
    }

    #[test]
    fn test_terminal_kinds() {
        let terminal: Vec<_> = StateKind::ALL.into_iter().filter(|k| k.is_terminal()).collect();
        assert_eq!(terminal, vec![StateKind::Unbounded, StateKind::Solution]);
    }
}
