use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::coefficient::Coefficient;
use crate::polynomial::Polynomial;
use crate::standardize::StandardizeError;

/// Optimization direction of the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MinMax {
    Max,
    Min,
}

impl fmt::Display for MinMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinMax::Max => write!(f, "max"),
            MinMax::Min => write!(f, "min"),
        }
    }
}

/// Relation between a constraint's expression and its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    /// Strictly less than (<)
    #[cfg_attr(feature = "serde", serde(rename = "<"))]
    Lt,
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Eq,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Strictly greater than (>)
    #[cfg_attr(feature = "serde", serde(rename = ">"))]
    Gt,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Eq => "=",
            Relation::Ge => ">=",
            Relation::Gt => ">",
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Relation::Lt | Relation::Gt)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Relation {
    type Err = StandardizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Relation::Lt),
            "<=" => Ok(Relation::Le),
            "=" => Ok(Relation::Eq),
            ">=" => Ok(Relation::Ge),
            ">" => Ok(Relation::Gt),
            other => Err(StandardizeError::UnknownRelation(other.to_string())),
        }
    }
}

/// Sign restriction on a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Restriction {
    NonNegative,
    Unrestricted,
}

impl Restriction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Restriction::NonNegative => "non-negative",
            Restriction::Unrestricted => "unrestricted",
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    pub minmax: MinMax,
    /// Name of the variable holding the objective value (e.g. `z`)
    pub variable: String,
    pub expression: Polynomial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    pub expression: Polynomial,
    pub relation: Relation,
    pub rhs: Coefficient,
}

/// Declared variables with their restrictions, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct VariableRestrictions {
    entries: Vec<(String, Restriction)>,
}

impl VariableRestrictions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`. Returns `false`, leaving the table untouched, if it was
    /// already declared.
    pub fn declare(&mut self, name: impl Into<String>, restriction: Restriction) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, restriction));
        true
    }

    pub fn get(&self, name: &str) -> Option<Restriction> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| *r)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Restriction)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A linear program: objective, ordered constraints and variable declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    pub objective: Objective,
    pub constraints: Vec<Constraint>,
    pub variables: VariableRestrictions,
}

impl Program {
    /// Variables appearing in the objective or any constraint expression.
    pub fn used_variables(&self) -> BTreeSet<&str> {
        std::iter::once(&self.objective.expression)
            .chain(self.constraints.iter().map(|c| &c.expression))
            .flat_map(|poly| poly.variables())
            .collect()
    }

    /// True when every constraint is an equality.
    pub fn is_standard(&self) -> bool {
        self.constraints.iter().all(|c| c.relation == Relation::Eq)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.names().map(str::to_string).collect()
    }
}
