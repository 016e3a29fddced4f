use std::collections::BTreeMap;

use num_traits::Zero;

use crate::coefficient::Coefficient;

/// A linear expression: variable name to coefficient.
///
/// Absent variables have coefficient zero. Zero coefficients are never stored,
/// so two polynomials are equal exactly when they denote the same expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Polynomial {
    terms: BTreeMap<String, Coefficient>,
}

impl Polynomial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coefficient of `var`, dropping the term when it is zero.
    /// Returns the previous coefficient, if any.
    pub fn insert(&mut self, var: impl Into<String>, coefficient: Coefficient) -> Option<Coefficient> {
        let var = var.into();
        if coefficient.is_zero() {
            self.terms.remove(&var)
        } else {
            self.terms.insert(var, coefficient)
        }
    }

    pub fn with_term(mut self, var: impl Into<String>, coefficient: Coefficient) -> Self {
        self.insert(var, coefficient);
        self
    }

    pub fn get(&self, var: &str) -> Option<&Coefficient> {
        self.terms.get(var)
    }

    /// Coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: &str) -> Coefficient {
        self.terms.get(var).cloned().unwrap_or_else(Coefficient::zero)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.terms.contains_key(var)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Terms in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coefficient)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Terms following `order`, skipping variables absent from the polynomial.
    pub fn iter_in<'a, S: AsRef<str>>(
        &'a self,
        order: &'a [S],
    ) -> impl Iterator<Item = (&'a str, &'a Coefficient)> + 'a {
        order.iter().filter_map(move |var| {
            let var = var.as_ref();
            self.terms.get(var).map(|c| (var, c))
        })
    }

    /// Coefficients for every variable in `order`, zero where absent.
    pub fn dense<S: AsRef<str>>(&self, order: &[S]) -> Vec<Coefficient> {
        order.iter().map(|var| self.coefficient(var.as_ref())).collect()
    }

    pub fn scale(&self, factor: &Coefficient) -> Self {
        let mut result = Self::new();
        for (var, c) in self.iter() {
            result.insert(var, c * factor);
        }
        result
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (var, c) in other.iter() {
            let sum = &result.coefficient(var) + c;
            result.insert(var, sum);
        }
        result
    }

    /// Substitute values for the variables; missing values count as zero.
    pub fn evaluate<F>(&self, value: F) -> Coefficient
    where
        F: Fn(&str) -> Coefficient,
    {
        self.iter().map(|(var, c)| c * &value(var)).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, Coefficient)> for Polynomial {
    fn from_iter<I: IntoIterator<Item = (S, Coefficient)>>(iter: I) -> Self {
        let mut poly = Polynomial::new();
        for (var, c) in iter {
            poly.insert(var, c);
        }
        poly
    }
}
