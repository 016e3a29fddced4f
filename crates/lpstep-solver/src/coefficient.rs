use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid rational literal: {0}")]
    InvalidLiteral(String),
}

/// An exact fraction.
///
/// Values are always kept in lowest terms with a positive denominator, and zero
/// is always `0/1`, so structural equality is numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "String", try_from = "String"))]
pub struct Coefficient(BigRational);

impl Coefficient {
    /// Build `num/denom` in reduced form.
    pub fn new(num: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self, ArithmeticError> {
        let denom = denom.into();
        if denom.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Self(BigRational::new(num.into(), denom)))
    }

    pub fn integer(n: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(n.into()))
    }

    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiply by an integer scalar.
    pub fn scalar_mul(&self, k: i64) -> Self {
        Self(&self.0 * BigRational::from_integer(BigInt::from(k)))
    }

    pub fn recip(&self) -> Result<Self, ArithmeticError> {
        if self.0.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Self(self.0.recip()))
    }

    pub fn checked_div(&self, other: &Self) -> Result<Self, ArithmeticError> {
        Ok(self * &other.recip()?)
    }

    /// Build an exact value from the digits of a decimal literal.
    ///
    /// `whole` and `fraction` hold only ASCII digits; either may be empty but not both.
    pub fn from_decimal(negative: bool, whole: &str, fraction: &str) -> Result<Self, ArithmeticError> {
        let literal = || format!("{}{}.{}", if negative { "-" } else { "" }, whole, fraction);
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(ArithmeticError::InvalidLiteral(literal()));
        }
        let digits = format!("{}{}", whole, fraction);
        let mut num: BigInt = digits
            .parse()
            .map_err(|_| ArithmeticError::InvalidLiteral(literal()))?;
        if negative {
            num = -num;
        }
        let denom = num_traits::pow(BigInt::from(10u8), fraction.len());
        Self::new(num, denom)
    }
}

impl Zero for Coefficient {
    fn zero() -> Self {
        Self(BigRational::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl One for Coefficient {
    fn one() -> Self {
        Self(BigRational::one())
    }
}

impl Default for Coefficient {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Coefficient {
    fn from(n: i64) -> Self {
        Self::integer(n)
    }
}

impl Ord for Coefficient {
    // Denominators are positive, so cross-multiplying preserves the order.
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.numer() * other.denom();
        let rhs = other.numer() * self.denom();
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Coefficient {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add<&Coefficient> for &Coefficient {
    type Output = Coefficient;

    fn add(self, rhs: &Coefficient) -> Coefficient {
        Coefficient(&self.0 + &rhs.0)
    }
}

impl Add for Coefficient {
    type Output = Coefficient;

    fn add(self, rhs: Coefficient) -> Coefficient {
        Coefficient(self.0 + rhs.0)
    }
}

impl Sub<&Coefficient> for &Coefficient {
    type Output = Coefficient;

    fn sub(self, rhs: &Coefficient) -> Coefficient {
        Coefficient(&self.0 - &rhs.0)
    }
}

impl Sub for Coefficient {
    type Output = Coefficient;

    fn sub(self, rhs: Coefficient) -> Coefficient {
        Coefficient(self.0 - rhs.0)
    }
}

impl Mul<&Coefficient> for &Coefficient {
    type Output = Coefficient;

    fn mul(self, rhs: &Coefficient) -> Coefficient {
        Coefficient(&self.0 * &rhs.0)
    }
}

impl Mul for Coefficient {
    type Output = Coefficient;

    fn mul(self, rhs: Coefficient) -> Coefficient {
        Coefficient(self.0 * rhs.0)
    }
}

impl Neg for &Coefficient {
    type Output = Coefficient;

    fn neg(self) -> Coefficient {
        Coefficient(-&self.0)
    }
}

impl Neg for Coefficient {
    type Output = Coefficient;

    fn neg(self) -> Coefficient {
        Coefficient(-self.0)
    }
}

impl<'a> Sum<&'a Coefficient> for Coefficient {
    fn sum<I: Iterator<Item = &'a Coefficient>>(iter: I) -> Self {
        iter.fold(Coefficient::zero(), |acc, c| &acc + c)
    }
}

impl Sum for Coefficient {
    fn sum<I: Iterator<Item = Coefficient>>(iter: I) -> Self {
        iter.fold(Coefficient::zero(), |acc, c| acc + c)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

/// Accepts `7`, `-7`, `3/4`, `-3/4`, `1.5`, `.5` and `-0.25`.
impl FromStr for Coefficient {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArithmeticError::InvalidLiteral(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() || body.starts_with(['+', '-']) {
            return Err(invalid());
        }

        if let Some((num, denom)) = body.split_once('/') {
            let num: BigInt = num.parse().map_err(|_| invalid())?;
            let denom: BigInt = denom.parse().map_err(|_| invalid())?;
            if num.is_negative() || denom.is_negative() {
                return Err(invalid());
            }
            return Coefficient::new(if negative { -num } else { num }, denom);
        }

        match body.split_once('.') {
            Some((whole, fraction)) if !fraction.is_empty() => {
                Coefficient::from_decimal(negative, whole, fraction)
            }
            Some(_) => Err(invalid()),
            None => Coefficient::from_decimal(negative, body, ""),
        }
    }
}

impl From<Coefficient> for String {
    fn from(c: Coefficient) -> String {
        c.to_string()
    }
}

impl TryFrom<String> for Coefficient {
    type Error = ArithmeticError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
pub(crate) fn frac(num: i64, denom: i64) -> Coefficient {
    Coefficient::new(num, denom).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_reduces_and_normalizes_sign() {
        let c = Coefficient::new(6, -4).unwrap();
        assert_eq!(c.numer(), &BigInt::from(-3));
        assert_eq!(c.denom(), &BigInt::from(2));

        let zero = Coefficient::new(0, -7).unwrap();
        assert_eq!(zero, Coefficient::zero());
        assert_eq!(zero.denom(), &BigInt::from(1));
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(Coefficient::new(1, 0), Err(ArithmeticError::DivisionByZero));
        assert_eq!(Coefficient::zero().recip(), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(&frac(1, 2) + &frac(1, 3), frac(5, 6));
        assert_eq!(&frac(1, 2) - &frac(3, 4), frac(-1, 4));
        assert_eq!(&frac(2, 3) * &frac(9, 4), frac(3, 2));
        assert_eq!(frac(3, 7).scalar_mul(-14), frac(-6, 1));
        assert_eq!(frac(-2, 5).recip().unwrap(), frac(-5, 2));
        assert_eq!(-frac(2, 5), frac(-2, 5));
        assert_eq!(frac(3, 4).checked_div(&frac(3, 8)).unwrap(), frac(2, 1));
    }

    #[test]
    fn test_compare_across_signs() {
        assert!(frac(-1, 2) < Coefficient::zero());
        assert!(frac(1, 3) < frac(1, 2));
        assert!(frac(-1, 3) > frac(-1, 2));
        assert_eq!(frac(2, 4).cmp(&frac(1, 2)), Ordering::Equal);
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!("7".parse::<Coefficient>().unwrap(), frac(7, 1));
        assert_eq!("-3/4".parse::<Coefficient>().unwrap(), frac(-3, 4));
        assert_eq!("1.5".parse::<Coefficient>().unwrap(), frac(3, 2));
        assert_eq!(".5".parse::<Coefficient>().unwrap(), frac(1, 2));
        assert_eq!("-0.25".parse::<Coefficient>().unwrap(), frac(-1, 4));
        assert_eq!("0.1".parse::<Coefficient>().unwrap(), frac(1, 10));
        assert_eq!("4/0".parse::<Coefficient>(), Err(ArithmeticError::DivisionByZero));
        assert!("1.".parse::<Coefficient>().is_err());
        assert!("--1".parse::<Coefficient>().is_err());
        assert!("3/-4".parse::<Coefficient>().is_err());
        assert!("x".parse::<Coefficient>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(frac(6, 3).to_string(), "2");
        assert_eq!(frac(-3, 6).to_string(), "-1/2");
        assert_eq!(Coefficient::zero().to_string(), "0");
    }

    fn coefficient() -> impl Strategy<Value = Coefficient> {
        (-60i64..60, 1i64..24).prop_map(|(n, d)| frac(n, d))
    }

    proptest! {
        #[test]
        fn reduction_is_idempotent(n in -500i64..500, d in prop::sample::select(vec![-12i64, -5, -1, 1, 2, 9, 30])) {
            let once = Coefficient::new(n, d).unwrap();
            let twice = Coefficient::new(once.numer().clone(), once.denom().clone()).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.denom().is_positive());
            prop_assert!(num_integer::Integer::gcd(once.numer(), once.denom()).is_one());
        }

        #[test]
        fn add_and_mul_commute(a in coefficient(), b in coefficient()) {
            prop_assert_eq!(&a + &b, &b + &a);
            prop_assert_eq!(&a * &b, &b * &a);
        }

        #[test]
        fn add_and_mul_associate(a in coefficient(), b in coefficient(), c in coefficient()) {
            prop_assert_eq!(&(&a + &b) + &c, &a + &(&b + &c));
            prop_assert_eq!(&(&a * &b) * &c, &a * &(&b * &c));
        }

        #[test]
        fn inverses(a in coefficient()) {
            prop_assert_eq!(&a + &(-&a), Coefficient::zero());
            if !a.is_zero() {
                prop_assert_eq!(&a * &a.recip().unwrap(), Coefficient::one());
            }
        }

        #[test]
        fn display_parses_back(a in coefficient()) {
            prop_assert_eq!(a.to_string().parse::<Coefficient>().unwrap(), a);
        }
    }
}
