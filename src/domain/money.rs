//! Lossless monetary amount type backed by rust_decimal.
//!
//! All commission math runs on this wrapper; floats never touch money.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal amount for commission calculations.
///
/// Backed by rust_decimal to avoid floating-point drift across
/// ratio multiplication chains. Serializes to a JSON number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Amount {
    pub fn new(value: RustDecimal) -> Self {
        Amount(value)
    }

    /// Parse from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn parse(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Amount)
    }

    /// Canonical string form (no exponent notation, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Amount(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Amount(RustDecimal::ONE)
    }

    pub fn hundred() -> Self {
        Amount(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_int(value: i64) -> Self {
        Amount(RustDecimal::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }

    /// The smaller of the two amounts.
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Round to `dp` decimal places, bankers' rounding.
    pub fn round_dp(&self, dp: u32) -> Self {
        Amount(self.0.round_dp(dp))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<RustDecimal> for Amount {
    fn from(value: RustDecimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for RustDecimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Amount {
    type Output = Amount;

    fn mul(self, rhs: Amount) -> Amount {
        Amount(self.0 * rhs.0)
    }
}

impl std::ops::Div for Amount {
    type Output = Amount;

    fn div(self, rhs: Amount) -> Amount {
        Amount(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for s in ["862.07", "0.01", "1000000", "-43.1", "0"] {
            let amount = Amount::parse(s).expect("parse failed");
            let reparsed = Amount::parse(&amount.to_canonical_string()).expect("reparse failed");
            assert_eq!(amount, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn canonical_string_strips_trailing_zeros() {
        let amount = Amount::parse("500.00").unwrap();
        assert_eq!(amount.to_canonical_string(), "500");
    }

    #[test]
    fn min_picks_smaller() {
        let a = Amount::parse("0.5").unwrap();
        let b = Amount::one();
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }

    #[test]
    fn sign_predicates() {
        assert!(Amount::parse("21.55").unwrap().is_positive());
        assert!(Amount::parse("-21.55").unwrap().is_negative());
        assert!(Amount::zero().is_zero());
        assert!(!Amount::zero().is_positive());
    }

    #[test]
    fn arithmetic() {
        let total = Amount::parse("1000").unwrap();
        let paid = Amount::parse("500").unwrap();
        let ratio = paid / total;
        assert_eq!(ratio.to_canonical_string(), "0.5");
        assert_eq!((-paid).to_canonical_string(), "-500");
        assert_eq!((total - paid), paid);
    }

    #[test]
    fn round_dp_one_decimal() {
        let ratio = Amount::parse("0.43104").unwrap();
        assert_eq!(
            (ratio * Amount::hundred()).round_dp(1).to_canonical_string(),
            "43.1"
        );
    }

    #[test]
    fn serializes_as_json_number() {
        let amount = Amount::parse("431.04").unwrap();
        let json = serde_json::to_value(amount).unwrap();
        assert!(json.is_number());
    }
}
