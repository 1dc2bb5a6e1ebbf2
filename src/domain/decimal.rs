//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Grid levels are multiples of a small fraction of the reference price, so
//! binary floats would misplace levels that sit exactly on a candle's low.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places kept for realized and unrealized PnL values.
pub const PNL_SCALE: u32 = 12;

/// Lossless decimal numeric type for prices, sizes and PnL.
///
/// Serializes to a JSON number (not string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// Accepts scientific notation (`1e-3`) as well as plain decimals.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        let trimmed = s.trim();
        RustDecimal::from_str(trimmed)
            .or_else(|_| RustDecimal::from_scientific(trimmed))
            .map(Decimal)
    }

    /// Convert a JSON float into a Decimal. Non-finite values are rejected.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        RustDecimal::from_str(&value.to_string()).ok().map(Decimal)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_usize(value: usize) -> Self {
        Decimal(RustDecimal::from(value as u64))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Largest integer not greater than the value, as a count.
    ///
    /// Negative values floor to zero; values beyond `usize` saturate.
    pub fn floor_count(&self) -> usize {
        if !self.is_positive() {
            return 0;
        }
        self.0.floor().to_usize().unwrap_or(usize::MAX)
    }

    /// Round half away from zero to `dp` decimal places.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(self.0.round_dp_with_strategy(
            dp,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// Quantize a PnL value to [`PNL_SCALE`].
    pub fn to_pnl_scale(&self) -> Self {
        self.round_dp(PNL_SCALE)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_grid_level_arithmetic_is_exact() {
        let reference = d("100");
        let threshold = d("0.005");
        let level3 = reference * (Decimal::one() - Decimal::from_usize(3) * threshold);
        assert_eq!(level3, d("98.5"));

        let drawdown = (reference - d("98.5")) / reference;
        assert_eq!((drawdown / threshold).floor_count(), 3);
    }

    #[test]
    fn test_floor_count_clamps_negative() {
        assert_eq!(d("-2.5").floor_count(), 0);
        assert_eq!(d("0").floor_count(), 0);
        assert_eq!(d("2.999").floor_count(), 2);
    }

    #[test]
    fn test_parse_scientific_and_whitespace() {
        assert_eq!(d(" 42.50 "), d("42.5"));
        assert_eq!(d("5e-3"), d("0.005"));
        assert!(Decimal::from_str_canonical("abc").is_err());
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Decimal::from_f64(98.5), Some(d("98.5")));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
        assert_eq!(Decimal::from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_pnl_scale_rounding() {
        let third = Decimal::one() / d("3");
        assert_eq!(third.to_pnl_scale(), d("0.333333333333"));
        assert_eq!(d("0.0000000000005").to_pnl_scale(), d("0.000000000001"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let json = serde_json::to_value(d("123.456")).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_sum() {
        let total: Decimal = vec![d("1.5"), d("2.25"), d("-0.75")].into_iter().sum();
        assert_eq!(total, d("3"));
    }
}
