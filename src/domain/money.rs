//! Fixed-point money amounts backed by rust_decimal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by generated balances and prices.
pub const MONEY_SCALE: u32 = 2;

/// A decimal money amount (cash balance, unit price, trade amount).
///
/// Arithmetic is exact; `shares × price` never drifts beyond the price's own
/// precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(Decimal);

impl Money {
    /// Wrap a decimal as-is.
    pub fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Build an amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MONEY_SCALE))
    }

    /// Total value of `shares` units at this price.
    pub fn times(&self, shares: i32) -> Money {
        Money(self.0 * Decimal::from(shares))
    }

    /// Get the underlying decimal.
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_keeps_two_digits() {
        let m = Money::from_cents(123_456);
        assert_eq!(m.inner().scale(), 2);
        assert_eq!(m.to_string(), "1234.56");
    }

    #[test]
    fn test_times_is_exact() {
        let price = Money::from_cents(99_999);
        let amount = price.times(4_321);
        assert_eq!(amount, Money::from_str("4320956.79").unwrap());
    }

    #[test]
    fn test_display_pads_fraction() {
        let m = Money::from_str("1000").unwrap();
        assert_eq!(m.to_string(), "1000.00");
    }

    #[test]
    fn test_json_serializes_as_string() {
        let m = Money::from_cents(1050);
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json, serde_json::json!("10.50"));
    }
}
