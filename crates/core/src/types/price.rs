//! Type-safe price representation using decimal arithmetic.
//!
//! All arithmetic happens on exact decimals. Rounding to cents happens only
//! when a price is displayed, so `12.99 * 2 + 10.99` is exactly `36.97`
//! and an 8% tax line keeps its extra digits until it is rendered.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A US-dollar amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount in dollars.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The exact amount in dollars.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// This price scaled by a rate, e.g. `0.08` for an 8% tax.
    #[must_use]
    pub fn scaled(self, rate: Decimal) -> Self {
        Self(self.0 * rate)
    }

    /// The amount rounded half away from zero to whole cents.
    #[must_use]
    pub fn rounded(self) -> Decimal {
        let mut cents = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        cents.rescale(2);
        cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.rounded())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1299).amount(), Decimal::new(1299, 2));
        assert_eq!(Price::from_cents(-5).amount(), Decimal::new(-5, 2));
    }

    #[test]
    fn test_sum_is_exact() {
        let total: Price = [
            Price::from_cents(1299).times(2),
            Price::from_cents(1099).times(1),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.amount(), Decimal::new(3697, 2));
    }

    #[test]
    fn test_display_pads_and_rounds() {
        assert_eq!(Price::from_cents(1000).to_string(), "$10.00");
        assert_eq!(Price::new(Decimal::from(5)).to_string(), "$5.00");
        // 36.97 * 0.08 = 2.9576
        let tax = Price::from_cents(3697).scaled(Decimal::new(8, 2));
        assert_eq!(tax.amount(), Decimal::new(29576, 4));
        assert_eq!(tax.to_string(), "$2.96");
        assert_eq!(Price::new(Decimal::new(1005, 3)).to_string(), "$1.01");
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Price = core::iter::empty().sum();
        assert_eq!(total, Price::ZERO);
    }
}
