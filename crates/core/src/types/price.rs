//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts are in the store's single currency and are displayed with
//! two decimals (e.g. `$19.99`).

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative monetary amount.
///
/// Serializes as a decimal string (`"19.99"`) so that amounts survive JSON
/// round trips without float rounding. Decoding goes through [`Price::new`],
/// so a negative amount never deserializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from(cents) / Decimal::ONE_HUNDRED)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity (line total).
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// A percentage of this amount, rounded half-up to cents.
    #[must_use]
    pub fn percent(self, rate: Decimal) -> Self {
        Self(
            (self.0 * rate / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "${rounded:.2}")
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

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(dec("-0.01")),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::new(dec("25")).unwrap().to_string(), "$25.00");
        assert_eq!(Price::new(dec("699.99")).unwrap().to_string(), "$699.99");
        assert_eq!(Price::new(dec("0.005")).unwrap().to_string(), "$0.01");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [
            Price::from_cents(1000).times(2),
            Price::from_cents(500).times(1),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, Price::new(dec("25")).unwrap());
    }

    #[test]
    fn test_percent_rounds_to_cents() {
        let tax = Price::new(dec("29.99")).unwrap().percent(dec("19"));
        assert_eq!(tax.amount(), dec("5.70"));
    }

    #[test]
    fn test_serde_as_string() {
        let price = Price::from_cents(1999);
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"19.99\"");
        let parsed: Price = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(parsed, price);
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let err = serde_json::from_str::<Price>("\"-5.00\"").unwrap_err();
        assert!(err.to_string().contains("cannot be negative"));
        assert_eq!(
            serde_json::from_str::<Price>("\"0\"").unwrap(),
            Price::ZERO
        );
    }
}
