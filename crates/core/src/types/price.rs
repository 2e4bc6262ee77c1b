//! Type-safe price representation using decimal arithmetic.
//!
//! The marketplace trades in a single currency, so a price is just a
//! non-negative decimal amount. The backend sends prices as JSON numbers
//! (occasionally as numeric strings); both are accepted on input and prices
//! are always written back as JSON numbers.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The input is negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative monetary amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount, clamping negatives to zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::ZERO
        } else {
            Self(amount)
        }
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    /// Parse a price from user input such as `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a number or is negative.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(input.trim()).map_err(|_| PriceError::NotANumber)?;
        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format for display (e.g., `$19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Ok(Self::new(amount))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_units(100).display(), "$100.00");
        assert_eq!(Price::parse("19.999").unwrap().display(), "$20.00");
        assert_eq!(Price::parse("0.5").unwrap().to_string(), "$0.50");
    }

    #[test]
    fn test_parse_rejects_garbage_and_negatives() {
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert_eq!(Price::parse(" 12 ").unwrap(), Price::from_units(12));
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from_units(100).times(2), Price::parse("0.25").unwrap()]
            .into_iter()
            .sum();
        assert_eq!(total, Price::parse("200.25").unwrap());
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_int: Price = serde_json::from_str("100").unwrap();
        let from_float: Price = serde_json::from_str("19.99").unwrap();
        let from_str: Price = serde_json::from_str("\"7.5\"").unwrap();
        assert_eq!(from_int, Price::from_units(100));
        assert_eq!(from_float, Price::parse("19.99").unwrap());
        assert_eq!(from_str, Price::parse("7.5").unwrap());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Price::parse("19.5").unwrap()).unwrap();
        assert_eq!(json, serde_json::json!(19.5));
    }

    #[test]
    fn test_negative_input_clamps_to_zero() {
        let price: Price = serde_json::from_str("-3").unwrap();
        assert_eq!(price, Price::ZERO);
    }
}
