//! Amount type
//!
//! Domain primitive for transfer amounts with business rule validation.
//! Amounts are validated at construction time, so a transfer can never move
//! a zero, negative or over-precise value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum amount accepted by any single operation (1 trillion)
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Maximum decimal places (4)
const MAX_SCALE: u32 = 4;

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 4 decimal places
/// - Maximum value is 1 trillion
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use transfer_saga::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(1000, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(1000, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be greater than zero (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 4 decimal places
    /// - `AmountError::Overflow` if value > 1 trillion
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        // Trailing zeros ("1000.0000000") are not extra precision
        let normalized = value.normalize();
        if normalized.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(normalized.scale()));
        }

        if value > MAX_AMOUNT {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Percentage of this amount, e.g. `percent(dec!(0.5))` is 0.5%.
    pub fn percent(&self, rate: Decimal) -> Decimal {
        self.0 * rate / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
