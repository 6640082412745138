//! Monetary amounts stored as integer minor units.
//!
//! The remote database stores invoice amounts as integer cents. Users type
//! decimal dollars into forms, and pages display formatted currency strings.
//! [`Money`] is the single conversion point between those three shapes:
//!
//! ```text
//! form "49.99" --Money::from_major--> Money(4999) --format_usd--> "$49.99"
//!                                          |
//!                                          +--to_major--> Decimal 49.99 (edit forms)
//! ```

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a decimal amount into [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount does not fit into 64-bit minor units.
    #[error("amount is out of range")]
    OutOfRange,
}

/// A monetary value in minor currency units (cents for USD).
///
/// ## Examples
///
/// ```
/// use invoicer_core::Money;
/// use rust_decimal::Decimal;
///
/// let amount = Money::from_major("49.99".parse::<Decimal>().unwrap()).unwrap();
/// assert_eq!(amount.cents(), 4999);
/// assert_eq!(amount.format_usd(), "$49.99");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Number of minor units per major unit.
    pub const MINOR_PER_MAJOR: i64 = 100;

    /// Create a value from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Convert a major-unit decimal (e.g. dollars) into minor units.
    ///
    /// Rounds to the nearest cent, with halves rounded away from zero, so
    /// the stored value is always `round(amount * 100)`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the result does not fit in `i64`.
    pub fn from_major(amount: Decimal) -> Result<Self, MoneyError> {
        let scaled = amount
            .checked_mul(Decimal::from(Self::MINOR_PER_MAJOR))
            .ok_or(MoneyError::OutOfRange)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().map(Self).ok_or(MoneyError::OutOfRange)
    }

    /// The value in minor units.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// The value in major units, with two decimal places.
    #[must_use]
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Whether the value is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Format as US currency with thousands separators, e.g. `$1,234.56`.
    #[must_use]
    pub fn format_usd(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = group_thousands(abs / 100);
        format!("{sign}${dollars}.{:02}", abs % 100)
    }
}

/// Insert a comma between every group of three digits.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_usd())
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}
