//! Signed money amounts in cents.
//!
//! Ledger rows carry signed amounts (debits are negative), so `Money` wraps
//! an `i64` cent count rather than an unsigned type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed money amount in cents (avoids floating point issues).
///
/// # Examples
///
/// ```
/// use ledgerflow_core::money::Money;
///
/// let price = Money::from_dollars(42);
/// assert_eq!(price.cents(), 4200);
/// assert_eq!(price.to_string(), "$42.00");
///
/// let debit = -price;
/// assert_eq!(debit.to_string(), "-$42.00");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a new `Money` amount from cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` amount from whole dollars.
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Checks if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checks if this amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checks if this amount is strictly negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_positive_and_negative() {
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(1050).to_string(), "$10.50");
        assert_eq!(Money::from_cents(-1050).to_string(), "-$10.50");
        assert_eq!(Money::from_dollars(42).to_string(), "$42.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_dollars(10);
        let b = Money::from_dollars(4);

        assert_eq!(a + b, Money::from_dollars(14));
        assert_eq!(a - b, Money::from_dollars(6));
        assert_eq!(b - a, Money::from_cents(-600));
        assert_eq!(-a, Money::from_cents(-1000));
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert!(Money::ZERO.is_zero());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn addition_preserves_cents(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let sum = Money::from_cents(a) + Money::from_cents(b);
            prop_assert_eq!(sum.cents(), a + b);
        }

        #[test]
        fn display_sign_matches_value(cents in -1_000_000i64..1_000_000) {
            let rendered = Money::from_cents(cents).to_string();
            prop_assert_eq!(rendered.starts_with('-'), cents < 0);
        }
    }
}
