//! The outcome envelope returned by every gateway operation.

use crate::money::Money;
use crate::status::TransactionStatus;
use serde::{Deserialize, Serialize};

/// Outcome of a single gateway operation.
///
/// Carries the (possibly version-refreshed) entity snapshot the status
/// refers to, the amount attempted, a fault flag for unexpected failures,
/// and the settled [`TransactionStatus`]. One envelope is created fresh
/// per call and owned by the caller.
///
/// The raw status is a projection of the envelope ([`status`]) rather than
/// a separate result shape.
///
/// [`status`]: TransactionResult::status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult<T> {
    /// The entity snapshot the status refers to, when one is known.
    pub data: Option<T>,
    /// The amount the operation attempted to move.
    pub amount: Money,
    /// Set when the operation hit an unexpected failure (store unreachable,
    /// programming error) rather than a business outcome.
    pub is_faulted: bool,
    /// The settled outcome.
    pub status: TransactionStatus,
}

impl<T> TransactionResult<T> {
    /// A settled business outcome.
    #[must_use]
    pub const fn settled(status: TransactionStatus, data: Option<T>, amount: Money) -> Self {
        Self {
            data,
            amount,
            is_faulted: false,
            status,
        }
    }

    /// A committed operation carrying the refreshed snapshot.
    #[must_use]
    pub const fn success(data: T, amount: Money) -> Self {
        Self {
            data: Some(data),
            amount,
            is_faulted: false,
            status: TransactionStatus::Success,
        }
    }

    /// An unexpected failure, converted to a faulted `Failure` result.
    #[must_use]
    pub const fn faulted(data: Option<T>, amount: Money) -> Self {
        Self {
            data,
            amount,
            is_faulted: true,
            status: TransactionStatus::Failure,
        }
    }

    /// The raw status projection.
    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faulted_results_are_distinguishable_from_business_failures() {
        let faulted: TransactionResult<()> = TransactionResult::faulted(None, Money::ZERO);
        let business: TransactionResult<()> =
            TransactionResult::settled(TransactionStatus::Failure, None, Money::ZERO);

        assert_eq!(faulted.status(), business.status());
        assert!(faulted.is_faulted);
        assert!(!business.is_faulted);
    }

    #[test]
    fn success_carries_the_snapshot() {
        let result = TransactionResult::success("snapshot", Money::from_dollars(5));
        assert_eq!(result.data, Some("snapshot"));
        assert!(result.status().is_success());
        assert!(!result.is_faulted);
    }
}
