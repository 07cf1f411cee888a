//! The closed set of transaction outcomes.
//!
//! Every gateway operation settles into exactly one of these statuses.
//! Business rejections and concurrency conflicts are statuses, never
//! errors; only truly unexpected failures additionally set the fault flag
//! on the surrounding [`TransactionResult`](crate::result::TransactionResult).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single gateway operation.
///
/// This is a closed taxonomy: callers are expected to match exhaustively,
/// and no variant carries payload — refreshed snapshots travel in the
/// result envelope, not in the status.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TransactionStatus {
    /// The conditional write committed.
    Success,
    /// Unexpected failure, or a version conflict that could not be
    /// attributed to a business-level change (token churn).
    Failure,
    /// Withdrawal rejected: the balance does not cover the amount.
    InsufficientFunds,
    /// The account does not exist (or was deleted concurrently).
    AccountNotFound,
    /// The caller's account snapshot lost a write race; the result carries
    /// the refreshed snapshot for resubmission.
    OutdatedAccount,
    /// The write would have produced a negative balance.
    InvalidBalance,
    /// Transfer rejected: the source balance does not cover the amount.
    FromAccountInsufficientFunds,
    /// Transfer rejected: the source account does not exist.
    FromAccountNotFound,
    /// The source-side snapshot of a transfer lost a write race.
    OutdatedFromAccount,
    /// Transfer rejected: the destination balance is invalid for the credit.
    ToAccountInsufficientFunds,
    /// Transfer rejected: the destination account does not exist.
    ToAccountNotFound,
    /// The destination-side snapshot of a transfer lost a write race.
    OutdatedToAccount,
    /// Transfer rejected: source and destination are the same account.
    SameAccountRejection,
    /// Malformed request (non-positive amount).
    BadInput,
    /// The ticket does not exist (or was deleted concurrently).
    TicketNotFound,
    /// The ticket is already reserved.
    TicketAlreadyBooked,
    /// The ticketed event date has already passed.
    TicketDatePassed,
    /// The caller's ticket snapshot lost a write race; the result carries
    /// the refreshed snapshot for resubmission.
    OutdatedTicket,
}

impl TransactionStatus {
    /// Whether the operation committed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the caller's snapshot was stale and has been refreshed —
    /// the retry-eligible statuses. Resubmission with the returned
    /// snapshot is the caller's decision; the gateway never retries.
    #[must_use]
    pub const fn is_stale(self) -> bool {
        matches!(
            self,
            Self::OutdatedAccount
                | Self::OutdatedFromAccount
                | Self::OutdatedToAccount
                | Self::OutdatedTicket
        )
    }

    /// Whether this is a business-rule rejection (no write attempted, no
    /// conflict involved).
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds
                | Self::AccountNotFound
                | Self::InvalidBalance
                | Self::FromAccountInsufficientFunds
                | Self::FromAccountNotFound
                | Self::ToAccountInsufficientFunds
                | Self::ToAccountNotFound
                | Self::SameAccountRejection
                | Self::BadInput
                | Self::TicketNotFound
                | Self::TicketAlreadyBooked
                | Self::TicketDatePassed
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::AccountNotFound => "AccountNotFound",
            Self::OutdatedAccount => "OutdatedAccount",
            Self::InvalidBalance => "InvalidBalance",
            Self::FromAccountInsufficientFunds => "FromAccountInsufficientFunds",
            Self::FromAccountNotFound => "FromAccountNotFound",
            Self::OutdatedFromAccount => "OutdatedFromAccount",
            Self::ToAccountInsufficientFunds => "ToAccountInsufficientFunds",
            Self::ToAccountNotFound => "ToAccountNotFound",
            Self::OutdatedToAccount => "OutdatedToAccount",
            Self::SameAccountRejection => "SameAccountRejection",
            Self::BadInput => "BadInput",
            Self::TicketNotFound => "TicketNotFound",
            Self::TicketAlreadyBooked => "TicketAlreadyBooked",
            Self::TicketDatePassed => "TicketDatePassed",
            Self::OutdatedTicket => "OutdatedTicket",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_statuses_are_exactly_the_outdated_family() {
        let stale = [
            TransactionStatus::OutdatedAccount,
            TransactionStatus::OutdatedFromAccount,
            TransactionStatus::OutdatedToAccount,
            TransactionStatus::OutdatedTicket,
        ];
        for status in stale {
            assert!(status.is_stale(), "{status} should be stale");
            assert!(!status.is_rejection());
            assert!(!status.is_success());
        }
        assert!(!TransactionStatus::Failure.is_stale());
        assert!(!TransactionStatus::Success.is_stale());
    }

    #[test]
    fn failure_is_neither_rejection_nor_success() {
        assert!(!TransactionStatus::Failure.is_rejection());
        assert!(!TransactionStatus::Failure.is_success());
    }

    #[test]
    fn display_matches_variant_names() {
        assert_eq!(TransactionStatus::Success.to_string(), "Success");
        assert_eq!(
            TransactionStatus::OutdatedFromAccount.to_string(),
            "OutdatedFromAccount"
        );
        assert_eq!(
            TransactionStatus::TicketDatePassed.to_string(),
            "TicketDatePassed"
        );
    }
}
