//! Conflict classification for failed conditional writes.
//!
//! When the store rejects a write because a version token no longer
//! matches, the gateway re-reads the current persisted row and asks one
//! question: did the row's *business* field change relative to what the
//! caller believed, or did only the token churn?
//!
//! - Row gone → it was deleted concurrently.
//! - Business field differs from the caller's snapshot → the caller is
//!   stale; hand back the fresh row so a resubmission carries up-to-date
//!   data.
//! - Business field unchanged → token churn (e.g. an unrelated no-op
//!   write); classified as a transient failure. No automatic retry is
//!   attempted.
//!
//! The functions here are pure; the gateway performs the re-read and maps
//! the classification onto the operation-specific status codes.

use ledgerflow_core::{Account, Ticket};

/// Outcome of classifying one conflicting row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The row no longer exists.
    Deleted,
    /// The caller's snapshot is stale; here is the current row.
    Refreshed(T),
    /// The token changed but the business field did not.
    TokenChurn,
}

/// Classifies an account conflict: the comparable business field is the
/// balance.
#[must_use]
pub fn resolve_account(snapshot: &Account, current: Option<Account>) -> Resolution<Account> {
    match current {
        None => Resolution::Deleted,
        Some(row) if row.balance != snapshot.balance => Resolution::Refreshed(row),
        Some(_) => Resolution::TokenChurn,
    }
}

/// Classifies a ticket conflict: the comparable business fields are the
/// availability flag and the reservation.
#[must_use]
pub fn resolve_ticket(snapshot: &Ticket, current: Option<Ticket>) -> Resolution<Ticket> {
    match current {
        None => Resolution::Deleted,
        Some(row)
            if row.is_available != snapshot.is_available
                || row.reserved_by != snapshot.reserved_by =>
        {
            Resolution::Refreshed(row)
        }
        Some(_) => Resolution::TokenChurn,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use chrono::Utc;
    use ledgerflow_core::{AccountId, Money, TicketId, VersionToken};

    fn snapshot() -> Account {
        Account::new(AccountId::new(), "Alice", Money::from_dollars(1000))
    }

    #[test]
    fn deleted_row_resolves_to_deleted() {
        let account = snapshot();
        assert_eq!(resolve_account(&account, None), Resolution::Deleted);
    }

    #[test]
    fn changed_balance_refreshes_the_snapshot() {
        let account = snapshot();
        let mut current = account.clone();
        current.balance = Money::from_dollars(400);
        current.version = VersionToken::fresh();

        match resolve_account(&account, Some(current.clone())) {
            Resolution::Refreshed(fresh) => {
                assert_eq!(fresh.balance, Money::from_dollars(400));
                assert_eq!(fresh.version, current.version);
            }
            other => panic!("expected refresh, got {other:?}"),
        }
    }

    #[test]
    fn token_churn_without_balance_change() {
        let account = snapshot();
        let mut current = account.clone();
        current.version = VersionToken::fresh();

        assert_eq!(
            resolve_account(&account, Some(current)),
            Resolution::TokenChurn
        );
    }

    #[test]
    fn rebooked_ticket_refreshes_the_snapshot() {
        let ticket = Ticket::new(TicketId::new(), Utc::now(), Money::from_dollars(25));
        let mut current = ticket.reserved(AccountId::new(), Utc::now());
        current.version = VersionToken::fresh();

        match resolve_ticket(&ticket, Some(current)) {
            Resolution::Refreshed(fresh) => assert!(!fresh.is_available),
            other => panic!("expected refresh, got {other:?}"),
        }
    }

    #[test]
    fn ticket_token_churn_without_reservation_change() {
        let ticket = Ticket::new(TicketId::new(), Utc::now(), Money::from_dollars(25));
        let mut current = ticket.clone();
        current.version = VersionToken::fresh();

        assert_eq!(
            resolve_ticket(&ticket, Some(current)),
            Resolution::TokenChurn
        );
    }
}
