//! Store abstraction: versioned reads and conditional multi-row writes.
//!
//! The store is the only shared mutable resource in the system and the
//! only serialization point: a [`WriteBatch`] commits atomically if and
//! only if every row's expected [`VersionToken`] still matches, and the
//! store regenerates the token of every row it writes. The core treats
//! this enforcement as opaque — it never holds a lock of its own and
//! re-reads entity state before every write instead of caching it.
//!
//! # Implementations
//!
//! - `InMemoryStore` (in `ledgerflow-testing`): reference implementation
//!   used by the tests and the console demo.
//!
//! Production persistence is deliberately out of scope; any engine that
//! honors the conditional-write contract can sit behind this trait.
//!
//! # Dyn Compatibility
//!
//! This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to enable trait object usage (`Arc<dyn Store>`), which is
//! how the gateway and the pipeline share one store handle.

use crate::entity::{Account, AccountId, Ticket, TicketId};
use crate::ledger::LedgerEntry;
use crate::version::VersionToken;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The conditional write was rejected: at least one row's current
    /// version token differed from the expected token (a row deleted
    /// concurrently also lands here — a missing row matches no token).
    /// Nothing was applied.
    #[error("version conflict on accounts {accounts:?}, tickets {tickets:?}")]
    VersionConflict {
        /// Account rows whose expected token did not match.
        accounts: Vec<AccountId>,
        /// Ticket rows whose expected token did not match.
        tickets: Vec<TicketId>,
    },

    /// Anything unexpected: connection loss, corruption, backend bugs.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is the conditional-write rejection (as opposed
    /// to an unexpected backend failure).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// A conditional account update: the new snapshot plus the token the
/// caller last observed for that row.
#[derive(Clone, Debug)]
pub struct AccountWrite {
    /// The full post-update snapshot to persist.
    pub account: Account,
    /// The version token the row must still carry for the write to apply.
    pub expected: VersionToken,
}

/// A conditional ticket update.
#[derive(Clone, Debug)]
pub struct TicketWrite {
    /// The full post-update snapshot to persist.
    pub ticket: Ticket,
    /// The version token the row must still carry for the write to apply.
    pub expected: VersionToken,
}

/// One atomic unit of work: entity updates plus the ledger rows recording
/// them. Everything in a batch commits together or not at all.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    /// Conditional account updates (a transfer carries two).
    pub accounts: SmallVec<[AccountWrite; 2]>,
    /// Conditional ticket updates.
    pub tickets: SmallVec<[TicketWrite; 1]>,
    /// Ledger rows appended in the same commit.
    pub ledger: SmallVec<[LedgerEntry; 2]>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a conditional account update.
    #[must_use]
    pub fn with_account(mut self, account: Account, expected: VersionToken) -> Self {
        self.accounts.push(AccountWrite { account, expected });
        self
    }

    /// Adds a conditional ticket update.
    #[must_use]
    pub fn with_ticket(mut self, ticket: Ticket, expected: VersionToken) -> Self {
        self.tickets.push(TicketWrite { ticket, expected });
        self
    }

    /// Appends a ledger row to the commit.
    #[must_use]
    pub fn with_ledger(mut self, entry: LedgerEntry) -> Self {
        self.ledger.push(entry);
        self
    }
}

/// Post-commit snapshots echoed back by a successful [`Store::commit`],
/// carrying the freshly minted version tokens.
#[derive(Clone, Debug, Default)]
pub struct WriteReceipt {
    /// Account rows as persisted.
    pub accounts: SmallVec<[Account; 2]>,
    /// Ticket rows as persisted.
    pub tickets: SmallVec<[Ticket; 1]>,
}

impl WriteReceipt {
    /// The persisted snapshot of `id`, if the batch wrote it.
    #[must_use]
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// The persisted snapshot of `id`, if the batch wrote it.
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }
}

/// Versioned entity store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one handle is shared by every
/// pipeline lane.
///
/// # Contract
///
/// - `fetch_*` are the operation-entry reads; `current_*` are the
///   conflict-resolution re-reads and must bypass any session caching.
/// - [`commit`](Store::commit) applies a whole [`WriteBatch`] atomically.
///   On any expected-token mismatch it returns
///   [`StoreError::VersionConflict`] naming every conflicting row, and
///   applies nothing.
/// - Every written row receives a freshly regenerated [`VersionToken`].
pub trait Store: Send + Sync {
    /// Reads an account by id. Absent accounts are `Ok(None)`, not errors.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn fetch_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>>;

    /// Reads a ticket by id.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn fetch_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>>;

    /// Applies a batch conditionally and atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::VersionConflict` when any expected token mismatches;
    ///   the conflicting row ids are listed and nothing is applied.
    /// - `StoreError::Backend` on unexpected backend failure.
    fn commit(
        &self,
        batch: WriteBatch,
    ) -> Pin<Box<dyn Future<Output = Result<WriteReceipt, StoreError>> + Send + '_>>;

    /// Re-reads the current persisted account row during conflict
    /// resolution, bypassing any session caching.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn current_account(
        &self,
        id: AccountId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, StoreError>> + Send + '_>>;

    /// Re-reads the current persisted ticket row during conflict
    /// resolution.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn current_ticket(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>>;

    /// Lists every account id.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn account_ids(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, StoreError>> + Send + '_>>;

    /// Lists ticket ids, optionally filtered by current availability.
    ///
    /// # Errors
    ///
    /// `StoreError::Backend` on unexpected backend failure.
    fn ticket_ids(
        &self,
        available: Option<bool>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TicketId>, StoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn version_conflict_error_display() {
        let id = AccountId::new();
        let error = StoreError::VersionConflict {
            accounts: vec![id],
            tickets: vec![],
        };
        let display = format!("{error}");
        assert!(display.contains("version conflict"));
        assert!(error.is_conflict());
    }

    #[test]
    fn backend_error_is_not_a_conflict() {
        let error = StoreError::Backend("connection reset".to_string());
        assert!(!error.is_conflict());
        assert!(format!("{error}").contains("connection reset"));
    }

    #[test]
    fn batch_builder_collects_rows() {
        let account = Account::new(AccountId::new(), "Alice", Money::from_dollars(10));
        let expected = account.version;
        let entry = LedgerEntry::new(
            "Branch visit deposit: +$5.00",
            Money::from_dollars(5),
            account.id,
            chrono::Utc::now(),
        );

        let batch = WriteBatch::new()
            .with_account(account.clone(), expected)
            .with_ledger(entry);

        assert_eq!(batch.accounts.len(), 1);
        assert_eq!(batch.tickets.len(), 0);
        assert_eq!(batch.ledger.len(), 1);
        assert_eq!(batch.accounts[0].account.id, account.id);
    }

    #[test]
    fn receipt_lookup_by_id() {
        let account = Account::new(AccountId::new(), "Alice", Money::from_dollars(10));
        let mut receipt = WriteReceipt::default();
        receipt.accounts.push(account.clone());

        assert_eq!(receipt.account(account.id), Some(&account));
        assert!(receipt.account(AccountId::new()).is_none());
        assert!(receipt.ticket(TicketId::new()).is_none());
    }
}
