//! Append-only ledger entries.
//!
//! Every successful gateway operation appends one or two ledger rows in the
//! same conditional commit as the entity update. Entries are immutable once
//! written; the core never updates or deletes them.

use crate::entity::AccountId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random `TransactionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `TransactionId` from a UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable ledger row: a signed amount applied to an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: TransactionId,
    /// Free-text description of the operation.
    pub description: String,
    /// Signed amount: credits positive, debits negative.
    pub amount: Money,
    /// The account the entry belongs to.
    pub account_id: AccountId,
    /// When the operation took place.
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a new ledger entry with a random identifier.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        amount: Money,
        account_id: AccountId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            description: description.into(),
            amount,
            account_id,
            timestamp,
        }
    }
}
