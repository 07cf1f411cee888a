//! Versioned domain entities: accounts and tickets.
//!
//! Both entity types carry an opaque [`VersionToken`] regenerated by the
//! store on every write; the token is the sole concurrency invariant. The
//! [`Versioned`] trait exposes the shared "has id and version" capability
//! without resorting to a common base type.

use crate::money::Money;
use crate::version::VersionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a bank account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random `AccountId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `AccountId` from a UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a bookable ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `TicketId` from a UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability shared by every persisted entity: an identity plus the
/// version token the store stamped on the last write.
///
/// Gateway and store code that only needs "which row, which token" is
/// written against this trait instead of a concrete entity type.
pub trait Versioned {
    /// The entity's identifier type.
    type Id: Copy + Eq + std::hash::Hash + std::fmt::Display;

    /// The entity's identity.
    fn id(&self) -> Self::Id;

    /// The version token observed on the last read.
    fn version(&self) -> VersionToken;

    /// Replaces the version token (used when refreshing a stale snapshot).
    fn set_version(&mut self, version: VersionToken);
}

/// A bank account snapshot.
///
/// Snapshots are plain values: the gateway operates on the copy the caller
/// passes in and returns a possibly refreshed copy in the result envelope.
/// No shared mutable account state exists outside the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Account holder name.
    pub holder_name: String,
    /// Current balance.
    pub balance: Money,
    /// When the account last saw a gateway-approved operation.
    pub last_transaction_at: Option<DateTime<Utc>>,
    /// Version token stamped by the store on the last write.
    pub version: VersionToken,
}

impl Account {
    /// Creates a new account snapshot with a fresh version token.
    #[must_use]
    pub fn new(id: AccountId, holder_name: impl Into<String>, balance: Money) -> Self {
        Self {
            id,
            holder_name: holder_name.into(),
            balance,
            last_transaction_at: None,
            version: VersionToken::fresh(),
        }
    }
}

impl Versioned for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }

    fn version(&self) -> VersionToken {
        self.version
    }

    fn set_version(&mut self, version: VersionToken) {
        self.version = version;
    }
}

/// A bookable ticket snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// When the ticketed event takes place.
    pub ticket_date: DateTime<Utc>,
    /// When the ticket was reserved, if it is.
    pub reservation_date: Option<DateTime<Utc>>,
    /// The account holding the reservation, if any.
    pub reserved_by: Option<AccountId>,
    /// Whether the ticket can currently be booked.
    ///
    /// Invariant: `is_available == reserved_by.is_none()`.
    pub is_available: bool,
    /// Version token stamped by the store on the last write.
    pub version: VersionToken,
    /// Ticket price.
    pub price: Money,
}

impl Ticket {
    /// Creates a new unreserved ticket snapshot with a fresh version token.
    #[must_use]
    pub fn new(id: TicketId, ticket_date: DateTime<Utc>, price: Money) -> Self {
        Self {
            id,
            ticket_date,
            reservation_date: None,
            reserved_by: None,
            is_available: true,
            version: VersionToken::fresh(),
            price,
        }
    }

    /// Returns a copy reserved by `account_id` at `reserved_at`.
    #[must_use]
    pub fn reserved(&self, account_id: AccountId, reserved_at: DateTime<Utc>) -> Self {
        let mut ticket = self.clone();
        ticket.reserved_by = Some(account_id);
        ticket.reservation_date = Some(reserved_at);
        ticket.is_available = false;
        ticket
    }

    /// Returns a copy with the reservation cleared.
    #[must_use]
    pub fn released(&self) -> Self {
        let mut ticket = self.clone();
        ticket.reserved_by = None;
        ticket.reservation_date = None;
        ticket.is_available = true;
        ticket
    }
}

impl Versioned for Ticket {
    type Id = TicketId;

    fn id(&self) -> TicketId {
        self.id
    }

    fn version(&self) -> VersionToken {
        self.version
    }

    fn set_version(&mut self, version: VersionToken) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ticket_holds_invariant() {
        let ticket = Ticket::new(TicketId::new(), Utc::now(), Money::from_dollars(25));
        assert!(ticket.is_available);
        assert!(ticket.reserved_by.is_none());

        let holder = AccountId::new();
        let reserved = ticket.reserved(holder, Utc::now());
        assert!(!reserved.is_available);
        assert_eq!(reserved.reserved_by, Some(holder));
        assert!(reserved.reservation_date.is_some());

        let released = reserved.released();
        assert!(released.is_available);
        assert!(released.reserved_by.is_none());
        assert!(released.reservation_date.is_none());
    }

    #[test]
    fn versioned_accessors() {
        let mut account = Account::new(AccountId::new(), "Alice", Money::from_dollars(100));
        let original = Versioned::version(&account);
        let fresh = VersionToken::fresh();
        account.set_version(fresh);
        assert_ne!(Versioned::version(&account), original);
        assert_eq!(Versioned::version(&account), fresh);
        assert_eq!(Versioned::id(&account), account.id);
    }

    #[test]
    fn ids_display_as_uuids() {
        let id = AccountId::new();
        assert_eq!(format!("{id}").len(), 36);
    }
}
