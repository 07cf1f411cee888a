//! # Ledgerflow Core
//!
//! Data model, status taxonomy, result envelope, and the store contract
//! for the Ledgerflow system: concurrent banking and ticket-booking
//! operations over a version-stamped store with optimistic concurrency
//! control.
//!
//! ## Core Concepts
//!
//! - **Entities** ([`entity`]): [`Account`](entity::Account) and
//!   [`Ticket`](entity::Ticket) snapshots, each stamped with an opaque
//!   [`VersionToken`](version::VersionToken) the store regenerates on
//!   every write.
//! - **Ledger** ([`ledger`]): immutable, append-only
//!   [`LedgerEntry`](ledger::LedgerEntry) rows written in the same
//!   conditional commit as the entity updates they record.
//! - **Statuses** ([`status`]): the closed
//!   [`TransactionStatus`](status::TransactionStatus) taxonomy — business
//!   rejections and concurrency conflicts are values, never errors.
//! - **Results** ([`result`]): the per-call
//!   [`TransactionResult`](result::TransactionResult) envelope.
//! - **Store** ([`store`]): versioned reads plus the conditional
//!   multi-row [`WriteBatch`](store::WriteBatch) commit — the system's
//!   only serialization point.
//!
//! The gateway implementing the operations lives in `ledgerflow-gateway`;
//! the bounded-parallelism pipeline in `ledgerflow-pipeline`.

pub mod entity;
pub mod environment;
pub mod ledger;
pub mod money;
pub mod result;
pub mod status;
pub mod store;
pub mod version;

pub use entity::{Account, AccountId, Ticket, TicketId, Versioned};
pub use environment::{Clock, SystemClock};
pub use ledger::{LedgerEntry, TransactionId};
pub use money::Money;
pub use result::TransactionResult;
pub use status::TransactionStatus;
pub use store::{AccountWrite, Store, StoreError, TicketWrite, WriteBatch, WriteReceipt};
pub use version::VersionToken;
