//! # Ledgerflow Testing
//!
//! Testing utilities and mock implementations for the Ledgerflow
//! workspace:
//!
//! - [`mocks::InMemoryStore`]: reference [`Store`] implementation with
//!   real conditional-write semantics (token regeneration, atomic
//!   all-or-nothing batches).
//! - [`mocks::FixedClock`]: deterministic time.
//! - [`mocks::FailingStore`]: fault injection — every store call after
//!   the Nth fails with a backend error.
//! - [`mocks::ConcurrencyProbe`]: observes how many store operations are
//!   in flight simultaneously.
//! - Seeding helpers for accounts and tickets.
//!
//! The console demo also runs against [`mocks::InMemoryStore`], since
//! production persistence is out of scope for the core.
//!
//! [`Store`]: ledgerflow_core::Store

pub mod mocks;

pub use mocks::{
    seed_accounts, seed_tickets, test_clock, ConcurrencyProbe, FailingStore, FixedClock,
    InMemoryStore,
};
