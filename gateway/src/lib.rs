//! # Ledgerflow Gateway
//!
//! The optimistic-concurrency transaction gateway: deposit, withdraw,
//! transfer, and ticket booking/unbooking over a version-stamped
//! [`Store`](ledgerflow_core::Store), plus the read-only lookups the
//! pipeline uses to synthesize operands.
//!
//! Protocol per mutating operation:
//!
//! 1. Re-read the entity by id (no state is cached between calls).
//! 2. Apply the business checks to the fresh row; rejections settle
//!    without any write.
//! 3. Commit the updated snapshot conditionally on the version token the
//!    caller supplied, with the ledger rows in the same batch.
//! 4. On a version conflict, classify it ([`resolver`]): deleted row,
//!    stale caller (snapshot refreshed for resubmission), or token churn.
//! 5. Anything unexpected is fault-logged on a detached channel
//!    ([`fault_log`]) and settles as a faulted `Failure` — gateway
//!    operations never raise.

pub mod error;
pub mod fault_log;
pub mod gateway;
pub mod resolver;

pub use error::GatewayError;
pub use fault_log::FaultLog;
pub use gateway::{BookingGateway, StoreGateway};
pub use resolver::Resolution;
