//! Errors surfaced by the gateway's read-only lookups.
//!
//! Mutating operations never return `Err` — their outcomes, including
//! conflicts and unexpected failures, travel as statuses inside the
//! [`TransactionResult`](ledgerflow_core::TransactionResult) envelope.
//! The lookups used to synthesize operands are the exception: a failure
//! there is unexpected by definition and is what trips the pipeline's
//! shared cancellation.

use ledgerflow_core::{AccountId, StoreError};
use thiserror::Error;

/// Errors from the gateway's read-only lookups.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The gateway was constructed without provisioned accounts.
    #[error("no provisioned accounts to draw from")]
    EmptyRoster,

    /// A provisioned roster account has vanished from the store.
    #[error("provisioned account {0} is missing from the store")]
    MissingAccount(AccountId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_store_errors() {
        let error = GatewayError::from(StoreError::Backend("boom".to_string()));
        assert!(format!("{error}").contains("boom"));
    }

    #[test]
    fn missing_account_names_the_id() {
        let id = AccountId::new();
        let error = GatewayError::MissingAccount(id);
        assert!(format!("{error}").contains(&id.to_string()));
    }
}
