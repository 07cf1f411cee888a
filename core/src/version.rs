//! Opaque version tokens for optimistic concurrency control.
//!
//! Every persisted row carries a [`VersionToken`] that the store regenerates
//! on each successful insert or update. A conditional write names the token
//! the caller last observed; if the row's current token differs, the store
//! rejects the whole write atomically. Tokens are compared for equality
//! only — they carry no ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque concurrency token attached to every persisted row.
///
/// # Examples
///
/// ```
/// use ledgerflow_core::version::VersionToken;
///
/// let v0 = VersionToken::fresh();
/// let v1 = VersionToken::fresh();
/// assert_ne!(v0, v1);
/// assert_eq!(v0, v0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Generates a brand-new token.
    ///
    /// Only the store should mint tokens for persisted rows; callers treat
    /// them as opaque values to echo back on the next write.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a token from a raw UUID (for store implementations).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first hyphenated group is plenty for log lines.
        let full = self.0.to_string();
        write!(f, "{}", &full[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_differ() {
        let a = VersionToken::fresh();
        let b = VersionToken::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_short() {
        let token = VersionToken::from_uuid(Uuid::nil());
        assert_eq!(token.to_string(), "00000000");
    }
}
