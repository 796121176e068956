//! Error types for caller privilege resolution.

use thiserror::Error;

use scopes_core::{AppId, Uid, UserId};

/// Reasons a caller is refused access to a state record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The caller has no grant and is not the record's owner.
    #[error("uid {caller} may not access state of app id {target}")]
    NotGranted { caller: Uid, target: AppId },

    /// The caller's grant does not allow any writes.
    #[error("uid {caller} has read-only access")]
    ReadOnly { caller: Uid },

    /// The target user is outside what the caller's grant allows.
    #[error("uid {caller} may not access user {target_user}")]
    CrossUser { caller: Uid, target_user: UserId },

    /// Grants are only given to installed system packages.
    #[error("refusing to grant access to {0}: not a system package")]
    NotSystemPackage(String),
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
