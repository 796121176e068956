//! Error types for the scopes core.

use thiserror::Error;

/// Core errors that can occur while handling state records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported encoding version: {0}")]
    UnsupportedVersion(u8),

    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("limit exceeded: {what} is {actual}, max {max}")]
    LimitExceeded {
        what: &'static str,
        actual: usize,
        max: usize,
    },
}

/// Failures of the remote query/update boundary.
///
/// Client-side callers never surface these to permission-check call
/// sites; they resolve to "no record" instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The process owning the central store is gone.
    #[error("remote endpoint is dead")]
    DeadObject,

    /// The remote call did not complete in time.
    #[error("remote call timed out")]
    Timeout,

    /// The caller is not allowed to perform this call.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
