//! Error types for the client module.

use thiserror::Error;

use scopes_core::RemoteError;

/// Errors that can occur on the client side.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote store call failed.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// A content URI could not be parsed.
    #[error("invalid content uri: {0}")]
    InvalidUri(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
