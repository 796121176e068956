//! Error types for the scopes facade.

use thiserror::Error;

use scopes_client::ClientError;
use scopes_core::PackageName;
use scopes_store::StoreError;

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum ScopesError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Client-side error.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Package not installed.
    #[error("package not installed: {0}")]
    PackageNotFound(PackageName),
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, ScopesError>;
