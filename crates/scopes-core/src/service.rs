//! The remote query/update boundary between app processes and the
//! central store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::RemoteError;
use crate::state::{StateRecord, StateUpdate};
use crate::types::{PackageName, UserId};

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Calls a process can make into the central store.
///
/// The caller's identity is bound to the handle, not passed as an argument:
/// the store decides which view of a record the caller receives.
pub trait StateService: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The caller's view of the record of `package` in `user`.
    ///
    /// `Ok(None)` when the package is not installed or has no record
    /// visible to the caller.
    fn get_state(&self, package: &PackageName, user: UserId) -> RemoteResult<Option<StateRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `update`.
    ///
    /// `Ok(false)` when the package is no longer installed or cannot carry
    /// a record.
    fn update_state(&self, package: &PackageName, user: UserId, update: StateUpdate) -> RemoteResult<bool>;

    /// Apply `update` and return the caller's view of the new record.
    ///
    /// `Ok(None)` when the package is no longer installed, or when the
    /// caller may write the record but not read it back.
    fn set_state(
        &self,
        package: &PackageName,
        user: UserId,
        update: StateUpdate,
    ) -> RemoteResult<Option<StateRecord>> {
        if !self.update_state(package, user, update)? {
            return Ok(None);
        }
        match self.get_state(package, user) {
            Err(RemoteError::AccessDenied(_)) => Ok(None),
            other => other,
        }
    }
}

impl<T: StateService + ?Sized> StateService for Arc<T> {
    fn get_state(&self, package: &PackageName, user: UserId) -> RemoteResult<Option<StateRecord>> {
        (**self).get_state(package, user)
    }

    fn update_state(&self, package: &PackageName, user: UserId, update: StateUpdate) -> RemoteResult<bool> {
        (**self).update_state(package, user, update)
    }
}

/// A system-wide invalidation token.
///
/// Advanced by the store after every committed update. Every process reads
/// it before trusting its cached records; a changed value means every
/// cached record may be stale.
#[derive(Debug, Clone, Default)]
pub struct CacheNonce(Arc<AtomicU64>);

impl CacheNonce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Move to a new value and return it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}
