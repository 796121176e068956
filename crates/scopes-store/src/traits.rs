//! Persister trait: the abstract interface for state record persistence.
//!
//! Persistence is per user: a save replaces every row of that user. This
//! matches how the store schedules writes, one committed snapshot of a
//! user at a time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use scopes_core::{BaseFlags, PackageName, StateRecord, UserId};

use crate::error::Result;

/// The persisted form of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRow {
    pub package: PackageName,
    pub user: UserId,
    pub base_flags: BaseFlags,
    pub path_scopes: Option<Bytes>,
    pub contact_scopes: Option<Bytes>,
}

impl PersistedRow {
    /// The row to persist for `record`, if any.
    ///
    /// Records without base flags are not persisted. A scope blob is only
    /// kept while its feature is enabled.
    pub fn from_record(package: &PackageName, user: UserId, record: &StateRecord) -> Option<Self> {
        if record.base_flags.is_empty() {
            return None;
        }
        let (path_scopes, contact_scopes) = gated_blobs(
            record.base_flags,
            record.path_scopes.clone(),
            record.contact_scopes.clone(),
        );
        Some(Self {
            package: package.clone(),
            user,
            base_flags: record.base_flags,
            path_scopes,
            contact_scopes,
        })
    }

    /// The record a loaded row restores, applying the same gating.
    pub fn to_record(&self) -> Option<StateRecord> {
        if self.base_flags.is_empty() {
            return None;
        }
        let (path_scopes, contact_scopes) = gated_blobs(
            self.base_flags,
            self.path_scopes.clone(),
            self.contact_scopes.clone(),
        );
        Some(
            StateRecord::new(self.base_flags)
                .with_path_scopes(path_scopes)
                .with_contact_scopes(contact_scopes),
        )
    }
}

fn gated_blobs(
    flags: BaseFlags,
    path_scopes: Option<Bytes>,
    contact_scopes: Option<Bytes>,
) -> (Option<Bytes>, Option<Bytes>) {
    (
        path_scopes.filter(|_| flags.contains(BaseFlags::STORAGE_SCOPES_ENABLED)),
        contact_scopes.filter(|_| flags.contains(BaseFlags::CONTACT_SCOPES_ENABLED)),
    )
}

/// Durable storage for state records.
///
/// Implementations must be thread-safe: saves run on the write-back worker
/// while loads run on the caller's thread.
pub trait Persister: Send + Sync {
    /// Load every persisted row.
    fn load_all(&self) -> Result<Vec<PersistedRow>>;

    /// Replace all rows of `user` with `rows`.
    fn save_user(&self, user: UserId, rows: &[PersistedRow]) -> Result<()>;
}
