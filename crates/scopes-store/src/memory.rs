//! In-memory implementation of the Persister trait.
//!
//! This is primarily for testing. Writes can be made to fail on demand to
//! exercise the store's handling of persistence failures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use scopes_core::{PackageName, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{PersistedRow, Persister};

/// In-memory persister.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    rows: RwLock<BTreeMap<(UserId, PackageName), PersistedRow>>,
    fail_writes: AtomicBool,
    saves: AtomicU64,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn row(&self, user: UserId, package: &PackageName) -> Option<PersistedRow> {
        self.rows.read().get(&(user, package.clone())).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Persister for MemoryPersister {
    fn load_all(&self) -> Result<Vec<PersistedRow>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn save_user(&self, user: UserId, rows: &[PersistedRow]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }

        let mut all = self.rows.write();
        all.retain(|(u, _), _| *u != user);
        for row in rows {
            all.insert((user, row.package.clone()), row.clone());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopes_core::BaseFlags;

    fn row(name: &str, user: u32) -> PersistedRow {
        PersistedRow {
            package: PackageName::new(name),
            user: UserId(user),
            base_flags: BaseFlags::STORAGE_SCOPES_ENABLED,
            path_scopes: None,
            contact_scopes: None,
        }
    }

    #[test]
    fn test_save_replaces_only_that_user() {
        let p = MemoryPersister::new();
        p.save_user(UserId(0), &[row("a", 0), row("b", 0)]).unwrap();
        p.save_user(UserId(10), &[row("a", 10)]).unwrap();
        p.save_user(UserId(0), &[row("b", 0)]).unwrap();

        assert_eq!(p.len(), 2);
        assert!(p.row(UserId(0), &PackageName::new("a")).is_none());
        assert!(p.row(UserId(10), &PackageName::new("a")).is_some());
        assert_eq!(p.save_count(), 3);
    }

    #[test]
    fn test_injected_failure() {
        let p = MemoryPersister::new();
        p.set_fail_writes(true);
        assert!(p.save_user(UserId(0), &[row("a", 0)]).is_err());
        assert!(p.is_empty());
    }
}
