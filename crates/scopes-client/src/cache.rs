//! Per-process, read-through cache of state records.
//!
//! ## Overview
//!
//! The cache is invalidated as a whole, never per key. It remembers the
//! value of the system-wide [`CacheNonce`] its entries were fetched under;
//! once the store commits any update the nonce moves and the next query
//! drops every entry.
//!
//! Confirmed absence is cached too, so a package without a record does
//! not cost a remote call per permission check.
//!
//! Remote failures are never surfaced: the query resolves to "no record"
//! and nothing is cached.

use moka::sync::Cache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scopes_core::{CacheNonce, PackageName, StateRecord, StateService, UserId};

/// Cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached queries.
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, Clone)]
enum CachedEntry {
    Present(StateRecord),
    Absent,
}

impl CachedEntry {
    fn into_record(self) -> Option<StateRecord> {
        match self {
            CachedEntry::Present(record) => Some(record),
            CachedEntry::Absent => None,
        }
    }
}

/// Read-through cache in front of a [`StateService`].
pub struct ClientCache<S> {
    service: S,
    nonce: CacheNonce,
    /// Nonce the current entries were fetched under.
    seen: Mutex<u64>,
    entries: Cache<(PackageName, UserId), CachedEntry>,
}

impl<S: StateService> ClientCache<S> {
    pub fn new(service: S, nonce: CacheNonce, config: CacheConfig) -> Self {
        let capacity = config.capacity.max(1);
        let seen = nonce.current();
        Self {
            service,
            nonce,
            seen: Mutex::new(seen),
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The caller's view of `package`'s record in `user`.
    pub fn query(&self, package: &PackageName, user: UserId) -> Option<StateRecord> {
        let nonce = self.sync_nonce();
        let key = (package.clone(), user);

        if let Some(entry) = self.entries.get(&key) {
            return entry.into_record();
        }

        // The remote call happens outside the lock.
        let fetched = match self.service.get_state(package, user) {
            Ok(record) => record,
            Err(e) => {
                warn!(package = %package, user = user.0, error = %e, "state query failed, treating as no record");
                return None;
            }
        };

        // A commit that raced with the fetch may have been missed.
        let seen = self.seen.lock();
        if *seen == nonce && self.nonce.current() == nonce {
            let entry = match &fetched {
                Some(record) => CachedEntry::Present(record.clone()),
                None => CachedEntry::Absent,
            };
            self.entries.insert(key, entry);
        }

        fetched
    }

    /// Drop every entry.
    pub fn invalidate(&self) {
        self.entries.invalidate_all();
    }

    /// Number of entries. Approximate while evictions are pending.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sync_nonce(&self) -> u64 {
        let mut seen = self.seen.lock();
        let current = self.nonce.current();
        if *seen != current {
            debug!(old = *seen, new = current, "state changed, dropping cached records");
            self.entries.invalidate_all();
            *seen = current;
        }
        current
    }
}
