//! Remote store endpoints usable without a central store.
//!
//! The production endpoint is a caller-bound handle to the central store.
//! The in-memory endpoint here stands in for it in tests and can be made
//! to fail like a dead or slow remote.

/// A simple in-memory endpoint for testing.
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    use parking_lot::{Mutex, RwLock};

    use scopes_core::{
        CacheNonce, PackageName, RemoteError, RemoteResult, StateRecord, StateService, StateUpdate, UserId,
    };

    /// Stores whatever it is sent, with no access rules.
    #[derive(Debug, Default)]
    pub struct MemoryService {
        records: RwLock<HashMap<(PackageName, UserId), StateRecord>>,
        nonce: CacheNonce,
        failure: Mutex<Option<RemoteError>>,
        gets: AtomicU64,
    }

    impl MemoryService {
        pub fn new() -> Self {
            Self::default()
        }

        /// The nonce advanced by every update.
        pub fn nonce(&self) -> CacheNonce {
            self.nonce.clone()
        }

        /// Fail every call with `error` until cleared with `None`.
        pub fn set_failure(&self, error: Option<RemoteError>) {
            *self.failure.lock() = error;
        }

        /// Number of `get_state` calls received.
        pub fn get_count(&self) -> u64 {
            self.gets.load(Ordering::SeqCst)
        }

        /// Store `record` directly, as another process would.
        pub fn put(&self, package: &PackageName, user: UserId, record: StateRecord) {
            self.records.write().insert((package.clone(), user), record);
            self.nonce.advance();
        }

        fn check(&self) -> RemoteResult<()> {
            match self.failure.lock().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    impl StateService for MemoryService {
        fn get_state(&self, package: &PackageName, user: UserId) -> RemoteResult<Option<StateRecord>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.records.read().get(&(package.clone(), user)).cloned())
        }

        fn update_state(&self, package: &PackageName, user: UserId, update: StateUpdate) -> RemoteResult<bool> {
            self.check()?;
            let key = (package.clone(), user);
            let mut records = self.records.write();
            if update.base_flags.is_empty() {
                records.remove(&key);
            } else {
                let record = StateRecord::new(update.base_flags)
                    .with_path_scopes(update.path_scopes)
                    .with_contact_scopes(update.contact_scopes);
                records.insert(key, record);
            }
            self.nonce.advance();
            Ok(true)
        }
    }
}
