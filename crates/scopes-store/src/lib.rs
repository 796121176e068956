//! # Scopes Store
//!
//! The central, authoritative store of package state records.
//!
//! ## Overview
//!
//! [`CentralStore`] holds every record in memory, resolves each call
//! through the access policy, applies updates to whole shared-identity
//! groups, and advances the system-wide [`CacheNonce`](scopes_core::CacheNonce)
//! after every commit. Records are persisted per user through a
//! [`Persister`]: [`SqlitePersister`] in production, [`MemoryPersister`]
//! in tests.
//!
//! ## Key Types
//!
//! - [`CentralStore`] - Source of truth and access enforcement
//! - [`BoundService`] - A caller-bound [`StateService`](scopes_core::StateService) endpoint
//! - [`Persister`] - Per-user durable storage
//! - [`ProcessController`] - Kill and notify hooks run after commits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scopes_core::{AppId, Manifest, Uid};
//! use scopes_store::{CentralStore, InstalledPackage, NoopController, SqlitePersister, StoreConfig};
//!
//! let persister = Arc::new(SqlitePersister::open("package_state.db").unwrap());
//! let store = CentralStore::new(StoreConfig::default(), persister, Arc::new(NoopController)).unwrap();
//! store.install_package(InstalledPackage::new("com.example.app", AppId(10_100), Manifest::new(34)));
//! store.restore().unwrap();
//!
//! let store = Arc::new(store);
//! let service = store.bind(Uid::SYSTEM);
//! ```
//!
//! ## Design Notes
//!
//! - **Write-through memory**: the in-memory state is authoritative; failed writes are logged
//! - **Commit-ordered persistence**: snapshots are queued under the store lock
//! - **Side effects after commit**: kill and notify run outside the lock

pub mod central;
pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod migration;
pub mod package;
pub mod service;
pub mod sqlite;
pub mod traits;
pub mod writeback;

pub use central::CentralStore;
pub use config::{KnownPackages, StoreConfig};
pub use controller::{ControllerEvent, NoopController, ProcessController, RecordingController};
pub use error::{Result, StoreError};
pub use memory::MemoryPersister;
pub use package::InstalledPackage;
pub use service::BoundService;
pub use sqlite::SqlitePersister;
pub use traits::{PersistedRow, Persister};
