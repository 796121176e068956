//! # Scopes Core
//!
//! Pure primitives for scoped permissions: the per-package state record,
//! its flag sets, the scope codecs, flag derivation and spoof decisions.
//!
//! This crate contains no I/O and no storage. Everything here is
//! computation over state records.
//!
//! ## Key Types
//!
//! - [`StateRecord`] - State attached to one package for one user
//! - [`BaseFlags`] / [`DerivedFlags`] - Persisted toggles and manifest-derived capabilities
//! - [`PathScope`] / [`ContactScopeSet`] - The two scoped-resource lists
//! - [`FlagDerivationEngine`] - Cached manifest derivation
//! - [`StateService`] - The remote query/update boundary
//!
//! ## Codecs
//!
//! Scope lists are carried as encoded blobs. See [`storage_scope`] and
//! [`contact_scope`] for the wire formats.

pub mod contact_scope;
pub mod derive;
pub mod error;
pub mod flags;
pub mod manifest;
pub mod provider;
pub mod service;
pub mod spoof;
pub mod state;
pub mod storage_scope;
pub mod types;

mod wire;

pub use contact_scope::{ContactScope, ContactScopeKind, ContactScopeSet, ContactsGroup, MAX_CONTACT_SCOPES};
pub use derive::{derive_flags, derive_for_group, FlagDerivationEngine, GroupMember};
pub use error::{CoreError, RemoteError, Result};
pub use flags::{BaseFlags, DerivedFlags, EditorFlags};
pub use manifest::{permission, Manifest, LEGACY_STORAGE_TARGET_SDK};
pub use provider::{ConfigRequest, ConfigScreen, ProviderMethod};
pub use service::{CacheNonce, RemoteResult, StateService};
pub use spoof::{should_spoof, AppOp, GrantResult, SpoofableCheck};
pub use state::{StateRecord, StateUpdate};
pub use storage_scope::{PathScope, PathScopeFlags, MAX_PATH_SCOPES};
pub use types::{AppId, PackageName, Uid, UserId, PER_USER_RANGE};
