//! # Scopes
//!
//! Storage and contact scopes: per-app, per-user records that let the
//! user hand an app a narrow set of files or contacts instead of a broad
//! permission, while the app is told it holds the broad permission.
//!
//! ## Overview
//!
//! - **Central store**: the single source of truth for state records, with access rules per caller
//! - **Process contexts**: each app process answers its own permission checks from a cached view
//! - **Spoofing**: a check is answered "granted" when the scoping feature is on and the app declared the permission
//! - **Redirection**: contacts providers are swapped for scoped stand-ins in processes with contact scopes
//!
//! ## Key Concepts
//!
//! - **Base flags**: persisted toggles, set by the user
//! - **Derived flags**: computed from the app's manifest, never persisted
//! - **Shared identity**: packages sharing one runtime identity share one record
//! - **Cache nonce**: advanced on every commit, invalidates every process cache
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scopes::{ScopesConfig, ScopesPlatform};
//! use scopes::core::{permission, AppId, BaseFlags, Manifest, PackageName, UserId};
//! use scopes::store::InstalledPackage;
//!
//! let platform = ScopesPlatform::in_memory(ScopesConfig::default()).unwrap();
//! platform.boot([InstalledPackage::new(
//!     "com.example.gallery",
//!     AppId(10_100),
//!     Manifest::new(34).with_permission(permission::READ_MEDIA_IMAGES),
//! )]).unwrap();
//!
//! let gallery = PackageName::new("com.example.gallery");
//! let mut editor = platform.edit(scopes::shell::shell_uid(), &gallery, UserId(0)).unwrap();
//! editor.add_flags(BaseFlags::STORAGE_SCOPES_ENABLED);
//! editor.apply(&platform.service(scopes::shell::shell_uid())).unwrap();
//!
//! let process = platform.spawn_process(&gallery, UserId(0)).unwrap();
//! assert!(process.should_spoof_self_permission_check(permission::READ_MEDIA_IMAGES));
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `scopes::core` - State records, flags, codecs, derivation and spoof rules
//! - `scopes::access` - Caller grants and record views
//! - `scopes::store` - The central store and persistence
//! - `scopes::client` - Process cache, redirection and editor

pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod shell;

// Re-export component crates
pub use scopes_access as access;
pub use scopes_client as client;
pub use scopes_core as core;
pub use scopes_store as store;

// Re-export main types for convenience
pub use config::ScopesConfig;
pub use error::{Result, ScopesError};
pub use platform::{AppProcess, ScopesPlatform};
pub use process::ProcessContext;

// Re-export commonly used core types
pub use scopes_core::{
    AppId, AppOp, BaseFlags, ContactScopeKind, ContactScopeSet, DerivedFlags, GrantResult, Manifest,
    PackageName, PathScope, PathScopeFlags, StateRecord, StateUpdate, Uid, UserId,
};
