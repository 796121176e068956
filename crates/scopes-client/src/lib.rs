//! # Scopes Client
//!
//! The process side of scoped permissions.
//!
//! ## Overview
//!
//! Every process reads its own state record through a [`ClientCache`],
//! which sits in front of the remote [`StateService`](scopes_core::StateService)
//! and is invalidated as a whole whenever the central store commits an
//! update. Processes with contact scopes route contacts provider access
//! through a [`ScopeRedirector`]. Privileged processes change records with
//! a [`StateEditor`].
//!
//! ## Key Types
//!
//! - [`ClientCache`] - Nonce-invalidated, bounded read-through cache
//! - [`ScopeRedirector`] - One-way authority rewriting and observer holding
//! - [`StateEditor`] - Builder over [`StateUpdate`](scopes_core::StateUpdate)
//!
//! ## Failure Handling
//!
//! Queries never fail. A dead or slow remote resolves to "no record", so
//! permission checks behave as if no scoping were configured.

pub mod cache;
pub mod editor;
pub mod error;
pub mod redirect;
pub mod remote;

pub use cache::{CacheConfig, ClientCache};
pub use editor::StateEditor;
pub use error::{ClientError, Result};
pub use redirect::{is_contacts_authority, is_contacts_uri, ContentObserver, ContentUri, ObserverRegistry, ScopeRedirector};
pub use remote::memory::MemoryService;
