//! # Scopes Access
//!
//! Decides what a caller may see and change in a package state record.
//!
//! ## Overview
//!
//! Records are never handed out raw. Each call is resolved to an
//! [`Audience`]: the owning package itself, or a privileged caller holding
//! an [`AccessGrant`] from the [`AccessPolicy`]. Reads are projected and
//! writes are merged through the audience's grant by pure functions over
//! [`StateRecord`](scopes_core::StateRecord).
//!
//! ## Key Concepts
//!
//! - **Grant**: read/write masks for base flags and record fields, plus cross-user rules
//! - **Owner view**: owner-visible flags only, no scope blobs
//! - **Write filter**: bits outside the grant keep their current value

pub mod audience;
pub mod error;
pub mod grant;
pub mod policy;

pub use audience::{filter_write, read_view, Audience};
pub use error::{AccessError, Result};
pub use grant::{AccessGrant, AccessKind, CrossUserAccess, RecordFields};
pub use policy::{AccessPolicy, KnownRole};
