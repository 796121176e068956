//! # Scopes Testkit
//!
//! Testing utilities for scoped permissions.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed scope lists with their expected wire bytes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a booted platform with recording test doubles
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the persisted encoding of scope lists:
//!
//! ```rust
//! use scopes_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use scopes_testkit::generators::path_scopes;
//!
//! proptest! {
//!     #[test]
//!     fn path_scopes_survive_encoding(scopes in path_scopes()) {
//!         let blob = scopes_core::storage_scope::encode(&scopes);
//!         prop_assert_eq!(scopes_core::storage_scope::decode(blob.as_deref()), scopes);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use scopes_testkit::fixtures::TestPlatform;
//! use scopes_core::{AppId, Manifest, UserId};
//!
//! let fixture = TestPlatform::new();
//! let app = fixture.install_app("com.example.app", AppId(10_200), Manifest::new(34));
//! assert!(fixture.enable_storage_scopes(&app, UserId(0)));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{system_packages, TestPlatform};
pub use vectors::{contact_scope_vectors, path_scope_vectors, verify_all_vectors};
