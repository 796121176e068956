//! Strong type definitions for package and caller identities.
//!
//! All identifiers are newtypes to prevent mixing up user ids, app ids
//! and full uids at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of uids reserved per user.
pub const PER_USER_RANGE: u32 = 100_000;

/// A user (or profile) id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u32);

impl UserId {
    /// The primary user.
    pub const SYSTEM: Self = Self(0);
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-independent application id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(pub u32);

impl AppId {
    pub const ROOT: Self = Self(0);
    pub const SYSTEM: Self = Self(1000);
    pub const SHELL: Self = Self(2000);
    pub const FIRST_APPLICATION: Self = Self(10_000);
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full runtime identity: `user * PER_USER_RANGE + app_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(pub u32);

impl Uid {
    /// The system identity in the primary user.
    pub const SYSTEM: Self = Self(AppId::SYSTEM.0);

    /// Compose a uid from its user and app id parts.
    pub const fn new(user: UserId, app_id: AppId) -> Self {
        Self(user.0 * PER_USER_RANGE + app_id.0 % PER_USER_RANGE)
    }

    pub const fn user_id(self) -> UserId {
        UserId(self.0 / PER_USER_RANGE)
    }

    pub const fn app_id(self) -> AppId {
        AppId(self.0 % PER_USER_RANGE)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An installed package name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageName({})", self.0)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
