//! Permission names and the manifest facts that flag derivation consumes.
//!
//! Manifest parsing itself happens elsewhere; this module only models its
//! result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Platform permission names relevant to storage and contact scoping.
pub mod permission {
    pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
    pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
    pub const MANAGE_EXTERNAL_STORAGE: &str = "android.permission.MANAGE_EXTERNAL_STORAGE";
    pub const MANAGE_MEDIA: &str = "android.permission.MANAGE_MEDIA";
    pub const ACCESS_MEDIA_LOCATION: &str = "android.permission.ACCESS_MEDIA_LOCATION";
    pub const READ_MEDIA_AUDIO: &str = "android.permission.READ_MEDIA_AUDIO";
    pub const READ_MEDIA_IMAGES: &str = "android.permission.READ_MEDIA_IMAGES";
    pub const READ_MEDIA_VIDEO: &str = "android.permission.READ_MEDIA_VIDEO";
    pub const READ_MEDIA_VISUAL_USER_SELECTED: &str =
        "android.permission.READ_MEDIA_VISUAL_USER_SELECTED";
    pub const READ_CONTACTS: &str = "android.permission.READ_CONTACTS";
    pub const WRITE_CONTACTS: &str = "android.permission.WRITE_CONTACTS";
    pub const GET_ACCOUNTS: &str = "android.permission.GET_ACCOUNTS";
}

/// Target API level at which scoped storage became mandatory unless the
/// package opts into legacy behavior.
pub const LEGACY_STORAGE_TARGET_SDK: u32 = 29;

/// The parsed facts of one package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Names from `uses-permission` entries.
    pub declared_permissions: BTreeSet<String>,
    pub target_sdk: u32,
    /// The `requestLegacyExternalStorage` opt-in.
    #[serde(default)]
    pub request_legacy_external_storage: bool,
}

impl Manifest {
    pub fn new(target_sdk: u32) -> Self {
        Self {
            target_sdk,
            ..Self::default()
        }
    }

    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.declared_permissions.insert(name.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_permissions
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_legacy_external_storage(mut self, requested: bool) -> Self {
        self.request_legacy_external_storage = requested;
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared_permissions.contains(name)
    }

    /// Whether the package runs with pre-scoped-storage semantics, where
    /// the broad storage permissions grant all-files access.
    pub fn uses_legacy_storage(&self) -> bool {
        self.target_sdk < LEGACY_STORAGE_TARGET_SDK
            || (self.target_sdk == LEGACY_STORAGE_TARGET_SDK
                && self.request_legacy_external_storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_storage_threshold() {
        assert!(Manifest::new(28).uses_legacy_storage());
        assert!(!Manifest::new(29).uses_legacy_storage());
        assert!(Manifest::new(29)
            .with_legacy_external_storage(true)
            .uses_legacy_storage());
        // The opt-in is ignored past the threshold.
        assert!(!Manifest::new(30)
            .with_legacy_external_storage(true)
            .uses_legacy_storage());
    }

    #[test]
    fn test_declares() {
        let m = Manifest::new(33).with_permissions([
            permission::READ_MEDIA_IMAGES,
            permission::READ_CONTACTS,
        ]);
        assert!(m.declares(permission::READ_CONTACTS));
        assert!(!m.declares(permission::WRITE_CONTACTS));
    }
}
