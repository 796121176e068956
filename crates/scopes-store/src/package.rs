//! Installed packages as the store sees them.

use serde::{Deserialize, Serialize};

use scopes_core::{AppId, Manifest, PackageName};

/// An installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: PackageName,
    pub app_id: AppId,
    /// Runs under a shared identity with every other shared package of
    /// the same app id.
    #[serde(default)]
    pub shared_user: bool,
    /// Pre-installed or privileged.
    #[serde(default)]
    pub system: bool,
    pub manifest: Manifest,
    /// Bumped on every install or upgrade.
    pub revision: u64,
}

impl InstalledPackage {
    pub fn new(name: impl Into<PackageName>, app_id: AppId, manifest: Manifest) -> Self {
        Self {
            name: name.into(),
            app_id,
            shared_user: false,
            system: false,
            manifest,
            revision: 1,
        }
    }

    pub fn shared(mut self) -> Self {
        self.shared_user = true;
        self
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Whether a state record may be attached to this package.
    ///
    /// The system app id is shared by a large number of packages and
    /// pre-installed packages have no use for scoping.
    pub fn can_carry_state(&self) -> bool {
        self.app_id != AppId::SYSTEM && !self.system
    }

    /// Whether `other` shares this package's runtime identity.
    pub fn shares_identity_with(&self, other: &InstalledPackage) -> bool {
        self.shared_user && other.shared_user && self.app_id == other.app_id
    }
}
