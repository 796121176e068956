//! Store configuration.

use serde::{Deserialize, Serialize};

use scopes_access::KnownRole;
use scopes_core::PackageName;

/// System packages that receive fixed grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnownPackages {
    pub media_provider: Option<PackageName>,
    pub contacts_provider: Option<PackageName>,
    pub launcher: Option<PackageName>,
    pub permission_controller: Option<PackageName>,
    pub settings: Option<PackageName>,
}

impl Default for KnownPackages {
    fn default() -> Self {
        Self {
            media_provider: Some("com.android.providers.media.module".into()),
            contacts_provider: Some("com.android.providers.contacts".into()),
            launcher: Some("com.android.launcher3".into()),
            permission_controller: Some("com.android.permissioncontroller".into()),
            settings: Some("com.android.settings".into()),
        }
    }
}

impl KnownPackages {
    pub fn get(&self, role: KnownRole) -> Option<&PackageName> {
        match role {
            KnownRole::MediaProvider => self.media_provider.as_ref(),
            KnownRole::ContactsProvider => self.contacts_provider.as_ref(),
            KnownRole::Launcher => self.launcher.as_ref(),
            KnownRole::PermissionController => self.permission_controller.as_ref(),
            KnownRole::Settings => self.settings.as_ref(),
        }
    }

    /// Configured packages with their roles.
    pub fn iter(&self) -> impl Iterator<Item = (KnownRole, &PackageName)> + '_ {
        KnownRole::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|name| (role, name)))
    }
}

/// Configuration for a [`CentralStore`](crate::CentralStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub known_packages: KnownPackages,
    /// Debuggable builds trust root with full access.
    pub debuggable: bool,
    /// Persist on a background worker. When off, writes happen inline.
    pub write_back: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            known_packages: KnownPackages::default(),
            debuggable: false,
            write_back: true,
        }
    }
}
