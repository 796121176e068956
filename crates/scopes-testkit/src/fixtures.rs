//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a booted platform with the
//! usual system packages installed and recording test doubles wired in.

use std::sync::Arc;

use scopes::{ScopesConfig, ScopesPlatform};
use scopes_core::{AppId, BaseFlags, Manifest, PackageName, Uid, UserId};
use scopes_store::{InstalledPackage, MemoryPersister, RecordingController, StoreConfig};

pub const MEDIA_PROVIDER_APP_ID: AppId = AppId(10_010);
pub const CONTACTS_PROVIDER_APP_ID: AppId = AppId(10_011);
pub const LAUNCHER_APP_ID: AppId = AppId(10_012);
pub const PERMISSION_CONTROLLER_APP_ID: AppId = AppId(10_013);

/// The system packages named by the default configuration.
pub fn system_packages() -> Vec<InstalledPackage> {
    let known = StoreConfig::default().known_packages;
    let entries = [
        (known.media_provider, MEDIA_PROVIDER_APP_ID),
        (known.contacts_provider, CONTACTS_PROVIDER_APP_ID),
        (known.launcher, LAUNCHER_APP_ID),
        (known.permission_controller, PERMISSION_CONTROLLER_APP_ID),
        (known.settings, AppId::SYSTEM),
    ];
    entries
        .into_iter()
        .filter_map(|(name, app_id)| name.map(|name| InstalledPackage::new(name, app_id, Manifest::new(34)).system()))
        .collect()
}

/// A booted platform with recording test doubles.
pub struct TestPlatform {
    pub platform: ScopesPlatform,
    pub controller: Arc<RecordingController>,
    pub persister: Arc<MemoryPersister>,
}

impl TestPlatform {
    /// Boot a platform with the system packages installed and inline writes.
    pub fn new() -> Self {
        let mut config = ScopesConfig::default();
        config.store.write_back = false;
        Self::with_config(config)
    }

    pub fn with_config(config: ScopesConfig) -> Self {
        let controller = Arc::new(RecordingController::new());
        let persister = Arc::new(MemoryPersister::new());
        let platform = ScopesPlatform::new(config, persister.clone(), controller.clone())
            .expect("memory platform never fails to start");
        platform.boot(system_packages()).expect("boot from empty persister");
        Self {
            platform,
            controller,
            persister,
        }
    }

    /// Install an ordinary app and return its name.
    pub fn install_app(&self, name: &str, app_id: AppId, manifest: Manifest) -> PackageName {
        self.platform.install_package(InstalledPackage::new(name, app_id, manifest));
        PackageName::new(name)
    }

    /// Install packages sharing one runtime identity.
    pub fn install_shared_group(&self, names: &[&str], app_id: AppId, manifest: Manifest) -> Vec<PackageName> {
        names
            .iter()
            .map(|name| {
                self.platform
                    .install_package(InstalledPackage::new(*name, app_id, manifest.clone()).shared());
                PackageName::new(*name)
            })
            .collect()
    }

    /// The permission controller running in `user`.
    pub fn permission_controller(&self, user: UserId) -> Uid {
        Uid::new(user, PERMISSION_CONTROLLER_APP_ID)
    }

    pub fn launcher(&self, user: UserId) -> Uid {
        Uid::new(user, LAUNCHER_APP_ID)
    }

    pub fn media_provider(&self, user: UserId) -> Uid {
        Uid::new(user, MEDIA_PROVIDER_APP_ID)
    }

    pub fn contacts_provider(&self, user: UserId) -> Uid {
        Uid::new(user, CONTACTS_PROVIDER_APP_ID)
    }

    pub fn shell(&self) -> Uid {
        scopes::shell::shell_uid()
    }

    /// Turn storage scopes on for `package` as the permission controller.
    pub fn enable_storage_scopes(&self, package: &PackageName, user: UserId) -> bool {
        self.set_flags(package, user, BaseFlags::STORAGE_SCOPES_ENABLED)
    }

    /// Turn contact scopes on for `package` as the permission controller.
    pub fn enable_contact_scopes(&self, package: &PackageName, user: UserId) -> bool {
        self.set_flags(package, user, BaseFlags::CONTACT_SCOPES_ENABLED)
    }

    fn set_flags(&self, package: &PackageName, user: UserId, flags: BaseFlags) -> bool {
        let caller = self.permission_controller(user);
        let service = self.platform.service(caller);
        let mut editor = self.platform.edit(caller, package, user).expect("controller may read");
        editor.add_flags(flags);
        editor.apply(&service).expect("controller may write")
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}
