//! The platform: one central store plus the processes talking to it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use scopes_client::StateEditor;
use scopes_core::{AppId, PackageName, StateRecord, Uid, UserId};
use scopes_store::{
    BoundService, CentralStore, InstalledPackage, MemoryPersister, NoopController, Persister, ProcessController,
    SqlitePersister,
};

use crate::config::ScopesConfig;
use crate::error::{Result, ScopesError};
use crate::process::ProcessContext;

/// A process context talking to the central store of this platform.
pub type AppProcess = ProcessContext<BoundService>;

/// Routes state change notifications to the live process contexts of the
/// notified uid before handing them to the embedder's controller.
struct ProcessDispatcher {
    controller: Arc<dyn ProcessController>,
    processes: Mutex<HashMap<Uid, Vec<Weak<AppProcess>>>>,
}

impl ProcessDispatcher {
    fn new(controller: Arc<dyn ProcessController>) -> Self {
        Self {
            controller,
            processes: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, process: &Arc<AppProcess>) {
        let mut processes = self.processes.lock();
        let list = processes.entry(process.uid()).or_default();
        list.retain(|p| p.strong_count() > 0);
        list.push(Arc::downgrade(process));
    }

    fn live(&self, uid: Uid) -> Vec<Arc<AppProcess>> {
        let mut processes = self.processes.lock();
        let Some(list) = processes.get_mut(&uid) else {
            return Vec::new();
        };
        list.retain(|p| p.strong_count() > 0);
        list.iter().filter_map(Weak::upgrade).collect()
    }
}

impl ProcessController for ProcessDispatcher {
    fn kill_uid(&self, app_id: AppId, user: UserId, reason: &str) {
        self.controller.kill_uid(app_id, user, reason);
    }

    fn on_state_changed(&self, uid: Uid, owner_view: Option<&StateRecord>) {
        // Processes are called outside the registry lock.
        let processes = self.live(uid);
        debug!(uid = uid.0, processes = processes.len(), "delivering state change");
        for process in processes {
            process.on_state_changed(owner_view);
        }
        self.controller.on_state_changed(uid, owner_view);
    }
}

/// Wires a [`CentralStore`] with the per-process contexts that read it.
///
/// Provides a unified API for:
/// - Booting the store from installed packages and persisted state
/// - Starting process contexts
/// - Editing records as a privileged caller
/// - Package lifecycle events
pub struct ScopesPlatform {
    store: Arc<CentralStore>,
    dispatcher: Arc<ProcessDispatcher>,
    config: ScopesConfig,
}

impl ScopesPlatform {
    /// Create a platform persisting through `persister`.
    pub fn new(
        config: ScopesConfig,
        persister: Arc<dyn Persister>,
        controller: Arc<dyn ProcessController>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(ProcessDispatcher::new(controller));
        let store = CentralStore::new(config.store.clone(), persister, dispatcher.clone())?;
        Ok(Self {
            store: Arc::new(store),
            dispatcher,
            config,
        })
    }

    /// Create a platform persisting to a SQLite database at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        config: ScopesConfig,
        controller: Arc<dyn ProcessController>,
    ) -> Result<Self> {
        let persister = SqlitePersister::open(path)?;
        Self::new(config, Arc::new(persister), controller)
    }

    /// Create an unpersisted platform.
    pub fn in_memory(config: ScopesConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryPersister::new()), Arc::new(NoopController))
    }

    pub fn store(&self) -> &Arc<CentralStore> {
        &self.store
    }

    pub fn config(&self) -> &ScopesConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `packages`, grant the known system packages their access
    /// and restore persisted records.
    ///
    /// Returns the number of records restored.
    pub fn boot<I>(&self, packages: I) -> Result<usize>
    where
        I: IntoIterator<Item = InstalledPackage>,
    {
        let mut installed = 0;
        for pkg in packages {
            self.store.install_package(pkg);
            installed += 1;
        }
        self.store.grant_known_packages();
        let restored = self.store.restore()?;
        info!(installed, restored, "platform booted");
        Ok(restored)
    }

    pub fn install_package(&self, pkg: InstalledPackage) {
        self.store.install_package(pkg);
    }

    pub fn remove_package(&self, package: &PackageName) {
        self.store.on_package_removed(package);
    }

    pub fn clear_application_user_data(&self, package: &PackageName, user: UserId) {
        self.store.on_clear_application_user_data(package, user);
    }

    /// Block until queued writes are durable.
    pub fn flush(&self) -> Result<()> {
        Ok(self.store.flush()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Callers
    // ─────────────────────────────────────────────────────────────────────────

    /// A service handle acting as `caller`.
    pub fn service(&self, caller: Uid) -> BoundService {
        self.store.bind(caller)
    }

    /// Start the context of a process running `package` in `user`.
    ///
    /// The context reads its own record once at bind time and receives
    /// every state change notified for its uid while it is alive.
    pub fn spawn_process(&self, package: &PackageName, user: UserId) -> Result<Arc<AppProcess>> {
        let pkg = self
            .store
            .package(package)
            .ok_or_else(|| ScopesError::PackageNotFound(package.clone()))?;
        let uid = Uid::new(user, pkg.app_id);
        let process = Arc::new(ProcessContext::new(
            uid,
            package.clone(),
            self.service(uid),
            self.store.cache_nonce(),
            self.config.cache,
        ));
        process.on_bind();
        self.dispatcher.register(&process);
        Ok(process)
    }

    /// An editor over `package`'s record as `caller` sees it.
    pub fn edit(&self, caller: Uid, package: &PackageName, user: UserId) -> Result<StateEditor> {
        Ok(StateEditor::load(&self.service(caller), package.clone(), user)?)
    }

    /// The record of `package` as `caller` sees it.
    pub fn get(&self, caller: Uid, package: &PackageName, user: UserId) -> Result<Option<StateRecord>> {
        Ok(self.store.get(caller, package, user)?)
    }
}
