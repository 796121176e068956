//! The central store: single source of truth for package state.
//!
//! ## Overview
//!
//! Records are keyed by (package, user). Packages sharing a runtime
//! identity share one record: an update is applied to every member of the
//! group under one write lock, and a member without its own record falls
//! back to the group's.
//!
//! Every committed update advances the [`CacheNonce`] so client caches in
//! every process drop what they hold. Persistence is scheduled while the
//! lock is held, which keeps per-user snapshots in commit order, and runs
//! on the write-back worker.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use scopes_access::{AccessKind, AccessPolicy, Audience};
use scopes_core::{
    spoof, AppId, BaseFlags, CacheNonce, DerivedFlags, FlagDerivationEngine, GroupMember, PackageName,
    StateRecord, StateUpdate, Uid, UserId,
};

use crate::config::StoreConfig;
use crate::controller::{NoopController, ProcessController};
use crate::error::Result;
use crate::memory::MemoryPersister;
use crate::package::InstalledPackage;
use crate::traits::{PersistedRow, Persister};
use crate::writeback::{self, WriteBack};

#[derive(Default)]
struct Inner {
    packages: HashMap<PackageName, InstalledPackage>,
    states: HashMap<UserId, BTreeMap<PackageName, StateRecord>>,
    /// profile → parent user
    profile_parents: HashMap<UserId, UserId>,
    policy: AccessPolicy,
}

impl Inner {
    fn resolve(&self, caller: Uid, target: AppId, user: UserId, kind: AccessKind) -> Result<Audience> {
        let audience = self
            .policy
            .resolve(caller, target, user, kind, |u| self.profile_parents.get(&u).copied())?;
        Ok(audience)
    }

    /// The package and every package sharing its identity, in name order.
    fn group<'a>(&'a self, pkg: &'a InstalledPackage) -> Vec<&'a InstalledPackage> {
        if !pkg.shared_user {
            return vec![pkg];
        }
        let mut members: Vec<_> = self
            .packages
            .values()
            .filter(|p| p.shares_identity_with(pkg))
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }

    fn record(&self, pkg: &InstalledPackage, user: UserId) -> Option<&StateRecord> {
        let states = self.states.get(&user)?;
        if let Some(record) = states.get(&pkg.name) {
            return Some(record);
        }
        // A member installed after the last update has no record of its own yet.
        self.group(pkg)
            .into_iter()
            .find_map(|member| states.get(&member.name))
    }

    fn rows_for_user(&self, user: UserId) -> Vec<PersistedRow> {
        self.states
            .get(&user)
            .map(|states| {
                states
                    .iter()
                    .filter_map(|(name, record)| PersistedRow::from_record(name, user, record))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The source of truth for every package state record.
pub struct CentralStore {
    inner: RwLock<Inner>,
    config: StoreConfig,
    derivation: FlagDerivationEngine,
    nonce: CacheNonce,
    controller: Arc<dyn ProcessController>,
    persister: Arc<dyn Persister>,
    writeback: Option<WriteBack>,
}

impl CentralStore {
    /// Create an empty store.
    pub fn new(
        config: StoreConfig,
        persister: Arc<dyn Persister>,
        controller: Arc<dyn ProcessController>,
    ) -> Result<Self> {
        let writeback = if config.write_back {
            Some(WriteBack::spawn(persister.clone())?)
        } else {
            None
        };

        Ok(Self {
            inner: RwLock::new(Inner {
                policy: AccessPolicy::new(config.debuggable),
                ..Inner::default()
            }),
            config,
            derivation: FlagDerivationEngine::new(),
            nonce: CacheNonce::new(),
            controller,
            persister,
            writeback,
        })
    }

    /// An unpersisted store with no process controller.
    pub fn in_memory(config: StoreConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryPersister::new()), Arc::new(NoopController))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A handle to the invalidation token clients watch.
    pub fn cache_nonce(&self) -> CacheNonce {
        self.nonce.clone()
    }

    pub fn derivation(&self) -> &FlagDerivationEngine {
        &self.derivation
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Package Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an installed package, replacing an earlier install.
    ///
    /// Records survive upgrades. A changed app id means a different
    /// identity, so the old records are dropped.
    pub fn install_package(&self, pkg: InstalledPackage) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if let Some(old) = inner.packages.get(&pkg.name) {
            if old.app_id != pkg.app_id {
                for states in inner.states.values_mut() {
                    states.remove(&pkg.name);
                }
            }
        }

        debug!(package = %pkg.name, app_id = pkg.app_id.0, revision = pkg.revision, "package installed");
        self.derivation.forget(&pkg.name);
        inner.packages.insert(pkg.name.clone(), pkg);
        self.nonce.advance();
    }

    pub fn is_installed(&self, package: &PackageName) -> bool {
        self.inner.read().packages.contains_key(package)
    }

    pub fn package(&self, package: &PackageName) -> Option<InstalledPackage> {
        self.inner.read().packages.get(package).cloned()
    }

    /// Record that `profile` belongs to `parent`.
    pub fn add_profile(&self, profile: UserId, parent: UserId) {
        self.inner.write().profile_parents.insert(profile, parent);
    }

    /// Give the configured system packages their grants.
    ///
    /// Packages that are missing or not system packages are skipped.
    pub fn grant_known_packages(&self) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        for (role, name) in self.config.known_packages.iter() {
            match inner.packages.get(name) {
                Some(pkg) => match inner.policy.grant_role(name, pkg.app_id, pkg.system, role) {
                    Ok(()) => debug!(package = %name, ?role, "known package granted"),
                    Err(e) => warn!(package = %name, ?role, error = %e, "known package grant refused"),
                },
                None => warn!(package = %name, ?role, "known package not installed"),
            }
        }
    }

    /// Load persisted rows of installed packages.
    ///
    /// Returns the number of records restored.
    pub fn restore(&self) -> Result<usize> {
        let rows = self.persister.load_all()?;

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let mut restored = 0;

        for row in rows {
            let eligible = inner
                .packages
                .get(&row.package)
                .map(InstalledPackage::can_carry_state)
                .unwrap_or(false);
            if !eligible {
                debug!(package = %row.package, user = row.user.0, "skipping persisted state of unknown package");
                continue;
            }
            if let Some(record) = row.to_record() {
                inner
                    .states
                    .entry(row.user)
                    .or_default()
                    .insert(row.package.clone(), record);
                restored += 1;
            }
        }

        self.nonce.advance();
        info!(restored, "package state restored");
        Ok(restored)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The view of `package`'s record in `user` that `caller` may see.
    ///
    /// `Ok(None)` when the package is not installed, cannot carry state,
    /// or has no record visible to the caller. Callers with no right to
    /// the record get [`StoreError::AccessDenied`](crate::StoreError::AccessDenied).
    pub fn get(&self, caller: Uid, package: &PackageName, user: UserId) -> Result<Option<StateRecord>> {
        let inner = self.inner.read();

        let Some(pkg) = inner.packages.get(package) else {
            return Ok(None);
        };
        if !pkg.can_carry_state() {
            return Ok(None);
        }

        let audience = inner.resolve(caller, pkg.app_id, user, AccessKind::Read)?;

        let Some(record) = inner.record(pkg, user) else {
            return Ok(None);
        };

        let derived = self.derive(&inner, pkg, record.base_flags);
        Ok(audience.read_view(record, derived))
    }

    fn derive(&self, inner: &Inner, pkg: &InstalledPackage, base_flags: BaseFlags) -> DerivedFlags {
        let members: Vec<GroupMember<'_>> = inner
            .group(pkg)
            .into_iter()
            .map(|p| GroupMember {
                package: &p.name,
                revision: p.revision,
                manifest: &p.manifest,
            })
            .collect();
        self.derivation.maybe_derive(base_flags, &members)
    }

    /// Whether a real runtime grant of `permission` to `package` must be
    /// refused because a scoping feature replaces it.
    pub fn should_block_runtime_grant(&self, permission: &str, package: &PackageName, user: UserId) -> bool {
        let inner = self.inner.read();
        let record = inner
            .packages
            .get(package)
            .and_then(|pkg| inner.record(pkg, user));
        let blocked = spoof::should_block_runtime_grant(permission, record);
        if blocked {
            debug!(package = %package, permission, "refusing runtime grant, scopes enabled");
        }
        blocked
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `update` on behalf of `caller`.
    ///
    /// Returns `Ok(false)` when the package is not installed or cannot
    /// carry state. Process kill and notification requested by the update's
    /// editor flags happen after the commit, outside the lock.
    pub fn update(
        &self,
        caller: Uid,
        package: &PackageName,
        user: UserId,
        update: StateUpdate,
    ) -> Result<bool> {
        let app_id = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;

            let Some(pkg) = inner.packages.get(package) else {
                debug!(package = %package, "update of package that is not installed");
                return Ok(false);
            };
            if !pkg.can_carry_state() {
                debug!(package = %package, "package cannot carry state");
                return Ok(false);
            }

            let app_id = pkg.app_id;
            let audience = inner.resolve(caller, app_id, user, AccessKind::Write)?;
            let updated = audience.filter_write(inner.record(pkg, user), &update);
            let members: Vec<PackageName> = inner.group(pkg).into_iter().map(|p| p.name.clone()).collect();

            let states = inner.states.entry(user).or_default();
            for name in members {
                match &updated {
                    Some(record) => {
                        states.insert(name, record.clone());
                    }
                    None => {
                        states.remove(&name);
                    }
                }
            }

            self.nonce.advance();
            self.persist(user, inner.rows_for_user(user));
            app_id
        };

        info!(
            package = %package,
            user = user.0,
            caller = caller.0,
            flags = update.base_flags.bits(),
            "package state updated"
        );

        if update.kill_after_apply() {
            info!(app_id = app_id.0, user = user.0, "killing uid after state change");
            self.controller.kill_uid(app_id, user, "package state changed");
        }

        if update.notify_after_apply() {
            let uid = Uid::new(user, app_id);
            let view = self.get(uid, package, user).unwrap_or_else(|e| {
                warn!(error = %e, "owner view unavailable for notification");
                None
            });
            self.controller.on_state_changed(uid, view.as_ref());
        }

        Ok(true)
    }

    fn persist(&self, user: UserId, rows: Vec<PersistedRow>) {
        match &self.writeback {
            Some(wb) => wb.schedule(user, rows),
            None => writeback::write_now(self.persister.as_ref(), user, &rows),
        }
    }

    /// Block until scheduled writes are durable.
    ///
    /// Must not be called from within an async runtime.
    pub fn flush(&self) -> Result<()> {
        match &self.writeback {
            Some(wb) => wb.flush(),
            None => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance Hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop every record of an uninstalled package.
    pub fn on_package_removed(&self, package: &PackageName) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if inner.packages.remove(package).is_none() {
            return;
        }

        let affected: Vec<UserId> = inner
            .states
            .iter_mut()
            .filter_map(|(user, states)| states.remove(package).map(|_| *user))
            .collect();

        self.derivation.forget(package);
        self.nonce.advance();

        for user in affected {
            self.persist(user, inner.rows_for_user(user));
        }
        info!(package = %package, "package removed, state dropped");
    }

    /// Clearing the contacts provider's data invalidates every contact id
    /// held in contact scopes of that user.
    pub fn on_clear_application_user_data(&self, package: &PackageName, user: UserId) {
        if self.config.known_packages.contacts_provider.as_ref() != Some(package) {
            return;
        }

        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let Some(states) = inner.states.get_mut(&user) else {
            return;
        };
        let mut cleared = 0usize;
        for record in states.values_mut() {
            if record.contact_scopes.take().is_some() {
                cleared += 1;
            }
        }
        if cleared == 0 {
            return;
        }

        self.nonce.advance();
        self.persist(user, inner.rows_for_user(user));
        info!(user = user.0, cleared, "contacts provider data cleared, contact scopes dropped");
    }
}
