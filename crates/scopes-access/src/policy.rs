//! The caller privilege table.
//!
//! ## Overview
//!
//! Grants are keyed by app id. The system uid is special-cased by full uid,
//! since other members of its app id in secondary users are ordinary
//! privileged packages. A caller with no grant may only read its own
//! record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use scopes_core::{AppId, BaseFlags, PackageName, Uid, UserId};

use crate::audience::Audience;
use crate::error::{AccessError, Result};
use crate::grant::{AccessGrant, AccessKind, CrossUserAccess, RecordFields};

/// System packages that receive a fixed grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownRole {
    MediaProvider,
    ContactsProvider,
    Launcher,
    PermissionController,
    Settings,
}

impl KnownRole {
    pub const ALL: [Self; 5] = [
        Self::MediaProvider,
        Self::ContactsProvider,
        Self::Launcher,
        Self::PermissionController,
        Self::Settings,
    ];

    pub fn grant(self) -> AccessGrant {
        match self {
            KnownRole::MediaProvider => {
                AccessGrant::read_only(BaseFlags::STORAGE_SCOPES_ENABLED, RecordFields::STORAGE_SCOPES)
            }
            KnownRole::ContactsProvider => {
                AccessGrant::read_only(BaseFlags::CONTACT_SCOPES_ENABLED, RecordFields::CONTACT_SCOPES)
            }
            // Work profiles are handled by the launcher running in the parent user.
            KnownRole::Launcher => AccessGrant::read_only(BaseFlags::SCOPING_FEATURES, RecordFields::empty())
                .with_cross_user(CrossUserAccess::PROFILE_READS),
            KnownRole::PermissionController => AccessGrant::read_write(
                BaseFlags::SCOPING_FEATURES,
                RecordFields::STORAGE_SCOPES | RecordFields::CONTACT_SCOPES,
            ),
            KnownRole::Settings => AccessGrant {
                read_flags: BaseFlags::ALLOW_ACCESS_TO_OBB_DIRECTORY | BaseFlags::SCOPING_FEATURES,
                write_flags: BaseFlags::ALLOW_ACCESS_TO_OBB_DIRECTORY,
                read_fields: RecordFields::empty(),
                write_fields: RecordFields::empty(),
                cross_user: CrossUserAccess::empty(),
            },
        }
    }
}

/// App id → grant table.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    grants: HashMap<AppId, AccessGrant>,
}

impl AccessPolicy {
    /// Create the base table: the shell has full access, and so does root
    /// on debuggable builds.
    pub fn new(debuggable: bool) -> Self {
        let mut grants = HashMap::new();
        grants.insert(AppId::SHELL, AccessGrant::full());
        if debuggable {
            grants.insert(AppId::ROOT, AccessGrant::full());
        }
        Self { grants }
    }

    pub fn grant(&mut self, app_id: AppId, grant: AccessGrant) {
        self.grants.insert(app_id, grant);
    }

    /// Give `role`'s grant to an installed package.
    ///
    /// Only system packages may hold a grant.
    pub fn grant_role(
        &mut self,
        package: &PackageName,
        app_id: AppId,
        is_system: bool,
        role: KnownRole,
    ) -> Result<()> {
        if !is_system {
            return Err(AccessError::NotSystemPackage(package.to_string()));
        }
        debug!(package = %package, app_id = app_id.0, ?role, "granting state access");
        self.grant(app_id, role.grant());
        Ok(())
    }

    pub fn grant_for(&self, app_id: AppId) -> Option<&AccessGrant> {
        self.grants.get(&app_id)
    }

    /// Decide how `caller` may access the record of `target` in
    /// `target_user`.
    pub fn resolve<F>(
        &self,
        caller: Uid,
        target: AppId,
        target_user: UserId,
        kind: AccessKind,
        profile_parent: F,
    ) -> Result<Audience>
    where
        F: FnOnce(UserId) -> Option<UserId>,
    {
        let caller_app = caller.app_id();

        let audience = if caller == Uid::SYSTEM {
            Audience::Privileged(AccessGrant::system())
        } else if let Some(grant) = self.grants.get(&caller_app) {
            Audience::Privileged(*grant)
        } else if caller_app == target {
            Audience::Owner
        } else {
            debug!(caller = caller.0, target = target.0, "no access to state of other packages");
            return Err(AccessError::NotGranted { caller, target });
        };

        let grant = audience.grant();

        if kind == AccessKind::Write && !grant.can_write() {
            debug!(caller = caller.0, "write refused, grant is read-only");
            return Err(AccessError::ReadOnly { caller });
        }

        if !grant.allows_user(caller.user_id(), target_user, kind, profile_parent) {
            debug!(caller = caller.0, target_user = target_user.0, "cross-user access refused");
            return Err(AccessError::CrossUser { caller, target_user });
        }

        Ok(audience)
    }
}
