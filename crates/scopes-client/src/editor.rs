//! Builder for state updates.

use bytes::Bytes;
use tracing::debug;

use scopes_core::{BaseFlags, EditorFlags, PackageName, StateRecord, StateService, StateUpdate, UserId};

use crate::error::Result;

/// Accumulates changes to one package's record and applies them in one
/// update.
///
/// Starts from the persisted parts of the current record, so flags and
/// scopes the editor does not touch are written back unchanged.
#[derive(Debug, Clone)]
pub struct StateEditor {
    package: PackageName,
    user: UserId,
    update: StateUpdate,
}

impl StateEditor {
    /// Edit starting from `current`, or from an empty record.
    pub fn new(package: PackageName, user: UserId, current: Option<&StateRecord>) -> Self {
        let update = current.map(StateUpdate::from_record).unwrap_or_default();
        Self { package, user, update }
    }

    /// Edit the record as the service currently reports it.
    pub fn load<S: StateService + ?Sized>(service: &S, package: PackageName, user: UserId) -> Result<Self> {
        let current = service.get_state(&package, user)?;
        Ok(Self::new(package, user, current.as_ref()))
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn base_flags(&self) -> BaseFlags {
        self.update.base_flags
    }

    pub fn set_flags_state(&mut self, flags: BaseFlags, state: bool) -> &mut Self {
        self.update.base_flags.set(flags, state);
        self
    }

    pub fn add_flags(&mut self, flags: BaseFlags) -> &mut Self {
        self.set_flags_state(flags, true)
    }

    pub fn clear_flags(&mut self, flags: BaseFlags) -> &mut Self {
        self.set_flags_state(flags, false)
    }

    pub fn set_path_scopes(&mut self, path_scopes: Option<Bytes>) -> &mut Self {
        self.update.path_scopes = path_scopes;
        self
    }

    pub fn set_contact_scopes(&mut self, contact_scopes: Option<Bytes>) -> &mut Self {
        self.update.contact_scopes = contact_scopes;
        self
    }

    pub fn set_kill_uid_after_apply(&mut self, value: bool) -> &mut Self {
        self.update.editor_flags.set(EditorFlags::KILL_UID_AFTER_APPLY, value);
        self
    }

    pub fn set_notify_uid_after_apply(&mut self, value: bool) -> &mut Self {
        self.update.editor_flags.set(EditorFlags::NOTIFY_UID_AFTER_APPLY, value);
        self
    }

    /// The update this editor would send.
    pub fn to_update(&self) -> StateUpdate {
        self.update.clone()
    }

    /// Send the update.
    ///
    /// Returns false when the package is not installed or cannot carry a
    /// record.
    pub fn apply<S: StateService + ?Sized>(&self, service: &S) -> Result<bool> {
        let applied = service.update_state(&self.package, self.user, self.update.clone())?;
        debug!(package = %self.package, user = self.user.0, applied, "state editor applied");
        Ok(applied)
    }
}
