//! The per-package, per-user state record.
//!
//! A record is small and cheap to clone: scope lists are kept as encoded
//! [`Bytes`] blobs and shared between every holder of the record (members
//! of a shared identity, client caches). Blobs are decoded on demand.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::contact_scope::ContactScopeSet;
use crate::flags::{BaseFlags, DerivedFlags, EditorFlags};
use crate::storage_scope::{self, PathScope};

/// State attached to an installed package for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Persisted toggles.
    pub base_flags: BaseFlags,

    /// Encoded [`PathScope`] list, absent when the list is empty.
    pub path_scopes: Option<Bytes>,

    /// Encoded [`ContactScopeSet`], absent when the set is empty.
    pub contact_scopes: Option<Bytes>,

    /// Recomputed from the manifest; never persisted.
    #[serde(default)]
    pub derived_flags: DerivedFlags,
}

impl StateRecord {
    /// Create a record with the given base flags and no scopes.
    pub fn new(base_flags: BaseFlags) -> Self {
        Self {
            base_flags,
            ..Self::default()
        }
    }

    pub fn with_path_scopes(mut self, path_scopes: Option<Bytes>) -> Self {
        self.path_scopes = path_scopes;
        self
    }

    pub fn with_contact_scopes(mut self, contact_scopes: Option<Bytes>) -> Self {
        self.contact_scopes = contact_scopes;
        self
    }

    pub fn with_derived_flags(mut self, derived_flags: DerivedFlags) -> Self {
        self.derived_flags = derived_flags;
        self
    }

    /// True if all of `flags` are set.
    pub fn has_flags(&self, flags: BaseFlags) -> bool {
        self.base_flags.contains(flags)
    }

    /// True if all of `flags` are set in the derived flags.
    pub fn has_derived_flags(&self, flags: DerivedFlags) -> bool {
        self.derived_flags.contains(flags)
    }

    /// A record with no base flags carries no state and is not persisted.
    pub fn is_empty(&self) -> bool {
        self.base_flags.is_empty()
    }

    /// Decode the path scope list. Corrupt payloads decode to an empty list.
    pub fn path_scope_list(&self) -> Vec<PathScope> {
        storage_scope::decode(self.path_scopes.as_deref())
    }

    /// Decode the contact scope set. Corrupt payloads decode to an empty set.
    pub fn contact_scope_set(&self) -> ContactScopeSet {
        ContactScopeSet::decode(self.contact_scopes.as_deref())
    }
}

/// A mutation request submitted to the central store.
///
/// Carries the complete desired persisted state; the store filters it
/// against what the caller is allowed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub base_flags: BaseFlags,
    pub path_scopes: Option<Bytes>,
    pub contact_scopes: Option<Bytes>,
    pub editor_flags: EditorFlags,
}

impl StateUpdate {
    /// Start an update from the persisted parts of an existing record.
    pub fn from_record(record: &StateRecord) -> Self {
        Self {
            base_flags: record.base_flags,
            path_scopes: record.path_scopes.clone(),
            contact_scopes: record.contact_scopes.clone(),
            editor_flags: EditorFlags::empty(),
        }
    }

    pub fn kill_after_apply(&self) -> bool {
        self.editor_flags.contains(EditorFlags::KILL_UID_AFTER_APPLY)
    }

    pub fn notify_after_apply(&self) -> bool {
        self.editor_flags.contains(EditorFlags::NOTIFY_UID_AFTER_APPLY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact_scope::ContactScopeKind;
    use crate::storage_scope::PathScopeFlags;

    #[test]
    fn test_default_record_is_empty() {
        let record = StateRecord::default();
        assert!(record.is_empty());
        assert!(record.path_scope_list().is_empty());
        assert!(record.contact_scope_set().is_empty());
        assert!(!record.derived_flags.is_computed());
    }

    #[test]
    fn test_record_decodes_its_scopes() {
        let scopes = vec![PathScope::new("/sdcard/DCIM", PathScopeFlags::IS_DIR)];
        let mut contacts = ContactScopeSet::new();
        assert!(contacts.add(ContactScopeKind::Email, 9));

        let record = StateRecord::new(BaseFlags::STORAGE_SCOPES_ENABLED)
            .with_path_scopes(storage_scope::encode(&scopes))
            .with_contact_scopes(contacts.encode());

        assert_eq!(record.path_scope_list(), scopes);
        assert_eq!(record.contact_scope_set(), contacts);
    }

    #[test]
    fn test_update_from_record_drops_derived_flags() {
        let record = StateRecord::new(BaseFlags::CONTACT_SCOPES_ENABLED)
            .with_derived_flags(DerivedFlags::DFLAGS_SET);
        let update = StateUpdate::from_record(&record);
        assert_eq!(update.base_flags, BaseFlags::CONTACT_SCOPES_ENABLED);
        assert!(!update.kill_after_apply());
        assert!(!update.notify_after_apply());
    }
}
