//! The two audiences a record is exposed to, and the pure masking rules
//! for each.

use scopes_core::{DerivedFlags, StateRecord, StateUpdate};

use crate::grant::{AccessGrant, RecordFields};

/// Who is looking at a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The package the record belongs to, with no explicit grant.
    Owner,
    /// A caller holding an explicit grant.
    Privileged(AccessGrant),
}

impl Audience {
    /// The grant the audience reads and writes through.
    pub fn grant(&self) -> AccessGrant {
        match self {
            Audience::Owner => AccessGrant::owner(),
            Audience::Privileged(grant) => *grant,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Audience::Owner)
    }

    pub fn read_view(&self, record: &StateRecord, derived: DerivedFlags) -> Option<StateRecord> {
        read_view(&self.grant(), record, derived)
    }

    pub fn filter_write(&self, current: Option<&StateRecord>, update: &StateUpdate) -> Option<StateRecord> {
        filter_write(&self.grant(), current, update)
    }
}

/// Project `record` through `grant` for reading.
///
/// Base flags and fields outside the grant are dropped. A projection with
/// no visible base flags is reported as absent.
pub fn read_view(grant: &AccessGrant, record: &StateRecord, derived: DerivedFlags) -> Option<StateRecord> {
    let base_flags = record.base_flags & grant.read_flags;
    if base_flags.is_empty() {
        return None;
    }

    Some(StateRecord {
        base_flags,
        path_scopes: grant
            .read_fields
            .contains(RecordFields::STORAGE_SCOPES)
            .then(|| record.path_scopes.clone())
            .flatten(),
        contact_scopes: grant
            .read_fields
            .contains(RecordFields::CONTACT_SCOPES)
            .then(|| record.contact_scopes.clone())
            .flatten(),
        derived_flags: derived,
    })
}

/// Merge `update` into `current` through `grant`.
///
/// Returns the record to store, or `None` when the merged base flags are
/// empty and the record should be removed. Derived flags are never
/// written.
pub fn filter_write(
    grant: &AccessGrant,
    current: Option<&StateRecord>,
    update: &StateUpdate,
) -> Option<StateRecord> {
    let default = StateRecord::default();
    let current = current.unwrap_or(&default);

    let base_flags = (current.base_flags & !grant.write_flags) | (update.base_flags & grant.write_flags);
    if base_flags.is_empty() {
        return None;
    }

    let path_scopes = if grant.write_fields.contains(RecordFields::STORAGE_SCOPES) {
        update.path_scopes.clone()
    } else {
        current.path_scopes.clone()
    };

    let contact_scopes = if grant.write_fields.contains(RecordFields::CONTACT_SCOPES) {
        update.contact_scopes.clone()
    } else {
        current.contact_scopes.clone()
    };

    Some(StateRecord {
        base_flags,
        path_scopes,
        contact_scopes,
        derived_flags: DerivedFlags::empty(),
    })
}
