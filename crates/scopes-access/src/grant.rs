//! Access grants: what a caller may read and write in a state record.
//!
//! A grant masks base flags and record fields separately for reads and
//! writes, and limits which users the caller may reach.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use scopes_core::{BaseFlags, UserId};

bitflags! {
    /// The optional payload fields of a record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RecordFields: u8 {
        const STORAGE_SCOPES = 1;
        const CONTACT_SCOPES = 1 << 1;
    }
}

bitflags! {
    /// Access to users other than the caller's own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CrossUserAccess: u8 {
        /// Read records of profiles whose parent is the caller's user.
        const PROFILE_READS = 1;
        const PROFILE_WRITES = 1 << 1;
        /// Read records of any user or profile.
        const ANY_USER_READS = 1 << 2;
        const ANY_USER_WRITES = 1 << 3;
    }
}

/// Kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

/// What a caller may see and change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub read_flags: BaseFlags,
    pub write_flags: BaseFlags,
    pub read_fields: RecordFields,
    pub write_fields: RecordFields,
    pub cross_user: CrossUserAccess,
}

impl AccessGrant {
    pub const fn read_only(flags: BaseFlags, fields: RecordFields) -> Self {
        Self {
            read_flags: flags,
            write_flags: BaseFlags::empty(),
            read_fields: fields,
            write_fields: RecordFields::empty(),
            cross_user: CrossUserAccess::empty(),
        }
    }

    pub const fn read_write(flags: BaseFlags, fields: RecordFields) -> Self {
        Self {
            read_flags: flags,
            write_flags: flags,
            read_fields: fields,
            write_fields: fields,
            cross_user: CrossUserAccess::empty(),
        }
    }

    pub fn with_cross_user(mut self, cross_user: CrossUserAccess) -> Self {
        self.cross_user = cross_user;
        self
    }

    /// Everything, in every user. Bits unknown to this build included.
    pub const fn full() -> Self {
        Self {
            read_flags: BaseFlags::from_raw(u32::MAX),
            write_flags: BaseFlags::from_raw(u32::MAX),
            read_fields: RecordFields::all(),
            write_fields: RecordFields::all(),
            cross_user: CrossUserAccess::ANY_USER_READS.union(CrossUserAccess::ANY_USER_WRITES),
        }
    }

    /// The system identity itself.
    ///
    /// Reads everything. Writes the OBB toggle and the contact scopes field,
    /// the latter so stale contact ids can be dropped when the contacts
    /// database is wiped.
    pub const fn system() -> Self {
        Self {
            read_flags: BaseFlags::from_raw(u32::MAX),
            write_flags: BaseFlags::ALLOW_ACCESS_TO_OBB_DIRECTORY,
            read_fields: RecordFields::all(),
            write_fields: RecordFields::CONTACT_SCOPES,
            cross_user: CrossUserAccess::ANY_USER_READS.union(CrossUserAccess::ANY_USER_WRITES),
        }
    }

    /// A package reading its own record.
    pub const fn owner() -> Self {
        Self::read_only(BaseFlags::VISIBLE_TO_OWNER, RecordFields::empty())
    }

    /// Each field is tied to a flag, so write flags alone decide this.
    pub fn can_write(&self) -> bool {
        !self.write_flags.is_empty()
    }

    /// Whether a caller in `caller_user` may reach `target_user`.
    ///
    /// `profile_parent` maps a profile to the user that owns it.
    pub fn allows_user<F>(
        &self,
        caller_user: UserId,
        target_user: UserId,
        kind: AccessKind,
        profile_parent: F,
    ) -> bool
    where
        F: FnOnce(UserId) -> Option<UserId>,
    {
        if caller_user == target_user {
            return true;
        }

        let (any_user, profile) = match kind {
            AccessKind::Read => (CrossUserAccess::ANY_USER_READS, CrossUserAccess::PROFILE_READS),
            AccessKind::Write => (CrossUserAccess::ANY_USER_WRITES, CrossUserAccess::PROFILE_WRITES),
        };

        if self.cross_user.contains(any_user) {
            return true;
        }

        self.cross_user.contains(profile) && profile_parent(target_user) == Some(caller_user)
    }
}
