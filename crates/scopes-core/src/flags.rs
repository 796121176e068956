//! Flag sets carried by a package state record.
//!
//! Base flags are persisted toggles set by the user or an administrator.
//! Derived flags are recomputed from the package manifest and never
//! persisted. Editor flags travel with an update request only.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Persisted, explicitly-set toggles.
    ///
    /// Bits 2..=4 belonged to retired features and must not be reused:
    /// records written by older builds may still carry them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BaseFlags: u32 {
        const STORAGE_SCOPES_ENABLED = 1;
        /// Checked only when the package can install other packages.
        const ALLOW_ACCESS_TO_OBB_DIRECTORY = 1 << 1;
        const CONTACT_SCOPES_ENABLED = 1 << 5;
    }
}

impl BaseFlags {
    /// Flags the owning package may observe about itself.
    pub const VISIBLE_TO_OWNER: Self = Self::STORAGE_SCOPES_ENABLED
        .union(Self::ALLOW_ACCESS_TO_OBB_DIRECTORY)
        .union(Self::CONTACT_SCOPES_ENABLED);

    /// Flags that turn on manifest-based derivation.
    pub const SCOPING_FEATURES: Self =
        Self::STORAGE_SCOPES_ENABLED.union(Self::CONTACT_SCOPES_ENABLED);

    /// Build from a raw persisted value, keeping unknown bits.
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }
}

bitflags! {
    /// Flags derived from the package's manifest declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DerivedFlags: u32 {
        /// Distinguishes "derived, nothing set" from "not derived yet".
        const DFLAGS_SET = 1;
        const EXPECTS_ALL_FILES_ACCESS = 1 << 1;
        const EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY = 1 << 2;
        const EXPECTS_STORAGE_WRITE_ACCESS = 1 << 3;
        const HAS_READ_EXTERNAL_STORAGE_DECLARATION = 1 << 4;
        const HAS_WRITE_EXTERNAL_STORAGE_DECLARATION = 1 << 5;
        const HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION = 1 << 6;
        const HAS_MANAGE_MEDIA_DECLARATION = 1 << 7;
        const HAS_ACCESS_MEDIA_LOCATION_DECLARATION = 1 << 8;
        const HAS_READ_MEDIA_AUDIO_DECLARATION = 1 << 9;
        const HAS_READ_MEDIA_IMAGES_DECLARATION = 1 << 10;
        const HAS_READ_MEDIA_VIDEO_DECLARATION = 1 << 11;
        const EXPECTS_LEGACY_EXTERNAL_STORAGE = 1 << 12;
        const HAS_READ_MEDIA_VISUAL_USER_SELECTED_DECLARATION = 1 << 13;
        const HAS_READ_CONTACTS_DECLARATION = 1 << 14;
        const HAS_WRITE_CONTACTS_DECLARATION = 1 << 15;
        const HAS_GET_ACCOUNTS_DECLARATION = 1 << 16;
    }
}

impl DerivedFlags {
    /// Derived flags the owning package may observe about itself.
    ///
    /// The owner needs all of them for its own spoof decisions.
    pub const VISIBLE_TO_OWNER: Self = Self::all();

    /// Declarations that make a manage-media declaration meaningful.
    pub const MANAGE_MEDIA_PAIRED_READS: Self = Self::HAS_READ_EXTERNAL_STORAGE_DECLARATION
        .union(Self::HAS_READ_MEDIA_AUDIO_DECLARATION)
        .union(Self::HAS_READ_MEDIA_IMAGES_DECLARATION)
        .union(Self::HAS_READ_MEDIA_VIDEO_DECLARATION)
        .union(Self::HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION);

    /// Declarations that make an access-media-location declaration meaningful.
    pub const MEDIA_LOCATION_PAIRED_READS: Self = Self::HAS_READ_EXTERNAL_STORAGE_DECLARATION
        .union(Self::HAS_READ_MEDIA_IMAGES_DECLARATION)
        .union(Self::HAS_READ_MEDIA_VIDEO_DECLARATION)
        .union(Self::HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION);

    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Whether derivation has run for this value.
    pub const fn is_computed(self) -> bool {
        self.contains(Self::DFLAGS_SET)
    }
}

bitflags! {
    /// Options attached to a single update request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EditorFlags: u32 {
        /// Terminate the target's running processes once the update is committed.
        const KILL_UID_AFTER_APPLY = 1;
        /// Deliver the owner's view of the new record to its running processes.
        const NOTIFY_UID_AFTER_APPLY = 1 << 1;
    }
}
