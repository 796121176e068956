//! Spoof decisions for permission and app-op checks.
//!
//! ## Overview
//!
//! Every spoofable check is registered once in [`SPOOF_RULES`] together
//! with the base flag that enables its feature and the declaration it
//! stands in for. A check is spoofed only when both are present in the
//! package's record. Checks without a rule are never spoofed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::flags::{BaseFlags, DerivedFlags};
use crate::manifest::permission;
use crate::state::StateRecord;

/// App-op identifiers the scoping features care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppOp {
    ReadExternalStorage,
    WriteExternalStorage,
    ReadMediaAudio,
    ReadMediaImages,
    ReadMediaVideo,
    ManageExternalStorage,
    ManageMedia,
    AccessMediaLocation,
    ReadContacts,
    WriteContacts,
    GetAccounts,
    Camera,
    RecordAudio,
    FineLocation,
}

impl AppOp {
    const ALL: [Self; 14] = [
        Self::ReadExternalStorage,
        Self::WriteExternalStorage,
        Self::ReadMediaAudio,
        Self::ReadMediaImages,
        Self::ReadMediaVideo,
        Self::ManageExternalStorage,
        Self::ManageMedia,
        Self::AccessMediaLocation,
        Self::ReadContacts,
        Self::WriteContacts,
        Self::GetAccounts,
        Self::Camera,
        Self::RecordAudio,
        Self::FineLocation,
    ];

    /// The op's public string name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadExternalStorage => "android:read_external_storage",
            Self::WriteExternalStorage => "android:write_external_storage",
            Self::ReadMediaAudio => "android:read_media_audio",
            Self::ReadMediaImages => "android:read_media_images",
            Self::ReadMediaVideo => "android:read_media_video",
            Self::ManageExternalStorage => "android:manage_external_storage",
            Self::ManageMedia => "android:manage_media",
            Self::AccessMediaLocation => "android:access_media_location",
            Self::ReadContacts => "android:read_contacts",
            Self::WriteContacts => "android:write_contacts",
            Self::GetAccounts => "android:get_accounts",
            Self::Camera => "android:camera",
            Self::RecordAudio => "android:record_audio",
            Self::FineLocation => "android:fine_location",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for AppOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A check that may be answered from scope state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoofableCheck<'a> {
    Permission(&'a str),
    AppOp(AppOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKey {
    Permission(&'static str),
    AppOp(AppOp),
}

impl RuleKey {
    fn matches(self, check: SpoofableCheck<'_>) -> bool {
        match (self, check) {
            (RuleKey::Permission(a), SpoofableCheck::Permission(b)) => a == b,
            (RuleKey::AppOp(a), SpoofableCheck::AppOp(b)) => a == b,
            _ => false,
        }
    }
}

/// A registered spoofable check.
#[derive(Debug, Clone, Copy)]
pub struct SpoofRule {
    key: RuleKey,
    /// Base flag that turns the feature on.
    pub feature: BaseFlags,
    /// Declaration the package must have for the spoofed answer to be
    /// meaningful.
    pub declaration: DerivedFlags,
    /// Whether a real grant is refused while the feature is enabled.
    pub blocks_real_grant: bool,
}

const fn storage(key: RuleKey, declaration: DerivedFlags) -> SpoofRule {
    SpoofRule {
        key,
        feature: BaseFlags::STORAGE_SCOPES_ENABLED,
        declaration,
        blocks_real_grant: false,
    }
}

const fn contacts(key: RuleKey, declaration: DerivedFlags) -> SpoofRule {
    SpoofRule {
        key,
        feature: BaseFlags::CONTACT_SCOPES_ENABLED,
        declaration,
        // The scoped provider only works while the real grant is absent.
        blocks_real_grant: matches!(key, RuleKey::Permission(_)),
    }
}

/// The single registry of spoofable checks.
pub static SPOOF_RULES: &[SpoofRule] = &[
    // storage permissions
    storage(
        RuleKey::Permission(permission::READ_EXTERNAL_STORAGE),
        DerivedFlags::HAS_READ_EXTERNAL_STORAGE_DECLARATION,
    ),
    storage(
        RuleKey::Permission(permission::WRITE_EXTERNAL_STORAGE),
        DerivedFlags::HAS_WRITE_EXTERNAL_STORAGE_DECLARATION,
    ),
    storage(
        RuleKey::Permission(permission::ACCESS_MEDIA_LOCATION),
        DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION,
    ),
    storage(
        RuleKey::Permission(permission::READ_MEDIA_AUDIO),
        DerivedFlags::HAS_READ_MEDIA_AUDIO_DECLARATION,
    ),
    storage(
        RuleKey::Permission(permission::READ_MEDIA_IMAGES),
        DerivedFlags::HAS_READ_MEDIA_IMAGES_DECLARATION,
    ),
    storage(
        RuleKey::Permission(permission::READ_MEDIA_VIDEO),
        DerivedFlags::HAS_READ_MEDIA_VIDEO_DECLARATION,
    ),
    // storage ops
    storage(
        RuleKey::AppOp(AppOp::ReadExternalStorage),
        DerivedFlags::HAS_READ_EXTERNAL_STORAGE_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::WriteExternalStorage),
        DerivedFlags::HAS_WRITE_EXTERNAL_STORAGE_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::ReadMediaAudio),
        DerivedFlags::HAS_READ_MEDIA_AUDIO_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::ReadMediaImages),
        DerivedFlags::HAS_READ_MEDIA_IMAGES_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::ReadMediaVideo),
        DerivedFlags::HAS_READ_MEDIA_VIDEO_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::ManageExternalStorage),
        DerivedFlags::HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::ManageMedia),
        DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION,
    ),
    storage(
        RuleKey::AppOp(AppOp::AccessMediaLocation),
        DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION,
    ),
    // contacts permissions
    contacts(
        RuleKey::Permission(permission::READ_CONTACTS),
        DerivedFlags::HAS_READ_CONTACTS_DECLARATION,
    ),
    contacts(
        RuleKey::Permission(permission::WRITE_CONTACTS),
        DerivedFlags::HAS_WRITE_CONTACTS_DECLARATION,
    ),
    contacts(
        RuleKey::Permission(permission::GET_ACCOUNTS),
        DerivedFlags::HAS_GET_ACCOUNTS_DECLARATION,
    ),
    // contacts ops
    contacts(
        RuleKey::AppOp(AppOp::ReadContacts),
        DerivedFlags::HAS_READ_CONTACTS_DECLARATION,
    ),
    contacts(
        RuleKey::AppOp(AppOp::WriteContacts),
        DerivedFlags::HAS_WRITE_CONTACTS_DECLARATION,
    ),
    // account lookups ride on the write declaration
    contacts(
        RuleKey::AppOp(AppOp::GetAccounts),
        DerivedFlags::HAS_WRITE_CONTACTS_DECLARATION,
    ),
];

/// Look up the rule registered for `check`.
pub fn rule_for(check: SpoofableCheck<'_>) -> Option<&'static SpoofRule> {
    SPOOF_RULES.iter().find(|rule| rule.key.matches(check))
}

/// Whether `check` should be answered as granted without consulting the
/// real grant.
pub fn should_spoof(check: SpoofableCheck<'_>, record: &StateRecord) -> bool {
    match rule_for(check) {
        Some(rule) => record.has_flags(rule.feature) && record.has_derived_flags(rule.declaration),
        None => false,
    }
}

/// Whether the grant dialog for `permission` may be skipped.
///
/// Depends only on a rule existing, not on the feature being enabled.
pub fn should_skip_permission_dialog(permission: &str) -> bool {
    rule_for(SpoofableCheck::Permission(permission)).is_some()
}

/// Whether a real runtime grant of `permission` must be refused because a
/// scoping feature that replaces it is enabled in `record`.
pub fn should_block_runtime_grant(permission: &str, record: Option<&StateRecord>) -> bool {
    match (rule_for(SpoofableCheck::Permission(permission)), record) {
        (Some(rule), Some(record)) => rule.blocks_real_grant && record.has_flags(rule.feature),
        _ => false,
    }
}

/// Outcome of a runtime permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantResult {
    Granted,
    Denied,
}

/// Flip denied results to granted for permissions that are spoofed.
///
/// Returns the number of results changed.
pub fn maybe_spoof_grant_results(
    permissions: &[&str],
    results: &mut [GrantResult],
    record: Option<&StateRecord>,
) -> usize {
    let Some(record) = record else {
        return 0;
    };

    let mut changed = 0;
    for (perm, result) in permissions.iter().zip(results.iter_mut()) {
        if *result == GrantResult::Granted {
            continue;
        }
        if should_spoof(SpoofableCheck::Permission(perm), record) {
            *result = GrantResult::Granted;
            changed += 1;
        }
    }
    changed
}

/// Settings screen for granting all-files access to one package.
pub const ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION: &str =
    "android.settings.MANAGE_APP_ALL_FILES_ACCESS_PERMISSION";

/// Settings screen for granting media management to one package.
pub const ACTION_REQUEST_MANAGE_MEDIA: &str = "android.settings.REQUEST_MANAGE_MEDIA";

/// Suffix that redirects a settings action to its scoping-aware prompt.
pub const PROMPT_SUFFIX: &str = "_PROMPT";

/// The app-op a special-access settings action grants.
pub fn settings_action_op(action: &str) -> Option<AppOp> {
    match action {
        ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION => Some(AppOp::ManageExternalStorage),
        ACTION_REQUEST_MANAGE_MEDIA => Some(AppOp::ManageMedia),
        _ => None,
    }
}

/// The prompt variant of a settings action.
pub fn prompt_action(action: &str) -> String {
    format!("{}{}", action, PROMPT_SUFFIX)
}
