//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use scopes_core::{
    permission, storage_scope, BaseFlags, ContactScopeKind, ContactScopeSet, DerivedFlags, EditorFlags, Manifest,
    PackageName, PathScope, PathScopeFlags, StateRecord, StateUpdate, MAX_CONTACT_SCOPES, MAX_PATH_SCOPES,
};

/// Every permission flag derivation recognizes.
pub const KNOWN_PERMISSIONS: [&str; 12] = [
    permission::READ_EXTERNAL_STORAGE,
    permission::WRITE_EXTERNAL_STORAGE,
    permission::MANAGE_EXTERNAL_STORAGE,
    permission::MANAGE_MEDIA,
    permission::ACCESS_MEDIA_LOCATION,
    permission::READ_MEDIA_AUDIO,
    permission::READ_MEDIA_IMAGES,
    permission::READ_MEDIA_VIDEO,
    permission::READ_MEDIA_VISUAL_USER_SELECTED,
    permission::READ_CONTACTS,
    permission::WRITE_CONTACTS,
    permission::GET_ACCOUNTS,
];

/// Generate a package name.
pub fn package_name() -> impl Strategy<Value = PackageName> {
    "[a-z]{2,8}(\\.[a-z][a-z0-9_]{0,8}){1,3}".prop_map(PackageName::new)
}

/// Generate a path scope. Paths may hold any UTF-8.
pub fn path_scope() -> impl Strategy<Value = PathScope> {
    (".{0,64}", any::<u16>())
        .prop_map(|(path, flags)| PathScope::new(path, PathScopeFlags::from_bits_retain(flags)))
}

/// Generate a path scope list within the encodable limit.
pub fn path_scopes() -> impl Strategy<Value = Vec<PathScope>> {
    prop::collection::vec(path_scope(), 0..=MAX_PATH_SCOPES)
}

pub fn contact_scope_kind() -> impl Strategy<Value = ContactScopeKind> {
    prop_oneof![
        Just(ContactScopeKind::Group),
        Just(ContactScopeKind::Contact),
        Just(ContactScopeKind::Number),
        Just(ContactScopeKind::Email),
    ]
}

/// Generate a contact scope set within the encodable limit.
pub fn contact_scope_set() -> impl Strategy<Value = ContactScopeSet> {
    prop::collection::vec((contact_scope_kind(), any::<i64>()), 0..=MAX_CONTACT_SCOPES).prop_map(|refs| {
        let mut set = ContactScopeSet::new();
        for (kind, id) in refs {
            set.add(kind, id);
        }
        set
    })
}

/// Generate base flags, unknown bits included.
pub fn base_flags() -> impl Strategy<Value = BaseFlags> {
    any::<u32>().prop_map(BaseFlags::from_raw)
}

/// Generate derived flags, computed or not.
pub fn derived_flags() -> impl Strategy<Value = DerivedFlags> {
    any::<u32>().prop_map(DerivedFlags::from_raw)
}

/// Generate a manifest mixing recognized and unrelated permissions.
pub fn manifest() -> impl Strategy<Value = Manifest> {
    (
        prop::collection::vec(prop::sample::select(KNOWN_PERMISSIONS.to_vec()), 0..8),
        prop::collection::vec("android\\.permission\\.[A-Z_]{3,16}", 0..3),
        23u32..=35,
        any::<bool>(),
    )
        .prop_map(|(known, other, target_sdk, legacy)| {
            Manifest::new(target_sdk)
                .with_permissions(known)
                .with_permissions(other)
                .with_legacy_external_storage(legacy)
        })
}

fn blobs() -> impl Strategy<Value = (Option<Bytes>, Option<Bytes>)> {
    (path_scopes(), contact_scope_set())
        .prop_map(|(paths, contacts)| (storage_scope::encode(&paths), contacts.encode()))
}

/// Generate a state record with well-formed scope blobs.
pub fn state_record() -> impl Strategy<Value = StateRecord> {
    (base_flags(), blobs(), derived_flags()).prop_map(|(flags, (paths, contacts), derived)| {
        StateRecord::new(flags)
            .with_path_scopes(paths)
            .with_contact_scopes(contacts)
            .with_derived_flags(derived)
    })
}

/// Generate an update with well-formed scope blobs.
pub fn state_update() -> impl Strategy<Value = StateUpdate> {
    (base_flags(), blobs(), any::<u32>()).prop_map(|(base_flags, (path_scopes, contact_scopes), editor)| {
        StateUpdate {
            base_flags,
            path_scopes,
            contact_scopes,
            editor_flags: EditorFlags::from_bits_truncate(editor),
        }
    })
}
