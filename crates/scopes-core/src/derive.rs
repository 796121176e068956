//! Derivation of capability flags from manifest declarations.
//!
//! ## Overview
//!
//! Derivation runs in two passes. The scan sets one has-declaration bit per
//! recognized permission plus the composite storage expectations. After the
//! scan, declarations that are meaningless without a paired read
//! declaration are retracted.
//!
//! Packages sharing a runtime identity fold their declarations into one
//! value. [`FlagDerivationEngine`] caches the folded result per set of
//! package revisions so an unchanged group is never rescanned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::flags::{BaseFlags, DerivedFlags};
use crate::manifest::{permission, Manifest};
use crate::types::PackageName;

/// Fold one manifest into `acc` and apply the retraction pass.
///
/// Pure: the result depends only on `acc` and the manifest.
pub fn derive_flags(acc: DerivedFlags, manifest: &Manifest) -> DerivedFlags {
    let mut flags = acc;
    let legacy = manifest.uses_legacy_storage();

    for name in &manifest.declared_permissions {
        match name.as_str() {
            permission::READ_EXTERNAL_STORAGE | permission::WRITE_EXTERNAL_STORAGE => {
                let write = name == permission::WRITE_EXTERNAL_STORAGE;
                flags |= if write {
                    DerivedFlags::HAS_WRITE_EXTERNAL_STORAGE_DECLARATION
                } else {
                    DerivedFlags::HAS_READ_EXTERNAL_STORAGE_DECLARATION
                };

                // Without legacy storage, the write permission grants nothing.
                if write && legacy {
                    flags |= DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS;
                }

                if !flags.contains(DerivedFlags::EXPECTS_ALL_FILES_ACCESS) {
                    flags |= if legacy {
                        DerivedFlags::EXPECTS_ALL_FILES_ACCESS
                            | DerivedFlags::EXPECTS_LEGACY_EXTERNAL_STORAGE
                    } else {
                        DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY
                    };
                }
            }
            permission::MANAGE_EXTERNAL_STORAGE => {
                flags.remove(DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY);
                flags |= DerivedFlags::EXPECTS_ALL_FILES_ACCESS
                    | DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS
                    | DerivedFlags::HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION;
            }
            other => {
                if let Some(bit) = declaration_bit(other) {
                    flags |= bit;
                }
            }
        }
    }

    retract_unpaired(flags)
}

/// Has-declaration bits that carry no composite meaning.
fn declaration_bit(name: &str) -> Option<DerivedFlags> {
    let bit = match name {
        permission::MANAGE_MEDIA => DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION,
        permission::ACCESS_MEDIA_LOCATION => DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION,
        permission::READ_MEDIA_AUDIO => DerivedFlags::HAS_READ_MEDIA_AUDIO_DECLARATION,
        permission::READ_MEDIA_IMAGES => DerivedFlags::HAS_READ_MEDIA_IMAGES_DECLARATION,
        permission::READ_MEDIA_VIDEO => DerivedFlags::HAS_READ_MEDIA_VIDEO_DECLARATION,
        permission::READ_MEDIA_VISUAL_USER_SELECTED => {
            DerivedFlags::HAS_READ_MEDIA_VISUAL_USER_SELECTED_DECLARATION
        }
        permission::READ_CONTACTS => DerivedFlags::HAS_READ_CONTACTS_DECLARATION,
        permission::WRITE_CONTACTS => DerivedFlags::HAS_WRITE_CONTACTS_DECLARATION,
        permission::GET_ACCOUNTS => DerivedFlags::HAS_GET_ACCOUNTS_DECLARATION,
        _ => return None,
    };
    Some(bit)
}

fn retract_unpaired(mut flags: DerivedFlags) -> DerivedFlags {
    if flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION)
        && !flags.intersects(DerivedFlags::MANAGE_MEDIA_PAIRED_READS)
    {
        flags.remove(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION);
    }

    // Only a surviving manage-media declaration implies write access.
    if flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION) {
        flags |= DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS;
    }

    if flags.contains(DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION)
        && !flags.intersects(DerivedFlags::MEDIA_LOCATION_PAIRED_READS)
    {
        flags.remove(DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION);
    }

    flags
}

/// Fold the manifests of every package sharing one identity and mark the
/// result as computed.
pub fn derive_for_group<'a, I>(manifests: I) -> DerivedFlags
where
    I: IntoIterator<Item = &'a Manifest>,
{
    manifests
        .into_iter()
        .fold(DerivedFlags::empty(), derive_flags)
        | DerivedFlags::DFLAGS_SET
}

/// One member of a derivation group.
#[derive(Debug, Clone, Copy)]
pub struct GroupMember<'a> {
    pub package: &'a PackageName,
    /// Changes whenever the package is reinstalled or upgraded.
    pub revision: u64,
    pub manifest: &'a Manifest,
}

type GroupKey = Vec<(PackageName, u64)>;

/// Caches derived flags per set of installed package revisions.
#[derive(Debug, Default)]
pub struct FlagDerivationEngine {
    cache: Mutex<HashMap<GroupKey, DerivedFlags>>,
    scans: AtomicU64,
}

impl FlagDerivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived flags for a record with `base_flags`, owned by `members`.
    ///
    /// Returns empty (not computed) unless a scoping feature is enabled.
    pub fn maybe_derive(&self, base_flags: BaseFlags, members: &[GroupMember<'_>]) -> DerivedFlags {
        if !base_flags.intersects(BaseFlags::SCOPING_FEATURES) || members.is_empty() {
            return DerivedFlags::empty();
        }
        self.derive(members)
    }

    /// Derived flags for `members`, reusing a cached result when every
    /// member's revision is unchanged.
    pub fn derive(&self, members: &[GroupMember<'_>]) -> DerivedFlags {
        let mut key: GroupKey = members
            .iter()
            .map(|m| (m.package.clone(), m.revision))
            .collect();
        key.sort();

        if let Some(flags) = self.cache.lock().get(&key) {
            return *flags;
        }

        // Scan outside the lock; a racing scan computes the same value.
        let flags = derive_for_group(members.iter().map(|m| m.manifest));
        self.scans.fetch_add(1, Ordering::Relaxed);
        trace!(members = key.len(), flags = flags.bits(), "derived flags");

        self.cache.lock().insert(key, flags);
        flags
    }

    /// Drop every cached result that involves `package`.
    pub fn forget(&self, package: &PackageName) {
        self.cache
            .lock()
            .retain(|key, _| !key.iter().any(|(name, _)| name == package));
    }

    /// Number of manifest scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn derive_one(manifest: &Manifest) -> DerivedFlags {
        derive_for_group([manifest])
    }

    #[test]
    fn test_legacy_read_expects_all_files() {
        let m = Manifest::new(28).with_permission(permission::READ_EXTERNAL_STORAGE);
        let flags = derive_one(&m);

        assert!(flags.contains(DerivedFlags::HAS_READ_EXTERNAL_STORAGE_DECLARATION));
        assert!(flags.contains(DerivedFlags::EXPECTS_ALL_FILES_ACCESS));
        assert!(flags.contains(DerivedFlags::EXPECTS_LEGACY_EXTERNAL_STORAGE));
        assert!(!flags.contains(DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY));
        assert!(!flags.contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
        assert!(flags.is_computed());
    }

    #[test]
    fn test_modern_read_expects_media_only() {
        let m = Manifest::new(33).with_permission(permission::READ_EXTERNAL_STORAGE);
        let flags = derive_one(&m);

        assert!(flags.contains(DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY));
        assert!(!flags.contains(DerivedFlags::EXPECTS_ALL_FILES_ACCESS));
        assert!(!flags.contains(DerivedFlags::EXPECTS_LEGACY_EXTERNAL_STORAGE));
    }

    #[test]
    fn test_write_expects_write_access_only_on_legacy_path() {
        let legacy = Manifest::new(29)
            .with_legacy_external_storage(true)
            .with_permission(permission::WRITE_EXTERNAL_STORAGE);
        assert!(derive_one(&legacy).contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));

        let modern = Manifest::new(30).with_permission(permission::WRITE_EXTERNAL_STORAGE);
        let flags = derive_one(&modern);
        assert!(flags.contains(DerivedFlags::HAS_WRITE_EXTERNAL_STORAGE_DECLARATION));
        assert!(!flags.contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
    }

    #[test]
    fn test_manage_external_storage_overrides_media_only() {
        let m = Manifest::new(33).with_permissions([
            permission::READ_EXTERNAL_STORAGE,
            permission::MANAGE_EXTERNAL_STORAGE,
        ]);
        let flags = derive_one(&m);

        assert!(flags.contains(DerivedFlags::EXPECTS_ALL_FILES_ACCESS));
        assert!(flags.contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
        assert!(flags.contains(DerivedFlags::HAS_MANAGE_EXTERNAL_STORAGE_DECLARATION));
        assert!(!flags.contains(DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY));
    }

    #[test]
    fn test_unpaired_manage_media_is_retracted() {
        let m = Manifest::new(33).with_permission(permission::MANAGE_MEDIA);
        let flags = derive_one(&m);

        assert!(!flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION));
        assert!(!flags.contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
        assert_eq!(flags, DerivedFlags::DFLAGS_SET);
    }

    #[test]
    fn test_paired_manage_media_implies_write() {
        let m = Manifest::new(33)
            .with_permissions([permission::MANAGE_MEDIA, permission::READ_MEDIA_AUDIO]);
        let flags = derive_one(&m);

        assert!(flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION));
        assert!(flags.contains(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
    }

    #[test]
    fn test_media_location_requires_visual_read() {
        let audio_only = Manifest::new(33).with_permissions([
            permission::ACCESS_MEDIA_LOCATION,
            permission::READ_MEDIA_AUDIO,
        ]);
        assert!(!derive_one(&audio_only).contains(DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION));

        let images = Manifest::new(33).with_permissions([
            permission::ACCESS_MEDIA_LOCATION,
            permission::READ_MEDIA_IMAGES,
        ]);
        assert!(derive_one(&images).contains(DerivedFlags::HAS_ACCESS_MEDIA_LOCATION_DECLARATION));
    }

    #[test]
    fn test_contact_declarations() {
        let m = Manifest::new(33).with_permissions([
            permission::READ_CONTACTS,
            permission::WRITE_CONTACTS,
            permission::GET_ACCOUNTS,
        ]);
        let flags = derive_one(&m);
        assert!(flags.contains(
            DerivedFlags::HAS_READ_CONTACTS_DECLARATION
                | DerivedFlags::HAS_WRITE_CONTACTS_DECLARATION
                | DerivedFlags::HAS_GET_ACCOUNTS_DECLARATION
        ));
    }

    #[test]
    fn test_group_folds_declarations() {
        let reader = Manifest::new(33).with_permission(permission::READ_MEDIA_IMAGES);
        let manager = Manifest::new(33).with_permission(permission::MANAGE_MEDIA);

        // Alone, the manager's declaration is retracted. In the group it pairs
        // with the reader's.
        let flags = derive_for_group([&reader, &manager]);
        assert!(flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION));
    }

    #[test]
    fn test_engine_reuses_unchanged_revision() {
        let engine = FlagDerivationEngine::new();
        let name = PackageName::new("com.example.gallery");
        let manifest = Manifest::new(33).with_permission(permission::READ_MEDIA_IMAGES);

        let members = [GroupMember {
            package: &name,
            revision: 1,
            manifest: &manifest,
        }];
        let first = engine.derive(&members);
        let second = engine.derive(&members);
        assert_eq!(first, second);
        assert_eq!(engine.scan_count(), 1);

        let upgraded = [GroupMember {
            revision: 2,
            ..members[0]
        }];
        engine.derive(&upgraded);
        assert_eq!(engine.scan_count(), 2);

        engine.forget(&name);
        engine.derive(&upgraded);
        assert_eq!(engine.scan_count(), 3);
    }

    #[test]
    fn test_maybe_derive_requires_scoping_feature() {
        let engine = FlagDerivationEngine::new();
        let name = PackageName::new("com.example.app");
        let manifest = Manifest::new(33).with_permission(permission::READ_CONTACTS);
        let members = [GroupMember {
            package: &name,
            revision: 1,
            manifest: &manifest,
        }];

        let off = engine.maybe_derive(BaseFlags::ALLOW_ACCESS_TO_OBB_DIRECTORY, &members);
        assert!(!off.is_computed());
        assert_eq!(engine.scan_count(), 0);

        let on = engine.maybe_derive(BaseFlags::CONTACT_SCOPES_ENABLED, &members);
        assert!(on.contains(DerivedFlags::HAS_READ_CONTACTS_DECLARATION));
    }

    const NAMES: &[&str] = &[
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
        "android.permission.CAMERA",
    ];

    fn manifest() -> impl Strategy<Value = Manifest> {
        (
            prop::collection::vec(prop::sample::select(NAMES), 0..8),
            20u32..36,
            any::<bool>(),
        )
            .prop_map(|(names, sdk, legacy)| {
                Manifest::new(sdk)
                    .with_permissions(names.iter().copied())
                    .with_legacy_external_storage(legacy)
            })
    }

    proptest! {
        #[test]
        fn prop_derivation_is_deterministic(m in manifest()) {
            prop_assert_eq!(derive_one(&m), derive_one(&m));
        }

        #[test]
        fn prop_manage_media_retracted_iff_unpaired(m in manifest()) {
            let flags = derive_one(&m);
            let declared = m.declares(permission::MANAGE_MEDIA);
            let paired = flags.intersects(DerivedFlags::MANAGE_MEDIA_PAIRED_READS);
            prop_assert_eq!(
                flags.contains(DerivedFlags::HAS_MANAGE_MEDIA_DECLARATION),
                declared && paired
            );
        }
    }
}
