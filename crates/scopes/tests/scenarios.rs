//! End-to-end scenarios across the central store and process contexts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use scopes::client::{ContentObserver, ContentUri};
use scopes::core::provider::{ACTION_NOTIFY_CONTENT_OBSERVERS, CONTACTS_AUTHORITY, SCOPED_CONTACTS_AUTHORITY};
use scopes::core::spoof::{ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION, ACTION_REQUEST_MANAGE_MEDIA};
use scopes::core::storage_scope;
use scopes::core::{
    permission, AppId, AppOp, BaseFlags, ContactScopeKind, ContactScopeSet, DerivedFlags, GrantResult, Manifest,
    PackageName, PathScope, PathScopeFlags, Uid, UserId,
};
use scopes::store::{ControllerEvent, InstalledPackage, RecordingController};
use scopes::{shell, ScopesConfig, ScopesPlatform};
use scopes_testkit::fixtures::{system_packages, TestPlatform, CONTACTS_PROVIDER_APP_ID};
use scopes_testkit::generators::base_flags;

const USER: UserId = UserId(0);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Default)]
struct CountingObserver {
    changes: AtomicUsize,
}

impl ContentObserver for CountingObserver {
    fn on_change(&self, _self_change: bool, _uris: &[ContentUri], _user: UserId) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Coherence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_process_sees_update_made_elsewhere() {
    init_tracing();
    let fixture = TestPlatform::new();
    let gallery = fixture.install_app(
        "com.example.gallery",
        AppId(10_100),
        Manifest::new(34).with_permission(permission::READ_MEDIA_IMAGES),
    );
    let process = fixture.platform.spawn_process(&gallery, USER).unwrap();

    assert!(!process.should_spoof_self_permission_check(permission::READ_MEDIA_IMAGES));
    assert!(fixture.enable_storage_scopes(&gallery, USER));
    assert!(process.should_spoof_self_permission_check(permission::READ_MEDIA_IMAGES));

    // Turning the feature off is seen just the same.
    let controller = fixture.permission_controller(USER);
    let mut editor = fixture.platform.edit(controller, &gallery, USER).unwrap();
    editor.clear_flags(BaseFlags::STORAGE_SCOPES_ENABLED);
    assert!(editor.apply(&fixture.platform.service(controller)).unwrap());

    assert!(!process.should_spoof_self_permission_check(permission::READ_MEDIA_IMAGES));
    assert!(process.self_state().is_none());
}

#[test]
fn test_every_process_is_invalidated() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.notes",
        AppId(10_101),
        Manifest::new(34).with_permission(permission::READ_CONTACTS),
    );
    let first = fixture.platform.spawn_process(&app, USER).unwrap();
    let second = fixture.platform.spawn_process(&app, USER).unwrap();

    assert!(first.self_state().is_none());
    assert!(second.self_state().is_none());

    assert!(fixture.enable_contact_scopes(&app, USER));

    for process in [&first, &second] {
        let state = process.self_state().unwrap();
        assert!(state.has_flags(BaseFlags::CONTACT_SCOPES_ENABLED));
        assert!(state.has_derived_flags(DerivedFlags::HAS_READ_CONTACTS_DECLARATION));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared Identity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_shared_identity_shares_record_and_declarations() {
    let fixture = TestPlatform::new();
    let app_id = AppId(10_300);
    fixture.platform.install_package(
        InstalledPackage::new(
            "com.example.suite.mail",
            app_id,
            Manifest::new(34).with_permission(permission::READ_CONTACTS),
        )
        .shared(),
    );
    fixture.platform.install_package(
        InstalledPackage::new(
            "com.example.suite.calendar",
            app_id,
            Manifest::new(34).with_permission(permission::WRITE_CONTACTS),
        )
        .shared(),
    );
    let mail = PackageName::new("com.example.suite.mail");
    let calendar = PackageName::new("com.example.suite.calendar");

    assert!(fixture.enable_contact_scopes(&mail, USER));

    let process = fixture.platform.spawn_process(&calendar, USER).unwrap();
    assert!(process.should_spoof_self_permission_check(permission::READ_CONTACTS));
    assert!(process.should_spoof_self_permission_check(permission::WRITE_CONTACTS));
    assert!(!process.should_spoof_self_permission_check(permission::GET_ACCOUNTS));

    assert!(fixture.persister.row(USER, &mail).is_some());
    assert!(fixture.persister.row(USER, &calendar).is_some());
}

#[test]
fn test_group_members_are_listed_for_each_user_separately() {
    let fixture = TestPlatform::new();
    let names = fixture.install_shared_group(
        &["com.example.a", "com.example.b"],
        AppId(10_301),
        Manifest::new(34).with_permission(permission::READ_EXTERNAL_STORAGE),
    );
    assert!(fixture.enable_storage_scopes(&names[0], UserId(10)));

    let shell = fixture.shell();
    assert!(fixture.platform.get(shell, &names[1], UserId(10)).unwrap().is_some());
    assert!(fixture.platform.get(shell, &names[1], USER).unwrap().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner View
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_owner_sees_only_visible_flags(flags in base_flags()) {
        let fixture = TestPlatform::new();
        let app = fixture.install_app("com.example.prop", AppId(10_400), Manifest::new(34));
        let shell = fixture.shell();

        let mut editor = fixture.platform.edit(shell, &app, USER).unwrap();
        editor.set_flags_state(BaseFlags::from_raw(u32::MAX), false).add_flags(flags);
        prop_assert!(editor.apply(&fixture.platform.service(shell)).unwrap());

        let process = fixture.platform.spawn_process(&app, USER).unwrap();
        let visible = flags & BaseFlags::VISIBLE_TO_OWNER;
        match process.self_state() {
            Some(view) => {
                prop_assert_eq!(view.base_flags, visible);
                prop_assert_eq!(view.path_scopes, None);
                prop_assert_eq!(view.contact_scopes, None);
            }
            None => prop_assert!(visible.is_empty()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Derivation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_legacy_app_expects_all_files_access() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.legacy",
        AppId(10_500),
        Manifest::new(28).with_permissions([permission::READ_EXTERNAL_STORAGE, permission::WRITE_EXTERNAL_STORAGE]),
    );
    assert!(fixture.enable_storage_scopes(&app, USER));

    let process = fixture.platform.spawn_process(&app, USER).unwrap();
    let state = process.self_state().unwrap();
    assert!(state.has_derived_flags(
        DerivedFlags::EXPECTS_ALL_FILES_ACCESS
            | DerivedFlags::EXPECTS_LEGACY_EXTERNAL_STORAGE
            | DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS
    ));
    assert!(!state.has_derived_flags(DerivedFlags::EXPECTS_ACCESS_TO_MEDIA_FILES_ONLY));
    assert!(process.should_spoof_app_op_check(AppOp::WriteExternalStorage, process.uid()));
}

#[test]
fn test_unpaired_manage_media_is_not_spoofed() {
    let fixture = TestPlatform::new();
    let lonely = fixture.install_app(
        "com.example.lonely",
        AppId(10_501),
        Manifest::new(34).with_permission(permission::MANAGE_MEDIA),
    );
    let paired = fixture.install_app(
        "com.example.paired",
        AppId(10_502),
        Manifest::new(34).with_permissions([permission::MANAGE_MEDIA, permission::READ_MEDIA_VIDEO]),
    );
    assert!(fixture.enable_storage_scopes(&lonely, USER));
    assert!(fixture.enable_storage_scopes(&paired, USER));

    let lonely = fixture.platform.spawn_process(&lonely, USER).unwrap();
    let paired = fixture.platform.spawn_process(&paired, USER).unwrap();

    assert!(!lonely.should_spoof_app_op_check(AppOp::ManageMedia, lonely.uid()));
    assert!(paired.should_spoof_app_op_check(AppOp::ManageMedia, paired.uid()));
    assert!(paired
        .self_state()
        .unwrap()
        .has_derived_flags(DerivedFlags::EXPECTS_STORAGE_WRITE_ACCESS));
}

#[test]
fn test_app_op_of_other_uid_is_not_spoofed() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.other",
        AppId(10_503),
        Manifest::new(34).with_permission(permission::READ_MEDIA_AUDIO),
    );
    assert!(fixture.enable_storage_scopes(&app, USER));
    let process = fixture.platform.spawn_process(&app, USER).unwrap();

    assert!(process.should_spoof_app_op_check(AppOp::ReadMediaAudio, process.uid()));
    assert!(!process.should_spoof_app_op_check(AppOp::ReadMediaAudio, Uid::new(USER, AppId(10_999))));
    assert!(!process.should_spoof_app_op_check(AppOp::ReadMediaAudio, Uid::SYSTEM));
}

#[test]
fn test_grant_results_and_settings_redirect() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.files",
        AppId(10_504),
        Manifest::new(34).with_permissions([permission::MANAGE_EXTERNAL_STORAGE, permission::READ_MEDIA_IMAGES]),
    );
    assert!(fixture.enable_storage_scopes(&app, USER));
    let process = fixture.platform.spawn_process(&app, USER).unwrap();

    let permissions = [permission::READ_MEDIA_IMAGES, permission::READ_CONTACTS];
    let mut results = [GrantResult::Denied, GrantResult::Denied];
    assert_eq!(process.maybe_spoof_grant_results(&permissions, &mut results), 1);
    assert_eq!(results, [GrantResult::Granted, GrantResult::Denied]);

    let data = Some("package:com.example.files");
    assert_eq!(
        process.maybe_rewrite_settings_action(ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION, data, true),
        Some(format!("{}_PROMPT", ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION))
    );
    // Another package's screen is left alone.
    assert_eq!(
        process.maybe_rewrite_settings_action(
            ACTION_MANAGE_APP_ALL_FILES_ACCESS_PERMISSION,
            Some("package:com.example.gallery"),
            false
        ),
        None
    );
    // No manage-media declaration, no spoof, but no real grant either.
    assert_eq!(
        process.maybe_rewrite_settings_action(ACTION_REQUEST_MANAGE_MEDIA, data, false),
        Some(format!("{}_PROMPT", ACTION_REQUEST_MANAGE_MEDIA))
    );
    assert_eq!(process.maybe_rewrite_settings_action(ACTION_REQUEST_MANAGE_MEDIA, data, true), None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Contacts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_contacts_redirection_flow() {
    init_tracing();
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.dialer",
        AppId(10_600),
        Manifest::new(34).with_permission(permission::READ_CONTACTS),
    );
    let process = fixture.platform.spawn_process(&app, USER).unwrap();
    let contacts_uri: ContentUri = "content://com.android.contacts/contacts".parse().unwrap();

    assert_eq!(process.resolve_authority(CONTACTS_AUTHORITY), CONTACTS_AUTHORITY);
    assert!(!process.should_spoof_self_permission_check(permission::READ_CONTACTS));
    assert!(!fixture.platform.store().should_block_runtime_grant(permission::READ_CONTACTS, &app, USER));

    assert!(fixture.enable_contact_scopes(&app, USER));
    assert!(fixture.platform.store().should_block_runtime_grant(permission::READ_CONTACTS, &app, USER));
    assert!(!fixture.platform.store().should_block_runtime_grant(permission::READ_MEDIA_IMAGES, &app, USER));

    // The first check that sees the enabled feature turns redirection on.
    assert!(process.should_spoof_self_permission_check(permission::READ_CONTACTS));
    assert_eq!(process.resolve_authority(CONTACTS_AUTHORITY), SCOPED_CONTACTS_AUTHORITY);
    assert!(process.should_skip_notify_change(&contacts_uri));

    let observer = Arc::new(CountingObserver::default());
    let handle: Arc<dyn ContentObserver> = observer.clone();
    assert!(process.intercept_register_observer(&contacts_uri, handle.clone()));
    let media_uri: ContentUri = "content://media/external".parse().unwrap();
    assert!(!process.intercept_register_observer(&media_uri, handle.clone()));

    assert_eq!(process.on_broadcast(ACTION_NOTIFY_CONTENT_OBSERVERS), 1);
    assert_eq!(process.on_broadcast("android.intent.action.BOOT_COMPLETED"), 0);
    assert_eq!(observer.changes.load(Ordering::SeqCst), 1);

    assert!(process.intercept_unregister_observer(&handle));
    assert_eq!(process.on_broadcast(ACTION_NOTIFY_CONTENT_OBSERVERS), 0);

    // Redirection stays on for the life of the process.
    let controller = fixture.permission_controller(USER);
    let mut editor = fixture.platform.edit(controller, &app, USER).unwrap();
    editor.clear_flags(BaseFlags::CONTACT_SCOPES_ENABLED);
    editor.apply(&fixture.platform.service(controller)).unwrap();
    assert!(process.self_state().is_none());
    assert_eq!(process.resolve_authority(CONTACTS_AUTHORITY), SCOPED_CONTACTS_AUTHORITY);
}

#[test]
fn test_process_started_with_contact_scopes_is_redirected() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.phonebook",
        AppId(10_602),
        Manifest::new(34).with_permission(permission::READ_CONTACTS),
    );
    assert!(fixture.enable_contact_scopes(&app, USER));

    let process = fixture.platform.spawn_process(&app, USER).unwrap();
    let contacts_uri: ContentUri = "content://com.android.contacts/contacts".parse().unwrap();
    assert!(process.redirector().is_enabled());
    assert_eq!(process.resolve_authority(CONTACTS_AUTHORITY), SCOPED_CONTACTS_AUTHORITY);
    assert!(process.should_skip_notify_change(&contacts_uri));
}

#[test]
fn test_notified_change_enables_redirection() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.chat",
        AppId(10_603),
        Manifest::new(34).with_permission(permission::READ_CONTACTS),
    );
    let process = fixture.platform.spawn_process(&app, USER).unwrap();
    assert!(!process.redirector().is_enabled());

    let controller = fixture.permission_controller(USER);
    let mut editor = fixture.platform.edit(controller, &app, USER).unwrap();
    editor
        .add_flags(BaseFlags::CONTACT_SCOPES_ENABLED)
        .set_notify_uid_after_apply(true);
    assert!(editor.apply(&fixture.platform.service(controller)).unwrap());

    // No permission check or self read has run in the process.
    assert!(process.redirector().is_enabled());
    assert_eq!(process.resolve_authority(CONTACTS_AUTHORITY), SCOPED_CONTACTS_AUTHORITY);

    let events = fixture.controller.take();
    assert!(matches!(
        events.as_slice(),
        [ControllerEvent::Notified { uid, .. }] if *uid == Uid::new(USER, AppId(10_603))
    ));

    // A process that has exited is no longer notified.
    drop(process);
    let mut editor = fixture.platform.edit(controller, &app, USER).unwrap();
    editor
        .add_flags(BaseFlags::STORAGE_SCOPES_ENABLED)
        .set_notify_uid_after_apply(true);
    assert!(editor.apply(&fixture.platform.service(controller)).unwrap());
    assert_eq!(fixture.controller.take().len(), 1);
}

#[test]
fn test_clearing_contacts_provider_data_drops_contact_scopes() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.messenger",
        AppId(10_601),
        Manifest::new(34).with_permission(permission::READ_CONTACTS),
    );
    let mut contacts = ContactScopeSet::new();
    contacts.add(ContactScopeKind::Contact, 42);

    let controller = fixture.permission_controller(USER);
    let mut editor = fixture.platform.edit(controller, &app, USER).unwrap();
    editor
        .add_flags(BaseFlags::CONTACT_SCOPES_ENABLED)
        .set_contact_scopes(contacts.encode());
    assert!(editor.apply(&fixture.platform.service(controller)).unwrap());

    let provider = fixture.contacts_provider(USER);
    let seen = fixture.platform.get(provider, &app, USER).unwrap().unwrap();
    assert_eq!(seen.contact_scope_set(), contacts);

    // Clearing some other package's data changes nothing.
    fixture
        .platform
        .clear_application_user_data(&PackageName::new("com.example.unrelated"), USER);
    assert!(fixture.platform.get(provider, &app, USER).unwrap().unwrap().contact_scopes.is_some());

    let provider_name = fixture
        .platform
        .store()
        .config()
        .known_packages
        .contacts_provider
        .clone()
        .unwrap();
    fixture.platform.clear_application_user_data(&provider_name, USER);

    let after = fixture.platform.get(provider, &app, USER).unwrap().unwrap();
    assert!(after.has_flags(BaseFlags::CONTACT_SCOPES_ENABLED));
    assert_eq!(after.contact_scopes, None);
    assert_eq!(provider.app_id(), CONTACTS_PROVIDER_APP_ID);
}

// ─────────────────────────────────────────────────────────────────────────────
// Shell
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_shell_command_exit_codes() {
    let fixture = TestPlatform::new();
    let app = fixture.install_app(
        "com.example.shell",
        AppId(10_700),
        Manifest::new(34).with_permission(permission::READ_EXTERNAL_STORAGE),
    );
    let service = fixture.platform.service(shell::shell_uid());

    let status = shell::run(
        &service,
        &[
            "com.example.shell",
            "0",
            "add-flags",
            "1",
            "set-storage-scopes",
            "000100102f7364636172642f50696374757265730003",
            "set-kill-uid-after-apply",
            "true",
        ],
    );
    assert_eq!(status, 0);

    let record = fixture.platform.get(fixture.shell(), &app, USER).unwrap().unwrap();
    assert!(record.has_flags(BaseFlags::STORAGE_SCOPES_ENABLED));
    assert_eq!(record.path_scope_list().len(), 1);
    assert_eq!(
        fixture.controller.take(),
        vec![ControllerEvent::Killed {
            app_id: AppId(10_700),
            user: USER
        }]
    );

    assert_eq!(shell::run(&service, &["com.example.missing", "0", "add-flags", "1"]), 1);
    assert_eq!(shell::run(&service, &["com.example.shell", "0", "add-flags", "zz"]), 1);
    assert_eq!(shell::run(&service, &["com.example.shell"]), 1);
}

#[test]
fn test_shell_notify_delivers_owner_view() {
    let fixture = TestPlatform::new();
    fixture.install_app("com.example.notify", AppId(10_701), Manifest::new(34));
    let service = fixture.platform.service(shell::shell_uid());

    let status = shell::run(
        &service,
        &["com.example.notify", "0", "add-flags", "21", "set-notify-uid-after-apply", "TRUE"],
    );
    assert_eq!(status, 0);

    let events = fixture.controller.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ControllerEvent::Notified { uid, owner_view } => {
            assert_eq!(*uid, Uid::new(USER, AppId(10_701)));
            let view = owner_view.as_ref().unwrap();
            assert_eq!(
                view.base_flags,
                BaseFlags::STORAGE_SCOPES_ENABLED | BaseFlags::CONTACT_SCOPES_ENABLED
            );
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sqlite_state_survives_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package_state.db");
    let app = PackageName::new("com.example.durable");
    let app_pkg = || {
        InstalledPackage::new(
            app.clone(),
            AppId(10_800),
            Manifest::new(34).with_permission(permission::READ_MEDIA_IMAGES),
        )
    };
    let paths = vec![PathScope::new("/sdcard/Pictures", PathScopeFlags::IS_DIR)];

    {
        let platform =
            ScopesPlatform::open(&path, ScopesConfig::default(), Arc::new(RecordingController::new())).unwrap();
        let mut packages = system_packages();
        packages.push(app_pkg());
        assert_eq!(platform.boot(packages).unwrap(), 0);

        let shell = shell::shell_uid();
        let mut editor = platform.edit(shell, &app, USER).unwrap();
        editor
            .add_flags(BaseFlags::STORAGE_SCOPES_ENABLED)
            .set_path_scopes(storage_scope::encode(&paths));
        assert!(editor.apply(&platform.service(shell)).unwrap());
        platform.flush().unwrap();
    }

    let platform =
        ScopesPlatform::open(&path, ScopesConfig::default(), Arc::new(RecordingController::new())).unwrap();
    let mut packages = system_packages();
    packages.push(app_pkg());
    assert_eq!(platform.boot(packages).unwrap(), 1);

    let record = platform.get(shell::shell_uid(), &app, USER).unwrap().unwrap();
    assert!(record.has_flags(BaseFlags::STORAGE_SCOPES_ENABLED));
    assert_eq!(record.path_scope_list(), paths);

    let process = platform.spawn_process(&app, USER).unwrap();
    assert!(process.should_spoof_self_permission_check(permission::READ_MEDIA_IMAGES));
}

#[test]
fn test_removed_package_state_is_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package_state.db");
    let app = PackageName::new("com.example.gone");
    let pkg = InstalledPackage::new(app.clone(), AppId(10_801), Manifest::new(34));

    {
        let platform =
            ScopesPlatform::open(&path, ScopesConfig::default(), Arc::new(RecordingController::new())).unwrap();
        platform.boot([pkg.clone()]).unwrap();
        let shell = shell::shell_uid();
        let mut editor = platform.edit(shell, &app, USER).unwrap();
        editor.add_flags(BaseFlags::CONTACT_SCOPES_ENABLED);
        assert!(editor.apply(&platform.service(shell)).unwrap());
        platform.remove_package(&app);
        platform.flush().unwrap();
    }

    let platform =
        ScopesPlatform::open(&path, ScopesConfig::default(), Arc::new(RecordingController::new())).unwrap();
    assert_eq!(platform.boot([pkg]).unwrap(), 0);
    assert!(platform.get(shell::shell_uid(), &app, USER).unwrap().is_none());
}
