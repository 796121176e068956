//! Hooks run inside an app process.
//!
//! ## Overview
//!
//! A [`ProcessContext`] belongs to one running process. It reads the
//! process's own record through a [`ClientCache`] and answers the
//! permission, app-op and activity-launch questions the framework asks on
//! the app's behalf. It also owns the process's [`ScopeRedirector`],
//! which is switched on from the first self view carrying contact scopes:
//! at bind time, on a notified state change, or on any hook that reads
//! the self view.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use scopes_client::{CacheConfig, ClientCache, ContentObserver, ContentUri, ScopeRedirector};
use scopes_core::spoof::{self, GrantResult};
use scopes_core::{AppOp, CacheNonce, PackageName, SpoofableCheck, StateRecord, StateService, Uid};

const PACKAGE_SCHEME: &str = "package:";

/// Per-process state and hooks.
pub struct ProcessContext<S> {
    uid: Uid,
    package: PackageName,
    cache: ClientCache<S>,
    redirector: ScopeRedirector,
}

impl<S: StateService> ProcessContext<S> {
    pub fn new(uid: Uid, package: PackageName, service: S, nonce: CacheNonce, config: CacheConfig) -> Self {
        Self {
            uid,
            package,
            cache: ClientCache::new(service, nonce, config),
            redirector: ScopeRedirector::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn cache(&self) -> &ClientCache<S> {
        &self.cache
    }

    pub fn redirector(&self) -> &ScopeRedirector {
        &self.redirector
    }

    /// Read the own record when the application binds, so redirection is
    /// in place before the app touches any provider.
    pub fn on_bind(&self) {
        if self.self_state().is_some() {
            debug!(package = %self.package, "bound with state record");
        }
    }

    /// Handle a notified change of the own record.
    ///
    /// Returns whether redirection is enabled afterwards.
    pub fn on_state_changed(&self, owner_view: Option<&StateRecord>) -> bool {
        match owner_view {
            Some(record) => self.redirector.maybe_enable(record),
            None => self.redirector.is_enabled(),
        }
    }

    /// The process's view of its own record.
    pub fn self_state(&self) -> Option<StateRecord> {
        let record = self.cache.query(&self.package, self.uid.user_id())?;
        self.redirector.maybe_enable(&record);
        Some(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a check of `permission` against the process itself should
    /// report granted.
    pub fn should_spoof_self_permission_check(&self, permission: &str) -> bool {
        let check = SpoofableCheck::Permission(permission);
        // Skip the query for permissions that are never spoofed.
        if spoof::rule_for(check).is_none() {
            return false;
        }
        self.self_state()
            .map(|record| spoof::should_spoof(check, &record))
            .unwrap_or(false)
    }

    /// Whether an app-op check of `op` for `uid` should report allowed.
    ///
    /// Only the process's own uid is ever spoofed, and never the system
    /// uid.
    pub fn should_spoof_app_op_check(&self, op: AppOp, uid: Uid) -> bool {
        if !self.is_spoofing_allowed(uid) {
            return false;
        }
        let check = SpoofableCheck::AppOp(op);
        if spoof::rule_for(check).is_none() {
            return false;
        }
        self.self_state()
            .map(|record| spoof::should_spoof(check, &record))
            .unwrap_or(false)
    }

    fn is_spoofing_allowed(&self, uid: Uid) -> bool {
        uid == self.uid && uid != Uid::SYSTEM
    }

    /// Rewrite the results of a runtime permission request so spoofed
    /// permissions read as granted. Returns the number of results changed.
    pub fn maybe_spoof_grant_results(&self, permissions: &[&str], results: &mut [GrantResult]) -> usize {
        let any_denied_spoofable = permissions
            .iter()
            .zip(results.iter())
            .any(|(p, r)| *r == GrantResult::Denied && spoof::rule_for(SpoofableCheck::Permission(p)).is_some());
        if !any_denied_spoofable {
            return 0;
        }
        let record = self.self_state();
        spoof::maybe_spoof_grant_results(permissions, results, record.as_ref())
    }

    /// The action to launch instead of a special-access settings screen
    /// for this package, if any.
    ///
    /// `data_uri` is the launch's data URI (`package:<name>`).
    /// `has_real_grant` tells whether the app actually holds the access
    /// the screen would grant.
    pub fn maybe_rewrite_settings_action(
        &self,
        action: &str,
        data_uri: Option<&str>,
        has_real_grant: bool,
    ) -> Option<String> {
        let op = spoof::settings_action_op(action)?;
        let target = data_uri?.strip_prefix(PACKAGE_SCHEME)?;
        if target != self.package.as_str() || !self.is_spoofing_allowed(self.uid) {
            return None;
        }

        // An app that already appears to hold the access may be buggy and
        // launch the screen again; send it to the prompt too.
        if self.should_spoof_app_op_check(op, self.uid) || !has_real_grant {
            let rewritten = spoof::prompt_action(action);
            debug!(package = %self.package, action = %rewritten, "redirecting settings action");
            return Some(rewritten);
        }
        None
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Redirection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn resolve_authority<'a>(&self, authority: &'a str) -> Cow<'a, str> {
        self.redirector.resolve_authority(authority)
    }

    pub fn intercept_register_observer(&self, uri: &ContentUri, observer: Arc<dyn ContentObserver>) -> bool {
        self.redirector.intercept_register(uri, observer)
    }

    pub fn intercept_unregister_observer(&self, observer: &Arc<dyn ContentObserver>) -> bool {
        self.redirector.intercept_unregister(observer)
    }

    pub fn should_skip_notify_change(&self, uri: &ContentUri) -> bool {
        self.redirector.should_skip_notify_change(uri)
    }

    /// Deliver a broadcast received by the process.
    pub fn on_broadcast(&self, action: &str) -> usize {
        self.redirector.on_broadcast(action, self.uid.user_id())
    }
}
