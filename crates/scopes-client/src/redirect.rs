//! Content provider redirection for processes with contact scopes.
//!
//! ## Overview
//!
//! Once a process observes its own record with contact scopes enabled, the
//! redirector switches on for the rest of the process lifetime. From then
//! on the contacts authorities are rewritten to their virtualized
//! counterparts, and observer registrations on contacts URIs are held
//! locally instead of reaching the real provider (which the process no
//! longer has access to).
//!
//! Held observers are driven by [`ScopeRedirector::notify_all`], which the
//! process calls when it receives the
//! [`ACTION_NOTIFY_CONTENT_OBSERVERS`] broadcast.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use scopes_core::provider::{
    ACTION_NOTIFY_CONTENT_OBSERVERS, CONTACTS_AUTHORITY, ICC_AUTHORITY, SCOPED_CONTACTS_AUTHORITY,
    SIM_PHONEBOOK_AUTHORITY, STUB_AUTHORITY_SUFFIX,
};
use scopes_core::{BaseFlags, StateRecord, UserId};

use crate::error::{ClientError, Result};

const CONTENT_SCHEME: &str = "content://";

/// A `content://authority/path` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    authority: String,
    path: String,
}

impl ContentUri {
    pub fn new(authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            path: path.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path including its leading slash, or empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The same URI with a different authority.
    pub fn with_authority(&self, authority: impl Into<String>) -> Self {
        Self::new(authority, self.path.clone())
    }
}

impl FromStr for ContentUri {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(CONTENT_SCHEME)
            .ok_or_else(|| ClientError::InvalidUri(s.to_string()))?;
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(ClientError::InvalidUri(s.to_string()));
        }
        Ok(Self::new(authority, path))
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", CONTENT_SCHEME, self.authority, self.path)
    }
}

/// Whether `authority` belongs to a provider holding contacts data.
pub fn is_contacts_authority(authority: &str) -> bool {
    matches!(authority, CONTACTS_AUTHORITY | SIM_PHONEBOOK_AUTHORITY | ICC_AUTHORITY)
}

pub fn is_contacts_uri(uri: &ContentUri) -> bool {
    is_contacts_authority(uri.authority())
}

/// Receives content change notifications.
pub trait ContentObserver: Send + Sync {
    fn on_change(&self, self_change: bool, uris: &[ContentUri], user: UserId);
}

/// Observers whose registration was held back, with the URIs each one
/// registered for. Observers are identified by pointer.
#[derive(Default)]
pub struct ObserverRegistry {
    list: Mutex<Vec<(Arc<dyn ContentObserver>, Vec<ContentUri>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn ContentObserver>, uri: ContentUri) {
        let mut list = self.list.lock();
        match list.iter_mut().find(|(o, _)| Arc::ptr_eq(o, &observer)) {
            Some((_, uris)) => uris.push(uri),
            None => list.push((observer, vec![uri])),
        }
    }

    /// Returns false if the observer was never added.
    pub fn remove(&self, observer: &Arc<dyn ContentObserver>) -> bool {
        let mut list = self.list.lock();
        match list.iter().position(|(o, _)| Arc::ptr_eq(o, observer)) {
            Some(i) => {
                list.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.lock().is_empty()
    }

    /// Deliver a change to every held observer.
    ///
    /// Observers are called outside the lock, so they may register or
    /// unregister from within `on_change`.
    pub fn notify_all(&self, user: UserId) -> usize {
        let snapshot = self.list.lock().clone();
        for (observer, uris) in &snapshot {
            observer.on_change(false, uris, user);
        }
        snapshot.len()
    }
}

/// Per-process redirection switch.
///
/// Disabled until [`maybe_enable`](Self::maybe_enable) sees a record with
/// contact scopes; never disabled again.
#[derive(Default)]
pub struct ScopeRedirector {
    enabled: AtomicBool,
    enable_lock: Mutex<()>,
    observers: ObserverRegistry,
}

impl ScopeRedirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable redirection if `record` has contact scopes enabled.
    ///
    /// Returns whether redirection is enabled after the call.
    pub fn maybe_enable(&self, record: &StateRecord) -> bool {
        let _guard = self.enable_lock.lock();
        if self.is_enabled() {
            return true;
        }
        if !record.has_flags(BaseFlags::CONTACT_SCOPES_ENABLED) {
            return false;
        }
        self.enabled.store(true, Ordering::Release);
        info!("contact scopes enabled, redirecting contacts providers");
        true
    }

    /// The virtualized authority for `authority`, if it is redirected.
    pub fn translate_authority(&self, authority: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        match authority {
            CONTACTS_AUTHORITY => Some(SCOPED_CONTACTS_AUTHORITY.to_string()),
            SIM_PHONEBOOK_AUTHORITY | ICC_AUTHORITY => Some(format!("{}{}", authority, STUB_AUTHORITY_SUFFIX)),
            _ => None,
        }
    }

    /// The authority to actually connect to.
    pub fn resolve_authority<'a>(&self, authority: &'a str) -> Cow<'a, str> {
        match self.translate_authority(authority) {
            Some(translated) => {
                debug!(from = authority, to = %translated, "redirecting content provider");
                Cow::Owned(translated)
            }
            None => Cow::Borrowed(authority),
        }
    }

    /// Registering an observer requires read access to the provider, so
    /// registrations on contacts URIs are held locally.
    pub fn should_suppress_observer_registration(&self, uri: &ContentUri) -> bool {
        self.is_enabled() && is_contacts_uri(uri)
    }

    /// Hold `observer` if its registration must not reach the provider.
    ///
    /// Returns true when the registration was intercepted.
    pub fn intercept_register(&self, uri: &ContentUri, observer: Arc<dyn ContentObserver>) -> bool {
        if !self.should_suppress_observer_registration(uri) {
            return false;
        }
        self.observers.add(observer, uri.clone());
        true
    }

    /// Returns true when `observer` was held here and is now released.
    pub fn intercept_unregister(&self, observer: &Arc<dyn ContentObserver>) -> bool {
        self.is_enabled() && self.observers.remove(observer)
    }

    /// Change notifications on contacts URIs would be refused by the
    /// provider.
    pub fn should_skip_notify_change(&self, uri: &ContentUri) -> bool {
        self.is_enabled() && is_contacts_uri(uri)
    }

    /// Drive every held observer. Returns how many were notified.
    pub fn notify_all(&self, user: UserId) -> usize {
        self.observers.notify_all(user)
    }

    /// Handle a broadcast delivered to the process.
    pub fn on_broadcast(&self, action: &str, user: UserId) -> usize {
        if action != ACTION_NOTIFY_CONTENT_OBSERVERS || !self.is_enabled() {
            return 0;
        }
        self.notify_all(user)
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }
}
