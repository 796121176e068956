//! Hooks into process lifecycle.

use parking_lot::Mutex;

use scopes_core::{AppId, StateRecord, Uid, UserId};

/// Acts on running processes after a committed update.
///
/// Called outside the store's lock. Calls are fire-and-forget: the store
/// does not wait for processes to actually die.
pub trait ProcessController: Send + Sync {
    /// Terminate every process of `app_id` in `user`.
    fn kill_uid(&self, app_id: AppId, user: UserId, reason: &str);

    /// Deliver the owner's view of a changed record to the running
    /// processes of `uid`.
    fn on_state_changed(&self, uid: Uid, owner_view: Option<&StateRecord>);
}

/// A controller that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopController;

impl ProcessController for NoopController {
    fn kill_uid(&self, _app_id: AppId, _user: UserId, _reason: &str) {}

    fn on_state_changed(&self, _uid: Uid, _owner_view: Option<&StateRecord>) {}
}

/// What a [`RecordingController`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Killed { app_id: AppId, user: UserId },
    Notified { uid: Uid, owner_view: Option<StateRecord> },
}

/// A controller that records every call.
#[derive(Debug, Default)]
pub struct RecordingController {
    events: Mutex<Vec<ControllerEvent>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the events recorded so far.
    pub fn take(&self) -> Vec<ControllerEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl ProcessController for RecordingController {
    fn kill_uid(&self, app_id: AppId, user: UserId, _reason: &str) {
        self.events.lock().push(ControllerEvent::Killed { app_id, user });
    }

    fn on_state_changed(&self, uid: Uid, owner_view: Option<&StateRecord>) {
        self.events.lock().push(ControllerEvent::Notified {
            uid,
            owner_view: owner_view.cloned(),
        });
    }
}
