//! The in-process [`StateService`] endpoint.

use std::sync::Arc;

use scopes_core::{PackageName, RemoteError, RemoteResult, StateRecord, StateService, StateUpdate, Uid, UserId};

use crate::central::CentralStore;
use crate::error::StoreError;

/// A [`CentralStore`] handle bound to one caller identity.
#[derive(Clone)]
pub struct BoundService {
    store: Arc<CentralStore>,
    caller: Uid,
}

impl BoundService {
    pub fn new(store: Arc<CentralStore>, caller: Uid) -> Self {
        Self { store, caller }
    }

    pub fn caller(&self) -> Uid {
        self.caller
    }

    pub fn store(&self) -> &Arc<CentralStore> {
        &self.store
    }
}

fn to_remote(e: StoreError) -> RemoteError {
    match e {
        StoreError::AccessDenied(denied) => RemoteError::AccessDenied(denied.to_string()),
        other => RemoteError::Transport(other.to_string()),
    }
}

impl StateService for BoundService {
    fn get_state(&self, package: &PackageName, user: UserId) -> RemoteResult<Option<StateRecord>> {
        self.store.get(self.caller, package, user).map_err(to_remote)
    }

    fn update_state(&self, package: &PackageName, user: UserId, update: StateUpdate) -> RemoteResult<bool> {
        self.store
            .update(self.caller, package, user, update)
            .map_err(to_remote)
    }
}

impl CentralStore {
    /// A service handle that acts as `caller`.
    pub fn bind(self: &Arc<Self>, caller: Uid) -> BoundService {
        BoundService::new(self.clone(), caller)
    }
}
