//! Background write-back of committed state.
//!
//! Updates hand a snapshot of the affected user's rows to a worker thread
//! and return immediately. Snapshots queued for the same user are
//! coalesced: only the latest is written. Failures are logged; the
//! in-memory state stays authoritative.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use scopes_core::UserId;

use crate::error::{Result, StoreError};
use crate::traits::{PersistedRow, Persister};

enum Command {
    Save { user: UserId, rows: Vec<PersistedRow> },
    Flush(oneshot::Sender<()>),
}

/// Handle to the write-back worker.
pub struct WriteBack {
    tx: Option<mpsc::UnboundedSender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteBack {
    /// Start a worker writing through `persister`.
    pub fn spawn(persister: Arc<dyn Persister>) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = std::thread::Builder::new()
            .name("scopes-writeback".into())
            .spawn(move || run(persister, rx))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queue a snapshot of `user`'s rows.
    pub fn schedule(&self, user: UserId, rows: Vec<PersistedRow>) {
        let sent = self
            .tx
            .as_ref()
            .map(|tx| tx.send(Command::Save { user, rows }).is_ok())
            .unwrap_or(false);
        if !sent {
            error!(user = user.0, "write-back worker stopped, state not persisted");
        }
    }

    /// Block until every snapshot queued so far has been written.
    pub fn flush(&self) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(StoreError::WorkerStopped)?;
        let (done_tx, done_rx) = oneshot::channel();
        tx.send(Command::Flush(done_tx))
            .map_err(|_| StoreError::WorkerStopped)?;
        done_rx.blocking_recv().map_err(|_| StoreError::WorkerStopped)
    }
}

impl Drop for WriteBack {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("write-back worker panicked");
            }
        }
    }
}

fn run(persister: Arc<dyn Persister>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut pending: BTreeMap<UserId, Vec<PersistedRow>> = BTreeMap::new();
    let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();

    while let Some(first) = rx.blocking_recv() {
        let mut next = Some(first);
        while let Some(cmd) = next {
            match cmd {
                Command::Save { user, rows } => {
                    pending.insert(user, rows);
                }
                Command::Flush(done) => waiters.push(done),
            }
            next = rx.try_recv().ok();
        }

        for (user, rows) in std::mem::take(&mut pending) {
            match persister.save_user(user, &rows) {
                Ok(()) => debug!(user = user.0, rows = rows.len(), "state written"),
                Err(e) => error!(user = user.0, error = %e, "failed to persist package state"),
            }
        }

        for done in waiters.drain(..) {
            let _ = done.send(());
        }
    }
}

/// Writes synchronously on the caller's thread.
pub(crate) fn write_now(persister: &dyn Persister, user: UserId, rows: &[PersistedRow]) {
    if let Err(e) = persister.save_user(user, rows) {
        error!(user = user.0, error = %e, "failed to persist package state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPersister;
    use scopes_core::{BaseFlags, PackageName};

    fn row(name: &str, user: u32) -> PersistedRow {
        PersistedRow {
            package: PackageName::new(name),
            user: UserId(user),
            base_flags: BaseFlags::STORAGE_SCOPES_ENABLED,
            path_scopes: None,
            contact_scopes: None,
        }
    }

    #[test]
    fn test_flush_waits_for_queued_writes() {
        let persister = Arc::new(MemoryPersister::new());
        let wb = WriteBack::spawn(persister.clone()).unwrap();

        wb.schedule(UserId(0), vec![row("a", 0)]);
        wb.schedule(UserId(0), vec![row("a", 0), row("b", 0)]);
        wb.flush().unwrap();

        assert_eq!(persister.len(), 2);
        // Coalescing may merge the two saves, never add more.
        assert!(persister.save_count() <= 2);
    }

    #[test]
    fn test_failures_do_not_stop_the_worker() {
        let persister = Arc::new(MemoryPersister::new());
        let wb = WriteBack::spawn(persister.clone()).unwrap();

        persister.set_fail_writes(true);
        wb.schedule(UserId(0), vec![row("a", 0)]);
        wb.flush().unwrap();
        assert!(persister.is_empty());

        persister.set_fail_writes(false);
        wb.schedule(UserId(0), vec![row("a", 0)]);
        wb.flush().unwrap();
        assert_eq!(persister.len(), 1);
    }

    #[test]
    fn test_drop_drains_queue() {
        let persister = Arc::new(MemoryPersister::new());
        {
            let wb = WriteBack::spawn(persister.clone()).unwrap();
            wb.schedule(UserId(10), vec![row("a", 10)]);
        }
        assert_eq!(persister.len(), 1);
    }
}
