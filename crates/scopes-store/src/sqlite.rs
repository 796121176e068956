//! SQLite implementation of the Persister trait.
//!
//! The primary persistence backend. Uses rusqlite with bundled SQLite; the
//! connection is shared behind a mutex since saves arrive from the
//! write-back worker thread.

use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rusqlite::{params, Connection};
use tracing::debug;

use scopes_core::{BaseFlags, PackageName, UserId};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{PersistedRow, Persister};

/// SQLite-based persister.
pub struct SqlitePersister {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersister {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&mut conn)
    }
}

fn row_to_persisted(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersistedRow> {
    let path_scopes: Option<Vec<u8>> = row.get("path_scopes")?;
    let contact_scopes: Option<Vec<u8>> = row.get("contact_scopes")?;
    Ok(PersistedRow {
        package: PackageName::new(row.get::<_, String>("package")?),
        user: UserId(row.get("user_id")?),
        base_flags: BaseFlags::from_raw(row.get("base_flags")?),
        path_scopes: path_scopes.map(Bytes::from),
        contact_scopes: contact_scopes.map(Bytes::from),
    })
}

impl Persister for SqlitePersister {
    fn load_all(&self) -> Result<Vec<PersistedRow>> {
        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, package, base_flags, path_scopes, contact_scopes
                 FROM package_state ORDER BY user_id, package",
            )?;
            let rows = stmt
                .query_map([], row_to_persisted)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn save_user(&self, user: UserId, rows: &[PersistedRow]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM package_state WHERE user_id = ?1", params![user.0])?;

            let now = now_millis();
            {
                let mut insert = tx.prepare(
                    "INSERT INTO package_state
                        (user_id, package, base_flags, path_scopes, contact_scopes, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in rows {
                    if row.user != user {
                        return Err(StoreError::InvalidData(format!(
                            "row for user {} in save of user {}",
                            row.user, user
                        )));
                    }
                    insert.execute(params![
                        user.0,
                        row.package.as_str(),
                        row.base_flags.bits(),
                        row.path_scopes.as_deref(),
                        row.contact_scopes.as_deref(),
                        now,
                    ])?;
                }
            }

            tx.commit()?;
            debug!(user = user.0, rows = rows.len(), "persisted package state");
            Ok(())
        })
    }
}
