//! Ledger trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

use super::error::LedgerError;
use super::schema;
use super::types::{LedgerStatus, LedgerSummary};

/// Durable map from item identity to download status.
///
/// Every operation is a single short statement, atomic with respect to one
/// identity. Object-safe so the sync engine can hold an `Arc<dyn Ledger>`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Look up the status of an identity. `None` means never attempted.
    async fn get(&self, id: &str) -> Result<Option<LedgerStatus>, LedgerError>;

    /// Mark an identity `Pending`, inserting it if absent.
    ///
    /// A `Done` record is left untouched.
    async fn reserve(&self, id: &str) -> Result<(), LedgerError>;

    /// Mark a reserved identity `Done`.
    async fn commit(&self, id: &str) -> Result<(), LedgerError>;

    /// Delete every record that is not `Done`. Returns the number removed.
    async fn clear_pending(&self) -> Result<u64, LedgerError>;

    /// Count records by status.
    async fn summary(&self) -> Result<LedgerSummary, LedgerError>;
}

/// SQLite-backed ledger.
pub struct SqliteLedger {
    /// rusqlite::Connection is not Sync. The guard is always dropped before
    /// the enclosing future yields.
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Open or create a ledger at the given path, creating parent
    /// directories as needed.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path_clone.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| LedgerError::CreateDir {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
                }
            }

            let conn = Connection::open(&path_clone).map_err(|e| LedgerError::Open {
                path: path_clone.clone(),
                source: e,
            })?;

            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(LedgerError::Migration)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(LedgerError::Migration)?;

            schema::migrate(&conn)?;

            Ok::<_, LedgerError>(conn)
        })
        .await??;

        tracing::debug!(path = %path.display(), "Ledger opened");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(|e| LedgerError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Query(e.to_string()))
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn get(&self, id: &str) -> Result<Option<LedgerStatus>, LedgerError> {
        let conn = self.lock()?;

        // Read dynamically typed: an adopted table may hold any SQLite type.
        let stored: Option<Value> = conn
            .query_row(
                "SELECT status FROM downloaded_files WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(LedgerError::query)?;

        Ok(stored.map(|value| {
            let status = match &value {
                Value::Integer(code) => LedgerStatus::from_code(*code),
                _ => None,
            };
            status.unwrap_or_else(|| {
                // Only reachable with a table adopted from an older tool.
                tracing::warn!(id = %id, stored = ?value, "Unrecognized ledger status, treating as pending");
                LedgerStatus::Pending
            })
        }))
    }

    async fn reserve(&self, id: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO downloaded_files (id, status) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET status = excluded.status
            WHERE downloaded_files.status IS NOT ?3
            "#,
            rusqlite::params![
                id,
                LedgerStatus::Pending.code(),
                LedgerStatus::Done.code()
            ],
        )
        .map_err(LedgerError::query)?;

        Ok(())
    }

    async fn commit(&self, id: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;

        let rows = conn
            .execute(
                "UPDATE downloaded_files SET status = ?1 WHERE id = ?2",
                rusqlite::params![LedgerStatus::Done.code(), id],
            )
            .map_err(LedgerError::query)?;

        if rows == 0 {
            return Err(LedgerError::NotReserved(id.to_string()));
        }
        Ok(())
    }

    async fn clear_pending(&self) -> Result<u64, LedgerError> {
        let conn = self.lock()?;

        let rows = conn
            .execute(
                "DELETE FROM downloaded_files WHERE status IS NOT ?1",
                [LedgerStatus::Done.code()],
            )
            .map_err(LedgerError::query)?;

        Ok(rows as u64)
    }

    async fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let conn = self.lock()?;

        let (total, done): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END), 0) FROM downloaded_files",
                [LedgerStatus::Done.code()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(LedgerError::query)?;

        Ok(LedgerSummary {
            total: total as u64,
            pending: (total - done) as u64,
            done: done as u64,
        })
    }
}
