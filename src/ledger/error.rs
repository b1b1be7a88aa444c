//! Error types for the status ledger.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by ledger operations. All of them are fatal to a sync pass.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open or create the database file.
    #[error("Failed to open ledger at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// Failed to create the directory holding the database file.
    #[error("Failed to create ledger directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to initialize or migrate the schema.
    #[error("Ledger migration failed: {0}")]
    Migration(#[from] rusqlite::Error),

    /// A query failed.
    #[error("Ledger query failed: {0}")]
    Query(String),

    /// `commit` was called for an identity that was never reserved.
    #[error("No ledger record for {0}; reserve before commit")]
    NotReserved(String),

    /// Failed to spawn a blocking task.
    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),

    /// The database schema version is newer than supported.
    #[error("Ledger schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

impl LedgerError {
    /// Create a Query error from a rusqlite error.
    pub fn query(source: rusqlite::Error) -> Self {
        Self::Query(source.to_string())
    }
}
