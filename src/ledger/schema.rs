//! Ledger schema definition and migrations.

use rusqlite::Connection;

use super::error::LedgerError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: i32 = 1;

/// Schema DDL for version 1.
///
/// A `downloaded_files` table created by an earlier tool (same columns, no
/// CHECK constraint) is adopted untouched by `IF NOT EXISTS`.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS downloaded_files (
    id TEXT PRIMARY KEY,
    status INTEGER NOT NULL CHECK (status IN (1, 2))
);
"#;

pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32, LedgerError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), LedgerError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Initialize or migrate the ledger schema. Idempotent.
pub(crate) fn migrate(conn: &Connection) -> Result<(), LedgerError> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(LedgerError::UnsupportedSchemaVersion {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    if current_version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::debug!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Initialized ledger schema"
        );
    }

    Ok(())
}
