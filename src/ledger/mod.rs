//! Persistent status ledger.
//!
//! Records, per media item identity, whether a download was reserved
//! (`Pending`) or completed (`Done`). The ledger is what lets a sync pass
//! resume after a crash: absence of a row means "never attempted", a
//! `Pending` row means "attempted but not finished", and `Done` is terminal.

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use db::{Ledger, SqliteLedger};
pub use error::LedgerError;
pub use types::{LedgerStatus, LedgerSummary};

/// Default ledger file name, created inside the download root.
pub const DEFAULT_LEDGER_FILE: &str = "downloaded.sqlite";
