use thiserror::Error;

use crate::ledger::LedgerError;
use crate::picker::FetchError;

/// Errors that abort a whole sync pass.
///
/// Per-item transfer failures are not here; they are collected in the
/// report and the pass continues.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Listing failed: {0}")]
    Fetch(#[source] FetchError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid destination: {0}")]
    Destination(String),

    #[error("Sync cancelled before listing completed")]
    Cancelled,
}

impl From<FetchError> for SyncError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled { .. } => SyncError::Cancelled,
            other => SyncError::Fetch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_fetch_maps_to_cancelled() {
        let err: SyncError = FetchError::Cancelled {
            cursor: Some("c".into()),
        }
        .into();
        assert!(matches!(err, SyncError::Cancelled));
    }

    #[test]
    fn test_fetch_failure_keeps_cursor() {
        let err: SyncError = FetchError::CursorLoop { cursor: "c9".into() }.into();
        match err {
            SyncError::Fetch(inner) => assert_eq!(inner.cursor(), Some("c9")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
