//! Out-of-band ledger maintenance.

use crate::ledger::{Ledger, LedgerError};

/// Remove every record that never reached `Done`, so the next pass retries
/// those items from scratch. `Done` records are never touched.
pub async fn clear_pending(ledger: &dyn Ledger) -> Result<u64, LedgerError> {
    let removed = ledger.clear_pending().await?;
    if removed > 0 {
        tracing::info!(removed, "Cleared pending ledger records");
    } else {
        tracing::info!("No pending ledger records to clear");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerStatus, SqliteLedger};

    #[tokio::test]
    async fn test_clear_pending_leaves_done() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        for id in ["A", "B", "C"] {
            ledger.reserve(id).await.unwrap();
        }
        ledger.commit("A").await.unwrap();

        let removed = clear_pending(&ledger).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(ledger.get("A").await.unwrap(), Some(LedgerStatus::Done));
        assert_eq!(ledger.get("B").await.unwrap(), None);
        assert_eq!(ledger.get("C").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_pending_twice() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.reserve("A").await.unwrap();

        assert_eq!(clear_pending(&ledger).await.unwrap(), 1);
        assert_eq!(clear_pending(&ledger).await.unwrap(), 0);
    }
}
