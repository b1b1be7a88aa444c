use thiserror::Error;

/// A single item's transfer failed. Isolated per item by the sync engine.
#[derive(Debug, Error)]
#[error("Failed to download {filename} ({id}): {cause}")]
pub struct DownloadError {
    pub id: String,
    pub filename: String,
    #[source]
    pub cause: TransferError,
}

/// Why a transfer failed, classified for the retry loop.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP error {status}")]
    HttpStatus { status: u16 },

    #[error("HTTP error (bytes_so_far={bytes_written}): {source}")]
    Http {
        source: reqwest::Error,
        bytes_written: u64,
    },

    #[error("Short transfer: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("Transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Whether this error is transient and worth retrying.
    ///
    /// 403 is not retried: an expired `baseUrl` needs a fresh listing.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::HttpStatus { status } => *status == 429 || *status >= 500,
            TransferError::Http { .. } => true,
            TransferError::Truncated { .. } => true,
            TransferError::Disk(_) => false,
            TransferError::Cancelled => false,
        }
    }
}
