use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::error::TransferError;
use crate::retry::{self, RetryAction, RetryConfig};
use crate::types::Credential;

/// Download `url` to `download_path` through a `.part` file.
///
/// Each attempt truncates the `.part` file and starts from scratch; the file
/// is renamed into place only after the whole body has been written. Retries
/// with exponential backoff on transient failures. Once `cancel` fires the
/// result is `TransferError::Cancelled`, even when it fired during a backoff
/// sleep. Returns the byte count.
pub async fn download_file(
    client: &Client,
    url: &str,
    credential: &Credential,
    download_path: &Path,
    part_path: &Path,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let result = retry::retry_with_backoff(
        retry_config,
        cancel,
        |e: &TransferError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || attempt_download(client, url, credential, download_path, part_path, cancel),
    )
    .await;

    match result {
        Err(e) if cancel.is_cancelled() && !matches!(e, TransferError::Cancelled) => {
            tracing::debug!(path = %download_path.display(), "Cancelled after: {}", e);
            Err(TransferError::Cancelled)
        }
        other => other,
    }
}

/// Removes a `.part` file on drop unless the transfer completed.
///
/// Covers early returns as well as the future being dropped mid-transfer.
struct PartFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Could not remove {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// Single transfer attempt.
async fn attempt_download(
    client: &Client,
    url: &str,
    credential: &Credential,
    download_path: &Path,
    part_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(TransferError::Cancelled),
        sent = client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send() => sent.map_err(|e| TransferError::Http {
                source: e,
                bytes_written: 0,
            })?,
    };

    if !response.status().is_success() {
        return Err(TransferError::HttpStatus {
            status: response.status().as_u16(),
        });
    }

    let content_length = response.content_length();

    let part = PartFile::new(part_path);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| {
            tracing::warn!(
                path = %download_path.display(),
                content_length = ?content_length,
                bytes_so_far = bytes_written,
                "Body error: {}",
                e
            );
            TransferError::Http {
                source: e,
                bytes_written,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Some(expected) = content_length {
        if expected != bytes_written {
            return Err(TransferError::Truncated {
                expected,
                received: bytes_written,
            });
        }
    }

    fs::rename(part_path, download_path).await?;
    part.disarm();

    Ok(bytes_written)
}
