//! File downloader: transfers one picked item's bytes to local storage.
//!
//! A transfer is all-or-nothing. Bytes land in a `.part` file that is only
//! renamed to `<destination>/<filename>` once complete, so an interrupted
//! transfer never leaves a file that looks finished.

pub mod error;
pub mod file;
pub mod paths;

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

pub use error::{DownloadError, TransferError};

use crate::picker::ItemDescriptor;
use crate::retry::RetryConfig;
use crate::types::Credential;

/// Transfers one item into a destination directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Write the item's bytes to `destination/<filename>`, creating
    /// `destination` if needed. Returns the final path.
    async fn download(
        &self,
        item: &ItemDescriptor,
        credential: &Credential,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError>;
}

/// Downloads over HTTP with the bearer credential.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    retry: RetryConfig,
}

impl HttpDownloader {
    pub fn new(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    async fn transfer(
        &self,
        item: &ItemDescriptor,
        credential: &Credential,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        tokio::fs::create_dir_all(destination).await?;

        let download_path = destination.join(paths::local_filename(&item.filename, &item.id));
        let part_path = paths::part_path(destination, &item.id);

        tracing::debug!(
            id = %item.id,
            kind = ?item.kind,
            path = %download_path.display(),
            "downloading"
        );

        let bytes = file::download_file(
            &self.client,
            &item.download_url(),
            credential,
            &download_path,
            &part_path,
            &self.retry,
            cancel,
        )
        .await?;

        // The rename succeeded; confirm the file is really there before the
        // caller records it as done.
        tokio::fs::metadata(&download_path).await?;

        if let Some(created) = item.created {
            let mtime_path = download_path.clone();
            let ts = created.timestamp();
            match tokio::task::spawn_blocking(move || set_file_mtime(&mtime_path, ts)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    "Could not set mtime on {}: {}",
                    download_path.display(),
                    e
                ),
                Err(e) => tracing::warn!("mtime task panicked: {}", e),
            }
        }

        tracing::debug!(bytes, "Downloaded {}", download_path.display());
        Ok(download_path)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        item: &ItemDescriptor,
        credential: &Credential,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        self.transfer(item, credential, destination, cancel)
            .await
            .map_err(|cause| DownloadError {
                id: item.id.clone(),
                filename: item.filename.clone(),
                cause,
            })
    }
}

/// Set the modification and access times of a file to a Unix timestamp.
///
/// Timestamps before 1970 are applied when representable, else clamped to
/// the epoch.
fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}
