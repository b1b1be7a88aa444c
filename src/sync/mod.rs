//! Sync engine: lists a picker session, then downloads every item the
//! ledger does not already record as done.
//!
//! Per item the ledger sees `reserve` before the transfer starts and
//! `commit` only after the file is in place, so a crash at any point leaves
//! the item `Pending` and the next pass retries it. Listing is strictly
//! sequential; transfers run on a bounded pool (`concurrency`, default 1).

pub mod error;

use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

pub use error::SyncError;

use crate::download::{paths, DownloadError, Downloader, TransferError};
use crate::ledger::{Ledger, LedgerError, LedgerStatus};
use crate::maintenance;
use crate::picker::{collect_all, ItemDescriptor, MediaSource};
use crate::types::Credential;

/// Knobs for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Files land in `<download_root>/<caller>/<filename>`.
    pub download_root: PathBuf,
    /// Maximum transfers in flight.
    pub concurrency: usize,
    pub no_progress_bar: bool,
}

impl SyncOptions {
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
            concurrency: 1,
            no_progress_bar: false,
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Items in the listing, duplicates included.
    pub listed: usize,
    /// Items reserved and handed to the downloader.
    pub attempted: usize,
    /// Identities committed as done, in completion order.
    pub succeeded: Vec<String>,
    pub failed: Vec<DownloadError>,
    /// Items already done before this pass.
    pub skipped: usize,
    /// Cancellation stopped the pass before every item was settled.
    pub interrupted: bool,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.interrupted
    }
}

pub struct SyncEngine {
    ledger: Arc<dyn Ledger>,
    source: Arc<dyn MediaSource>,
    downloader: Arc<dyn Downloader>,
    options: SyncOptions,
}

impl SyncEngine {
    /// The ledger must already be open; the engine never owns its lifecycle.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        source: Arc<dyn MediaSource>,
        downloader: Arc<dyn Downloader>,
        options: SyncOptions,
    ) -> Self {
        Self {
            ledger,
            source,
            downloader,
            options,
        }
    }

    /// Run one full pass over a session's picked items for `caller`.
    ///
    /// A listing failure or any ledger failure aborts the pass. A failed
    /// transfer is recorded in the report, its item stays `Pending`, and the
    /// pass continues.
    pub async fn sync(
        &self,
        session_id: &str,
        credential: &Credential,
        caller: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let destination = paths::caller_directory(&self.options.download_root, caller)
            .map_err(|e| SyncError::Destination(e.to_string()))?;

        let items = collect_all(self.source.as_ref(), session_id, credential, cancel).await?;

        let mut report = SyncReport {
            listed: items.len(),
            ..SyncReport::default()
        };
        if items.is_empty() {
            tracing::info!(session = %session_id, "No items picked, nothing to download");
            return Ok(report);
        }

        let pb = create_progress_bar(self.options.no_progress_bar, items.len() as u64);
        let dispatched = self
            .dispatch(items, credential, &destination, cancel, &pb, &mut report)
            .await;
        pb.finish_and_clear();
        dispatched?;

        log_summary(&report, &destination, started.elapsed());
        Ok(report)
    }

    /// Delete every ledger record not yet done.
    pub async fn clear_pending(&self) -> Result<u64, LedgerError> {
        maintenance::clear_pending(self.ledger.as_ref()).await
    }

    async fn dispatch(
        &self,
        items: Vec<ItemDescriptor>,
        credential: &Credential,
        destination: &Path,
        cancel: &CancellationToken,
        pb: &ProgressBar,
        report: &mut SyncReport,
    ) -> Result<(), LedgerError> {
        let concurrency = self.options.concurrency.max(1);
        let downloader = self.downloader.as_ref();

        // Each identity is owned by at most one in-flight future.
        let mut claimed: HashSet<String> = HashSet::with_capacity(items.len());
        let mut queue = items.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut stopping = false;
        let mut failed_after_cancel = false;

        loop {
            while !stopping && in_flight.len() < concurrency {
                if cancel.is_cancelled() {
                    pb.suspend(|| tracing::info!("Shutdown requested, stopping new downloads"));
                    stopping = true;
                    break;
                }
                let Some(item) = queue.next() else {
                    break;
                };

                if !claimed.insert(item.id.clone()) {
                    tracing::debug!(id = %item.id, "Duplicate in listing, already dispatched");
                    pb.inc(1);
                    continue;
                }

                match self.ledger.get(&item.id).await? {
                    Some(LedgerStatus::Done) => {
                        report.skipped += 1;
                        pb.inc(1);
                        continue;
                    }
                    Some(LedgerStatus::Pending) => {
                        tracing::debug!(id = %item.id, "Retrying item left pending by an earlier pass");
                    }
                    None => {}
                }

                self.ledger.reserve(&item.id).await?;
                report.attempted += 1;

                in_flight.push(async move {
                    let result = downloader
                        .download(&item, credential, destination, cancel)
                        .await;
                    (item, result)
                });
            }

            let Some((item, result)) = in_flight.next().await else {
                break;
            };

            pb.set_message(item.filename.clone());
            match result {
                Ok(path) => {
                    self.ledger.commit(&item.id).await?;
                    tracing::debug!(id = %item.id, path = %path.display(), "Committed");
                    report.succeeded.push(item.id);
                }
                Err(e) => {
                    pb.suspend(|| tracing::error!("{}", e));
                    // Any failure once the token fired may have been cut short.
                    if cancel.is_cancelled() || matches!(e.cause, TransferError::Cancelled) {
                        failed_after_cancel = true;
                    }
                    report.failed.push(e);
                }
            }
            pb.inc(1);
        }

        report.interrupted = failed_after_cancel
            || (cancel.is_cancelled() && !queue.as_slice().is_empty());
        Ok(())
    }
}

/// Progress bar sized to the listing.
///
/// Hidden when `--no-progress-bar` was passed or stdout is not a terminal.
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn log_summary(report: &SyncReport, destination: &Path, elapsed: Duration) {
    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} downloaded, {} failed, {} already done, {} listed",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped,
        report.listed
    );
    tracing::info!("  destination: {}", destination.display());
    tracing::info!("  elapsed: {}", format_duration(elapsed));
    if report.interrupted {
        tracing::warn!("  Interrupted, unfinished items stay pending for the next pass");
    }
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
