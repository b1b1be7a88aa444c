//! picker-sync: downloads the photos and videos a user picked in a Google
//! Photos Picker session into `<directory>/<caller>/`, once per item.

#![warn(clippy::all)]

mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Command, SessionCommand, SyncArgs};
use config::Config;
use picker_sync::download::HttpDownloader;
use picker_sync::ledger::{Ledger, SqliteLedger};
use picker_sync::picker::PickerClient;
use picker_sync::sync::{SyncEngine, SyncOptions};
use picker_sync::{maintenance, shutdown};

/// Poll cadence while waiting for a selection, when the server suggests none.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-request timeout for listing and session calls. Downloads are not
/// bounded as a whole, only by connect timeout.
const API_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn api_client(config: &Config, page_size: u32) -> anyhow::Result<PickerClient> {
    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(API_TIMEOUT)
        .build()?;
    Ok(PickerClient::new(http, config.api_base.clone(), page_size, config.retry))
}

/// Run the status command.
async fn run_status(config: &Config) -> anyhow::Result<()> {
    if !config.ledger_path.exists() {
        println!("No ledger found at {}", config.ledger_path.display());
        println!("Run a sync first to create it.");
        return Ok(());
    }

    let ledger = SqliteLedger::open(&config.ledger_path).await?;
    let summary = ledger.summary().await?;

    println!("Ledger: {}", config.ledger_path.display());
    println!();
    println!("Items:");
    println!("  Total:   {}", summary.total);
    println!("  Done:    {}", summary.done);
    println!("  Pending: {}", summary.pending);

    Ok(())
}

/// Run the clear-pending command.
async fn run_clear_pending(config: &Config) -> anyhow::Result<()> {
    if !config.ledger_path.exists() {
        println!("No ledger found at {}", config.ledger_path.display());
        return Ok(());
    }

    let ledger = SqliteLedger::open(&config.ledger_path).await?;
    let removed = maintenance::clear_pending(&ledger).await?;
    println!("Removed {} pending record(s).", removed);
    Ok(())
}

/// Run the session subcommands.
async fn run_session(config: &Config, command: SessionCommand) -> anyhow::Result<()> {
    let credential = config.credential()?;
    let client = api_client(config, picker_sync::picker::MAX_PAGE_SIZE)?;

    match command {
        SessionCommand::New => {
            let session = client.create_session(credential).await?;
            println!("Session: {}", session.id);
            if let Some(uri) = &session.picker_uri {
                println!("Open this link to pick media: {}", uri);
            }
            if let Some(expires) = &session.expire_time {
                println!("Expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        SessionCommand::Status { id } => {
            let session = client.get_session(&id, credential).await?;
            println!("Session: {}", session.id);
            println!(
                "Selection: {}",
                if session.media_items_set {
                    "complete"
                } else {
                    "waiting for user"
                }
            );
            if let Some(expires) = &session.expire_time {
                println!("Expires: {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
    }
    Ok(())
}

/// Run the sync command. Returns `false` when any item failed or the pass
/// was interrupted.
async fn run_sync(config: &Config, args: SyncArgs) -> anyhow::Result<bool> {
    let credential = config.credential()?;
    let caller = config.caller()?;

    let shutdown_token = shutdown::install_signal_handler()?;

    let client = Arc::new(api_client(config, args.page_size)?);
    tracing::info!(
        session = %args.session,
        concurrency = args.jobs,
        page_size = client.page_size(),
        "Starting picker-sync"
    );

    if args.wait {
        client
            .wait_for_selection(
                &args.session,
                credential,
                DEFAULT_POLL_INTERVAL,
                Duration::from_secs(args.wait_timeout),
                &shutdown_token,
            )
            .await?;
        tracing::info!("Selection complete");
    }

    let ledger = Arc::new(SqliteLedger::open(&config.ledger_path).await?);

    let download_client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    let downloader = Arc::new(HttpDownloader::new(download_client, config.retry));

    let options = SyncOptions {
        download_root: config.directory.clone(),
        concurrency: usize::from(args.jobs.max(1)),
        no_progress_bar: config.no_progress_bar,
    };
    let engine = SyncEngine::new(ledger, client, downloader, options);

    let report = engine
        .sync(&args.session, credential, caller, &shutdown_token)
        .await?;

    if !report.failed.is_empty() {
        tracing::warn!("{} item(s) failed and stay pending:", report.failed.len());
        for failure in &report.failed {
            tracing::warn!("  {}", failure);
        }
    }
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level.as_filter())),
        )
        .init();

    let config = Config::from_args(&cli.global)?;
    tracing::debug!(?config, "Configuration");

    match cli.command {
        Command::Status => run_status(&config).await,
        Command::ClearPending => run_clear_pending(&config).await,
        Command::Session(command) => run_session(&config, command).await,
        Command::Sync(args) => {
            if !run_sync(&config, args).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
