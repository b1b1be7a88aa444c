use clap::{Args, Parser, Subcommand};

use picker_sync::picker::DEFAULT_API_BASE;
use picker_sync::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "picker-sync",
    version,
    about = "Download media picked in a Google Photos Picker session"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Root directory for downloads (files go to <directory>/<caller>/)
    #[arg(short = 'd', long, env = "PICKER_DIRECTORY", global = true)]
    pub directory: Option<String>,

    /// Ledger database path (default: <directory>/downloaded.sqlite)
    #[arg(long, global = true)]
    pub ledger: Option<String>,

    /// OAuth access token for the Photos Picker API.
    /// Prefer the PICKER_ACCESS_TOKEN environment variable; flags are
    /// visible in process listings.
    #[arg(long, env = "PICKER_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Identity of the user the media belongs to; names the download subdirectory
    #[arg(long, env = "PICKER_CALLER_ID", global = true)]
    pub caller: Option<String>,

    /// Picker API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, global = true, hide = true)]
    pub api_base: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long, global = true)]
    pub no_progress_bar: bool,

    /// Max retries per request on transient failures (0 = no retries)
    #[arg(long, default_value_t = 2, global = true)]
    pub max_retries: u32,

    /// Base delay in seconds between retries
    #[arg(long, default_value_t = 5, global = true)]
    pub retry_delay: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download every picked item not yet recorded as done
    Sync(SyncArgs),

    /// Forget all items that never finished, so the next sync retries them
    ClearPending,

    /// Show ledger counts
    Status,

    /// Manage picker sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Picker session to download from
    #[arg(long)]
    pub session: String,

    /// Poll the session until the user has finished picking
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 1800)]
    pub wait_timeout: u64,

    /// Number of concurrent downloads
    #[arg(short = 'j', long, default_value_t = 1)]
    pub jobs: u16,

    /// Items requested per listing page (1-100)
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Create a session and print the URI the user opens to pick media
    New,

    /// Show whether the user has finished picking
    Status {
        /// Session identifier
        id: String,
    },
}
