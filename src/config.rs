use std::path::PathBuf;
use std::time::Duration;

use picker_sync::ledger::DEFAULT_LEDGER_FILE;
use picker_sync::retry::RetryConfig;
use picker_sync::types::Credential;

use crate::cli::GlobalArgs;

/// Upper bound for backoff between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Resolved settings shared by every subcommand.
pub struct Config {
    pub directory: PathBuf,
    pub ledger_path: PathBuf,
    pub api_base: String,
    pub credential: Option<Credential>,
    pub caller: Option<String>,
    pub retry: RetryConfig,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("ledger_path", &self.ledger_path)
            .field("api_base", &self.api_base)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("caller", &self.caller)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_args(args: &GlobalArgs) -> anyhow::Result<Self> {
        let directory = args
            .directory
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| PathBuf::from("."));

        let ledger_path = match args.ledger.as_deref() {
            Some(path) => expand_tilde(path),
            None => directory.join(DEFAULT_LEDGER_FILE),
        };

        let credential = args
            .access_token
            .as_deref()
            .map(Credential::new)
            .filter(|c| !c.is_empty());

        let caller = args
            .caller
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let retry = RetryConfig {
            max_retries: args.max_retries,
            base_delay: Duration::from_secs(args.retry_delay),
            max_delay: MAX_RETRY_DELAY.max(Duration::from_secs(args.retry_delay)),
        };

        Ok(Self {
            directory,
            ledger_path,
            api_base: args.api_base.trim_end_matches('/').to_string(),
            credential,
            caller,
            retry,
            no_progress_bar: args.no_progress_bar,
        })
    }

    pub fn credential(&self) -> anyhow::Result<&Credential> {
        self.credential.as_ref().ok_or_else(|| {
            anyhow::anyhow!("No access token: pass --access-token or set PICKER_ACCESS_TOKEN")
        })
    }

    pub fn caller(&self) -> anyhow::Result<&str> {
        self.caller.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No caller identity: pass --caller or set PICKER_CALLER_ID")
        })
    }
}
