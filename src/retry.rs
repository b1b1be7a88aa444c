use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use tokio_util::sync::CancellationToken;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Exponential backoff with jitter, shared by listing requests and file
/// transfers.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// No retries at all; the first failure is returned.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry `retry` (0-indexed):
    /// `min(base * 2^retry, max) + random_jitter(0..base)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let base_ms = self.base_delay.as_millis() as u64;
        let jitter = if base_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
        } else {
            Duration::ZERO
        };
        capped + jitter
    }
}

/// Retry an async operation with exponential backoff.
///
/// Returns the first `Ok`, or the last error when retries are exhausted, the
/// classifier returns `Abort`, or `cancel` fires during a backoff sleep.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };

        attempt += 1;
        if classifier(&err) == RetryAction::Abort || attempt >= total_attempts {
            return Err(err);
        }

        let delay = config.delay_for_retry(attempt - 1);
        tracing::warn!(
            "Retryable error (attempt {}/{}), retrying in {}ms: {}",
            attempt,
            total_attempts,
            delay.as_millis(),
            err
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay, Duration::from_secs(5));
        assert_eq!(config.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_delay_exponential_backoff() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        };
        let d = config.delay_for_retry(0);
        assert!(d >= Duration::from_secs(2) && d < Duration::from_secs(4));

        let d = config.delay_for_retry(2);
        assert!(d >= Duration::from_secs(8) && d < Duration::from_secs(10));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
        };
        let d = config.delay_for_retry(40);
        assert!(d >= Duration::from_secs(30) && d < Duration::from_secs(35));
    }

    #[test]
    fn test_delay_zero_base() {
        assert_eq!(instant(3).delay_for_retry(0), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result: Result<i32, String> = retry_with_backoff(
            &instant(3),
            &CancellationToken::new(),
            |_| RetryAction::Retry,
            || async { Ok(42) },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_abort_on_non_retryable() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<i32, String> = retry_with_backoff(
            &instant(3),
            &CancellationToken::new(),
            |_| RetryAction::Abort,
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<i32, String> = retry_with_backoff(
            &instant(3),
            &CancellationToken::new(),
            |_| RetryAction::Retry,
            || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(99)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<i32, String> = retry_with_backoff(
            &instant(2),
            &CancellationToken::new(),
            |_| RetryAction::Retry,
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("still failing".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "still failing");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(3600),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<i32, String> = retry_with_backoff(
            &config,
            &cancel,
            |_| RetryAction::Retry,
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
