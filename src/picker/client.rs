use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::error::FetchError;
use super::types::{MediaItemsResponse, Page, PickerSession};
use crate::retry::{self, RetryAction, RetryConfig};
use crate::types::Credential;

/// Production endpoint of the Photos Picker API.
pub const DEFAULT_API_BASE: &str = "https://photospicker.googleapis.com/v1";

/// Largest page the listing endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Source of listing pages.
///
/// Each call is a pure function of `(session, cursor)`: callers restart a
/// listing simply by calling again without a cursor. Implementations return
/// `FetchError::Cancelled` once `cancel` fires.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch_page(
        &self,
        session_id: &str,
        credential: &Credential,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Page, FetchError>;
}

/// HTTP client for the Photos Picker API.
#[derive(Debug, Clone)]
pub struct PickerClient {
    http: Client,
    api_base: String,
    page_size: u32,
    retry: RetryConfig,
}

impl PickerClient {
    pub fn new(http: Client, api_base: impl Into<String>, page_size: u32, retry: RetryConfig) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            retry,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn attempt_fetch_page(
        &self,
        session_id: &str,
        credential: &Credential,
        cursor: Option<&str>,
    ) -> Result<Page, FetchError> {
        let owned_cursor = || cursor.map(str::to_string);

        let mut query: Vec<(&str, String)> = vec![
            ("sessionId", session_id.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(token) = cursor {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/mediaItems", self.api_base))
            .query(&query)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(|e| FetchError::Http {
                cursor: owned_cursor(),
                source: e,
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| FetchError::Http {
            cursor: owned_cursor(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                cursor: owned_cursor(),
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).chars().take(512).collect(),
            });
        }

        let parsed: MediaItemsResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
                cursor: owned_cursor(),
                source: e,
            })?;
        let page = parsed.into_page();

        tracing::debug!(
            items = page.items.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched listing page"
        );
        Ok(page)
    }

    /// Create a new picker session for the user behind `credential`.
    pub async fn create_session(&self, credential: &Credential) -> anyhow::Result<PickerSession> {
        let response = self
            .http
            .post(format!("{}/sessions", self.api_base))
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;
        read_session(response).await
    }

    /// Fetch the current state of a picker session.
    pub async fn get_session(
        &self,
        session_id: &str,
        credential: &Credential,
    ) -> anyhow::Result<PickerSession> {
        let response = self
            .http
            .get(format!("{}/sessions/{}", self.api_base, session_id))
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send()
            .await?;
        read_session(response).await
    }

    /// Poll a session until the user has finished picking.
    ///
    /// Honors the server's `pollInterval` (falling back to `fallback_interval`)
    /// and gives up after `timeout`.
    pub async fn wait_for_selection(
        &self,
        session_id: &str,
        credential: &Credential,
        fallback_interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<PickerSession> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let session = self.get_session(session_id, credential).await?;
            if session.media_items_set {
                return Ok(session);
            }

            let interval = session
                .polling_config
                .as_ref()
                .and_then(|p| p.poll_interval())
                .unwrap_or(fallback_interval);
            if tokio::time::Instant::now() + interval > deadline {
                anyhow::bail!(
                    "Timed out after {}s waiting for items to be picked in session {}",
                    timeout.as_secs(),
                    session_id
                );
            }

            tracing::debug!(session = %session_id, "Waiting for selection...");
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => anyhow::bail!("Cancelled while waiting for selection"),
            }
        }
    }
}

async fn read_session(response: reqwest::Response) -> anyhow::Result<PickerSession> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        anyhow::bail!("Sessions endpoint returned HTTP {}: {}", status.as_u16(), body);
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl MediaSource for PickerClient {
    async fn fetch_page(
        &self,
        session_id: &str,
        credential: &Credential,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Page, FetchError> {
        let fetch = retry::retry_with_backoff(
            &self.retry,
            cancel,
            |e: &FetchError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || self.attempt_fetch_page(session_id, credential, cursor),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled {
                cursor: cursor.map(str::to_string),
            }),
            result = fetch => result,
        }
    }
}
