use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Kind of media behind an item. Decides the download variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Server-side selector appended to `baseUrl` as `=<suffix>`.
    /// `d` returns the original bytes of a photo, `dv` the video stream.
    pub const fn download_suffix(self) -> &'static str {
        match self {
            MediaKind::Photo => "d",
            MediaKind::Video => "dv",
        }
    }
}

/// One media item as enumerated by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub id: String,
    pub kind: MediaKind,
    pub filename: String,
    pub base_url: String,
    pub created: Option<DateTime<Utc>>,
    /// Zero-based position in the full listing.
    pub position: usize,
}

impl ItemDescriptor {
    pub fn download_url(&self) -> String {
        format!("{}={}", self.base_url, self.kind.download_suffix())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<ItemDescriptor>,
    pub next_cursor: Option<String>,
}

// ── Wire formats ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaItemsResponse {
    #[serde(default)]
    pub media_items: Vec<PickedMediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PickedMediaItem {
    pub id: String,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: WireMediaKind,
    pub media_file: MediaFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum WireMediaKind {
    Photo,
    Video,
    #[default]
    #[serde(other)]
    TypeUnspecified,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaFile {
    pub base_url: String,
    pub filename: String,
}

impl MediaItemsResponse {
    /// Convert into a `Page`. Positions are relative to this page; an
    /// empty `nextPageToken` is treated as the end of the listing.
    pub(crate) fn into_page(self) -> Page {
        let items = self
            .media_items
            .into_iter()
            .enumerate()
            .map(|(position, item)| ItemDescriptor {
                id: item.id,
                kind: match item.kind {
                    WireMediaKind::Video => MediaKind::Video,
                    WireMediaKind::Photo | WireMediaKind::TypeUnspecified => MediaKind::Photo,
                },
                filename: item.media_file.filename,
                base_url: item.media_file.base_url,
                created: item.create_time,
                position,
            })
            .collect();

        Page {
            items,
            next_cursor: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// A picker session as returned by the sessions endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerSession {
    pub id: String,
    #[serde(default)]
    pub picker_uri: Option<String>,
    #[serde(default)]
    pub media_items_set: bool,
    #[serde(default)]
    pub polling_config: Option<PollingConfig>,
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
}

/// Server-suggested polling cadence. Durations use the protobuf JSON form
/// (`"5s"`, `"3.5s"`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default)]
    pub poll_interval: Option<String>,
    #[serde(default)]
    pub timeout_in: Option<String>,
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval.as_deref().and_then(parse_proto_duration)
    }

    pub fn timeout_in(&self) -> Option<Duration> {
        self.timeout_in.as_deref().and_then(parse_proto_duration)
    }
}

fn parse_proto_duration(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().strip_suffix('s')?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}
