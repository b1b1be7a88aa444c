//! Drives a `MediaSource` across all pages of a listing.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use super::client::MediaSource;
use super::error::FetchError;
use super::types::ItemDescriptor;
use crate::types::Credential;

/// Fetch every page of a session's listing, in order.
///
/// Starts without a cursor and follows `next_cursor` until a page comes back
/// without one; no request is made after the cursorless page. Positions are
/// renumbered across the whole listing. A cursor offered twice in one listing
/// is a `CursorLoop` error.
pub async fn collect_all(
    source: &dyn MediaSource,
    session_id: &str,
    credential: &Credential,
    cancel: &CancellationToken,
) -> Result<Vec<ItemDescriptor>, FetchError> {
    let mut items: Vec<ItemDescriptor> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut followed: HashSet<String> = HashSet::new();
    let mut pages = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled { cursor });
        }

        let page = source
            .fetch_page(session_id, credential, cursor.as_deref(), cancel)
            .await?;
        pages += 1;

        for mut item in page.items {
            item.position = items.len();
            items.push(item);
        }

        match page.next_cursor {
            Some(next) => {
                if !followed.insert(next.clone()) {
                    return Err(FetchError::CursorLoop { cursor: next });
                }
                cursor = Some(next);
            }
            None => break,
        }
    }

    tracing::info!(pages, items = items.len(), session = %session_id, "Listing complete");
    Ok(items)
}
