use thiserror::Error;

/// A listing page could not be retrieved.
///
/// Every variant carries the cursor of the page that failed (`None` for the
/// first page) so the caller knows where the chain broke.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Listing request failed at {}: {source}", describe(.cursor))]
    Http {
        cursor: Option<String>,
        source: reqwest::Error,
    },

    #[error("Listing returned HTTP {status} at {}: {message}", describe(.cursor))]
    HttpStatus {
        cursor: Option<String>,
        status: u16,
        message: String,
    },

    #[error("Malformed listing response at {}: {source}", describe(.cursor))]
    Decode {
        cursor: Option<String>,
        source: serde_json::Error,
    },

    #[error("Listing returned cursor {cursor:?} a second time")]
    CursorLoop { cursor: String },

    #[error("Listing cancelled at {}", describe(.cursor))]
    Cancelled { cursor: Option<String> },
}

fn describe(cursor: &Option<String>) -> String {
    match cursor {
        Some(c) => format!("cursor {:?}", c),
        None => "first page".to_string(),
    }
}

impl FetchError {
    pub fn cursor(&self) -> Option<&str> {
        match self {
            FetchError::Http { cursor, .. }
            | FetchError::HttpStatus { cursor, .. }
            | FetchError::Decode { cursor, .. }
            | FetchError::Cancelled { cursor } => cursor.as_deref(),
            FetchError::CursorLoop { cursor } => Some(cursor),
        }
    }

    /// Whether a fresh request for the same page might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::Http { .. } => true,
            FetchError::Decode { .. } | FetchError::CursorLoop { .. } | FetchError::Cancelled { .. } => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::HttpStatus {
            cursor: Some("c1".into()),
            status: code,
            message: String::new(),
        }
    }

    #[test]
    fn test_status_retry_classification() {
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn test_cursor_is_carried() {
        assert_eq!(status(500).cursor(), Some("c1"));
        let first = FetchError::Cancelled { cursor: None };
        assert_eq!(first.cursor(), None);
        assert!(first.to_string().contains("first page"));
    }

    #[test]
    fn test_cursor_loop_not_retryable() {
        let e = FetchError::CursorLoop { cursor: "x".into() };
        assert!(!e.is_retryable());
        assert_eq!(e.cursor(), Some("x"));
    }
}
