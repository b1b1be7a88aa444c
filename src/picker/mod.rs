//! Photos Picker API access: listing pages of picked media items and
//! managing picker sessions.

pub mod client;
pub mod error;
pub mod listing;
pub mod types;

pub use client::{MediaSource, PickerClient, DEFAULT_API_BASE, MAX_PAGE_SIZE};
pub use error::FetchError;
pub use listing::collect_all;
pub use types::{ItemDescriptor, MediaKind, Page, PickerSession};
