//! Bulk download of media picked in a Google Photos Picker session.
//!
//! A sync pass pages through the session's picked items, then downloads each
//! one not already recorded as done in a persistent SQLite ledger. Reserving
//! an item before its transfer and committing it only after the file is in
//! place gives at-most-once completion per item and lets an interrupted pass
//! resume where it left off.

#![warn(clippy::all)]

pub mod download;
pub mod ledger;
pub mod maintenance;
pub mod picker;
pub mod retry;
pub mod shutdown;
pub mod sync;
pub mod types;

#[cfg(test)]
mod test_support;
