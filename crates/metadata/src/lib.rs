//! Cache-aware metadata fetching for MyAnimeList entries.
//!
//! Ties the API client and the summary cache together: an entry is only ever
//! requested from the API when the cache has nothing settled for it (or the
//! caller insists), and every answered request is remembered, including
//! error statuses.

mod entry;
pub mod error;
mod fetcher;

pub use crate::entry::{EntryRef, EntryType};
pub use crate::fetcher::{FetchOptions, MetadataFetcher};
