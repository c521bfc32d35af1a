//! SQLite cache database for API metadata summaries.
//!
//! This crate provides the durable store that remembers the last known
//! outcome of every API request, keyed by the canonical request URL. It knows
//! nothing about how the summaries were produced or whether a failed request
//! should be retried; that decision belongs to the caller.
//!
//! # Architecture
//! The cache stores a single entity type:
//! - **Summaries**: the decoded response body of one request (or an error
//!   marker carrying the HTTP status code), keyed by URL. There is exactly one
//!   summary per URL; writing a summary for a URL that is already cached
//!   replaces it.

mod db;
pub mod error;
mod models;
mod repo;
mod summary;

pub use crate::db::Database;
pub use crate::repo::Repository;
pub use crate::summary::{Summary, SummaryState};
