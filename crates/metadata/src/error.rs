//! Metadata Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entry types are the API path segments `anime` and `manga`, nothing else.
    #[display("invalid entry type {_0:?}, expected \"anime\" or \"manga\"")]
    InvalidEntryType(#[error(not(source))] String),
    /// The request failed without the API answering with a status (network
    /// exhaustion, undecodable body, authentication). Nothing was cached.
    #[display("request failed")]
    Request,
    #[display("cache error")]
    Cache,
    #[display("could not build request URL")]
    InvalidUrl,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only requests that never got an answer are worth another go; the
    /// executor has already exhausted its own retries by then.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request | Self::Cache)
    }
}
