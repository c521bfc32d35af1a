//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these is a precondition failure: fix the configuration or the
/// environment, there is no point retrying.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration sources could not be merged or deserialized.
    #[display("could not load configuration")]
    Load,
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// No account was configured (set `MAL_USERNAME`).
    #[display("no username configured; set MAL_USERNAME")]
    MissingUsername,
    /// No application client ID was configured (set `MAL_CLIENT_ID`). Token
    /// refreshes are impossible without one.
    #[display("no client ID configured; set MAL_CLIENT_ID")]
    MissingClientId,
    #[display("invalid URL for {_0}")]
    InvalidUrl(#[error(not(source))] &'static str),
    /// A default path was needed but the platform has no data directory.
    #[display("could not determine a data directory; configure paths explicitly")]
    NoDataDirectory,
    #[display("invalid retry settings: {_0}")]
    InvalidRetry(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
