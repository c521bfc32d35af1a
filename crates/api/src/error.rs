//! API Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An API error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never completed: connection refused or reset, DNS failure,
    /// timeout. No HTTP status is available.
    #[display("network error")]
    Network,
    /// The server answered with an error status. This is the terminal outcome
    /// of a request once the retry policy has given up (or, for 404, right
    /// away).
    #[display("HTTP {status}")]
    Status { status: u16, body: String },
    /// The server answered successfully, but the body was not a JSON object.
    #[display("response body is not a JSON object")]
    Decode,
    /// The access token could not be loaded, refreshed or saved.
    #[display("authentication failure")]
    Auth,
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Besides connection-level failures, this covers the two statuses the
    /// executor hands back to the outer retry layer after recovering from
    /// them: 401 (token refreshed) and 429 (cooldown slept).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network => true,
            Self::Status { status, .. } => matches!(status, 401 | 429),
            _ => false,
        }
    }

    /// The HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
