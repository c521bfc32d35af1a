//! Application Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not load access token")]
    Auth,
    #[display("could not open cache database")]
    Cache,
    #[display("could not read {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("could not fetch metadata")]
    Fetch,
    #[display("{_0} entries failed")]
    Failures(#[error(not(source))] usize),
}
