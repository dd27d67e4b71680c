//! Error types for the pagegrep crate

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::report::RenderError;

/// Result type for pagegrep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pagegrep operations
#[derive(Debug, Error)]
pub enum Error {
    /// The scan request was rejected before any network call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The page could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The report document could not be built or written
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration value missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled by the caller
    #[error("Scan cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Validation(format!("keyword cannot be searched: {}", err))
    }
}
