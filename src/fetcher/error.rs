//! Error types for the fetcher module

use thiserror::Error;

/// Error type for page fetches.
///
/// Every transport or HTTP failure ends up here; callers only need to know
/// that the page could not be retrieved and why.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured budget
    #[error("request to {url} timed out after {secs}s")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout budget in seconds
        secs: u64,
    },

    /// The connection could not be established
    #[error("could not connect to {url}: {message}")]
    Connect {
        /// Requested URL
        url: String,
        /// Underlying error message
        message: String,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured identity header is not a valid header value
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl FetchError {
    /// Classify a reqwest error raised while sending a request
    pub(crate) fn from_request(url: &str, secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs,
            }
        } else if err.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Http(err)
        }
    }
}
