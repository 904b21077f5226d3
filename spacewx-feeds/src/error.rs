//! Error types for feed fetching and parsing.

use thiserror::Error;

/// Errors that can occur when fetching or parsing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed answered with a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The payload did not have the expected table shape.
    #[error("Failed to parse feed: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl FeedError {
    /// Whether this error came from the transport rather than the payload.
    pub fn is_transport(&self) -> bool {
        !matches!(self, FeedError::Parse(_))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

#[cfg(feature = "noaa")]
impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else if err.is_connect() {
            FeedError::Connection(err.to_string())
        } else if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else {
            FeedError::Http(err.to_string())
        }
    }
}
