//! Transport error types

use feedsync_core::FeedError;
use serde::{Deserialize, Serialize};

/// Duplex channel errors
///
/// All of these are recovered by the reconnect loop; they only ever reach
/// callers as a close reason or a diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TransportError {
    /// Endpoint URL cannot be used for a channel
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection could not be established or was lost
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation did not finish in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Peer violated the framing protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Channel or history settings are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for channel operations
pub type TransportResult<T> = Result<T, TransportError>;

/// History fetch errors
///
/// Never retried automatically; the caller clears its in-flight flag and
/// waits for the next user-triggered load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("History endpoint {url} returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// Body is not a valid history page
    #[error("Malformed history page: {0}")]
    Decode(String),

    /// History URL cannot be built
    #[error("Invalid history URL: {0}")]
    InvalidUrl(String),
}

/// Result alias for history fetches
pub type FetchResult<T> = Result<T, FetchError>;

impl From<FeedError> for FetchError {
    fn from(err: FeedError) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidEndpoint(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::Protocol(e) => TransportError::Protocol(e.to_string()),
            Error::Url(e) => TransportError::InvalidEndpoint(e.to_string()),
            other => TransportError::ConnectionFailed(other.to_string()),
        }
    }
}
