//! Client error types

use feedsync_core::FeedError;
use feedsync_transport::{FetchError, TransportError};
use std::path::PathBuf;

/// A view operation could not be applied
///
/// Always local: the adapter logs it and moves on to the next op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The element an op refers to is not rendered
    #[error("Render target not found: {0}")]
    MissingTarget(String),

    /// The sink failed to render
    #[error("Render failed: {0}")]
    Render(String),
}

impl SinkError {
    /// Missing element helper
    pub fn missing(target: impl Into<String>) -> Self {
        Self::MissingTarget(target.into())
    }
}

/// Result alias for sink calls
pub type SinkResult<T> = Result<T, SinkError>;

/// Configuration could not be loaded or is unusable
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values violate a configuration rule
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A URL could not be built
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl ConfigError {
    /// Rule violation helper
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Result alias for configuration handling
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the client API
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Channel setup problem
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// History setup problem
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Feed rule violation
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// No feed with this name is configured
    #[error("Unknown feed: {0}")]
    UnknownFeed(String),

    /// The feed controller has stopped
    #[error("Feed controller is no longer running")]
    Closed,
}

/// Result alias for client calls
pub type ClientResult<T> = Result<T, ClientError>;
