//! Channel and history settings, plus endpoint resolution

use crate::error::{FetchError, FetchResult, TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Reconnect delay used when nothing else is configured
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Duplex channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Fixed delay between a close and the next connection attempt
    pub reconnect_delay: Duration,
    /// Upper bound for the opening handshake
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ChannelConfig {
    /// Reject settings that would spin or never connect
    pub fn validate(&self) -> TransportResult<()> {
        if self.reconnect_delay.is_zero() {
            return Err(TransportError::InvalidConfig(
                "reconnect delay must be positive".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "connect timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// History endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Upper bound for one page request
    pub request_timeout: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl HistoryConfig {
    /// Reject a zero timeout
    pub fn validate(&self) -> TransportResult<()> {
        if self.request_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "history request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Channel URL for a path under an `http(s)` base (`http` becomes `ws`,
/// `https` becomes `wss`)
pub fn channel_url(base: &Url, path: &str) -> TransportResult<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {other}"
            )))
        }
    };
    let mut url = base.join(path)?;
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;
    Ok(url)
}

/// History URL for a path under an `http(s)` base
pub fn history_url(base: &Url, path: &str) -> FetchResult<Url> {
    match base.scheme() {
        "http" | "https" => base
            .join(path)
            .map_err(|e| FetchError::InvalidUrl(e.to_string())),
        other => Err(FetchError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
}
