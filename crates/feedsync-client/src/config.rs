//! Client configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [server]
//! base_url = "https://chat.example.org"
//!
//! [channel]
//! reconnect_delay_ms = 2000
//! connect_timeout_ms = 10000
//!
//! [history]
//! request_timeout_ms = 15000
//!
//! [[feeds]]
//! name = "general"
//! kind = "chat"
//! chat_id = "42"
//! history_path = "/chat/42/messages/"
//! stick = "near-bottom"
//! ```
//!
//! `FEEDSYNC_BASE_URL` overrides `server.base_url` when set.

use crate::controller::{FeedOptions, DEFAULT_NEAR_BOTTOM_PX};
use crate::error::{ConfigError, ConfigResult};
use feedsync_core::{FeedKind, StickPolicy};
use feedsync_transport::{channel_url, history_url, ChannelConfig, HistoryConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable that overrides the server base URL
pub const BASE_URL_ENV: &str = "FEEDSYNC_BASE_URL";

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend location
    pub server: ServerSection,
    /// Channel settings shared by all feeds
    #[serde(default)]
    pub channel: ChannelSection,
    /// History settings shared by all feeds
    #[serde(default)]
    pub history: HistorySection,
    /// Configured feeds
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    /// `http` or `https` base URL of the backend
    pub base_url: String,
}

/// `[channel]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Fixed reconnect delay
    pub reconnect_delay_ms: u64,
    /// Handshake timeout
    pub connect_timeout_ms: u64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        let defaults = ChannelConfig::default();
        Self {
            reconnect_delay_ms: defaults.reconnect_delay.as_millis() as u64,
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
        }
    }
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Per-request timeout
    pub request_timeout_ms: u64,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            request_timeout_ms: HistoryConfig::default().request_timeout.as_millis() as u64,
        }
    }
}

/// One `[[feeds]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Unique feed name
    pub name: String,
    /// Feed kind
    pub kind: FeedKind,
    /// Chat id, required for chat feeds
    #[serde(default)]
    pub chat_id: Option<String>,
    /// History path under the base URL; feeds without one never paginate
    #[serde(default)]
    pub history_path: Option<String>,
    /// Stick policy; defaults per kind
    #[serde(default)]
    pub stick: Option<StickPolicy>,
    /// Bottom distance treated as "at the bottom"
    #[serde(default = "default_near_bottom_px")]
    pub near_bottom_px: u32,
    /// Top distance that triggers the next page
    #[serde(default)]
    pub top_threshold_px: u32,
}

fn default_near_bottom_px() -> u32 {
    DEFAULT_NEAR_BOTTOM_PX
}

/// Resolved endpoints of one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// Duplex channel URL
    pub channel: Url,
    /// History URL, if the feed paginates
    pub history: Option<Url>,
}

impl FeedConfig {
    /// Controller options for this feed
    pub fn options(&self) -> FeedOptions {
        FeedOptions {
            kind: self.kind,
            stick: self.stick.unwrap_or_else(|| StickPolicy::for_kind(self.kind)),
            near_bottom_px: self.near_bottom_px,
            top_threshold_px: self.top_threshold_px,
        }
    }

    /// Channel and history URLs under `base`
    pub fn endpoints(&self, base: &Url) -> ConfigResult<FeedEndpoints> {
        let path = self
            .kind
            .channel_path(self.chat_id.as_deref())
            .map_err(|e| ConfigError::invalid(format!("feed {}: {e}", self.name)))?;
        let channel = channel_url(base, &path).map_err(|e| ConfigError::Url(e.to_string()))?;
        let history = self
            .history_path
            .as_deref()
            .map(|path| history_url(base, path))
            .transpose()
            .map_err(|e| ConfigError::Url(e.to_string()))?;
        Ok(FeedEndpoints { channel, history })
    }
}

impl ClientConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read, parse, apply environment overrides and validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.merge_with_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `FEEDSYNC_BASE_URL`
    pub fn merge_with_env(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                self.server.base_url = base_url;
            }
        }
    }

    /// Check every rule the feeds depend on
    pub fn validate(&self) -> ConfigResult<()> {
        let base = self.base_url()?;
        self.channel_config()
            .validate()
            .map_err(|e| ConfigError::invalid(e.to_string()))?;
        self.history_config()
            .validate()
            .map_err(|e| ConfigError::invalid(e.to_string()))?;

        let mut names = HashSet::new();
        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                return Err(ConfigError::invalid("feed names must not be empty"));
            }
            if !names.insert(feed.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate feed name {}",
                    feed.name
                )));
            }
            feed.endpoints(&base)?;
        }
        Ok(())
    }

    /// Parsed base URL; must be `http` or `https`
    pub fn base_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.server.base_url)
            .map_err(|e| ConfigError::Url(format!("{}: {e}", self.server.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Url(format!(
                "base URL must be http or https, got {other}"
            ))),
        }
    }

    /// Feed by name
    pub fn feed(&self, name: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|feed| feed.name == name)
    }

    /// Runtime channel settings
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            reconnect_delay: Duration::from_millis(self.channel.reconnect_delay_ms),
            connect_timeout: Duration::from_millis(self.channel.connect_timeout_ms),
        }
    }

    /// Runtime history settings
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            request_timeout: Duration::from_millis(self.history.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"
        [server]
        base_url = "https://chat.example.org"

        [[feeds]]
        name = "general"
        kind = "chat"
        chat_id = "42"
        history_path = "/chat/42/messages/"

        [[feeds]]
        name = "navbar"
        kind = "navbar"
        stick = "never"
    "#;

    #[test]
    fn test_sample_parses_with_defaults() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.channel_config().reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.history.request_timeout_ms, 15_000);

        let chat = config.feed("general").unwrap();
        let options = chat.options();
        assert_eq!(options.stick, StickPolicy::NearBottom);
        assert_eq!(options.near_bottom_px, 48);

        let endpoints = chat.endpoints(&config.base_url().unwrap()).unwrap();
        assert_eq!(endpoints.channel.as_str(), "wss://chat.example.org/ws/chat/42/");
        assert_eq!(
            endpoints.history.unwrap().as_str(),
            "https://chat.example.org/chat/42/messages/"
        );

        let navbar = config.feed("navbar").unwrap();
        assert_eq!(navbar.endpoints(&config.base_url().unwrap()).unwrap().history, None);
    }

    #[test]
    fn test_chat_feed_without_id_is_rejected() {
        let text = r#"
            [server]
            base_url = "http://localhost:8000"
            [[feeds]]
            name = "broken"
            kind = "chat"
        "#;
        let config = ClientConfig::from_toml_str(text).unwrap();
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_names_and_zero_delay_are_rejected() {
        let text = r#"
            [server]
            base_url = "http://localhost:8000"
            [[feeds]]
            name = "n"
            kind = "navbar"
            [[feeds]]
            name = "n"
            kind = "chat-list"
        "#;
        let config = ClientConfig::from_toml_str(text).unwrap();
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));

        let mut config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        config.channel.reconnect_delay_ms = 0;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_base_url_must_be_http() {
        let text = r#"
            [server]
            base_url = "ws://localhost:8000"
        "#;
        let config = ClientConfig::from_toml_str(text).unwrap();
        assert_matches!(config.validate(), Err(ConfigError::Url(_)));
    }

    #[test]
    fn test_malformed_toml() {
        assert_matches!(
            ClientConfig::from_toml_str("[server"),
            Err(ConfigError::Parse(_))
        );
    }

    #[test]
    fn test_load_reports_missing_file() {
        let path = std::env::temp_dir().join("feedsync-missing-config.toml");
        assert_matches!(ClientConfig::load(&path), Err(ConfigError::Io { .. }));
    }
}
