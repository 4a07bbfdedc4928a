//! Feedsync transport
//!
//! The two I/O edges of a feed: a [`ChannelManager`] that keeps one duplex
//! channel alive with a fixed reconnect delay, and a [`HistorySource`] that
//! pulls paginated history. Both sit behind traits so tests can drive them
//! with scripted fakes.

#![forbid(unsafe_code)]

pub mod channel;
pub mod config;
pub mod error;
pub mod history;
pub mod websocket;

pub use channel::{
    ChannelEvent, ChannelHandle, ChannelManager, CloseReason, Connector, DuplexConnection,
};
pub use config::{channel_url, history_url, ChannelConfig, HistoryConfig, DEFAULT_RECONNECT_DELAY};
pub use error::{FetchError, FetchResult, TransportError, TransportResult};
pub use history::{HistorySource, HttpHistoryFetcher};
pub use websocket::WebSocketConnector;
