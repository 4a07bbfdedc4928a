//! Feedsync client
//!
//! Ties one feed view together: a [`FeedController`] owns the feed model,
//! consumes the channel's events and history pages, and pushes the merge
//! engine's operations through a [`ViewAdapter`] into a [`ViewSink`].
//!
//! ```ignore
//! let config = ClientConfig::load(Path::new("feeds.toml"))?;
//! let (handle, task) = launch_feed(&config, "general", my_sink)?;
//! handle.load_more()?;
//! handle.teardown()?;
//! let model = task.await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod pagination;
pub mod sink;

pub use config::{ClientConfig, FeedConfig, FeedEndpoints};
pub use controller::{FeedController, FeedHandle, FeedOptions, FeedSnapshot, DEFAULT_NEAR_BOTTOM_PX};
pub use error::{ClientError, ClientResult, ConfigError, ConfigResult, SinkError, SinkResult};
pub use pagination::PaginationTrigger;
pub use sink::{ScrollMetrics, ViewAdapter, ViewSink};

use feedsync_core::FeedModel;
use feedsync_transport::{ChannelManager, HistorySource, HttpHistoryFetcher, WebSocketConnector};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Build the controller for a configured feed over WebSocket and HTTP
///
/// The channel starts connecting immediately; the controller does nothing
/// until it is run. Must be called inside a tokio runtime.
pub fn build_feed<S: ViewSink>(
    config: &ClientConfig,
    name: &str,
    sink: S,
) -> ClientResult<(FeedController<S>, FeedHandle)> {
    let feed = config
        .feed(name)
        .ok_or_else(|| ClientError::UnknownFeed(name.to_string()))?;
    let channel_config = config.channel_config();
    channel_config.validate()?;
    let endpoints = feed.endpoints(&config.base_url()?)?;

    let history = match endpoints.history {
        Some(url) => {
            let fetcher = HttpHistoryFetcher::new(url, &config.history_config())?;
            Some(Arc::new(fetcher) as Arc<dyn HistorySource>)
        }
        None => None,
    };

    info!(feed = name, channel = %endpoints.channel, "Wiring feed");
    let connector = Arc::new(WebSocketConnector::new(channel_config.connect_timeout));
    let channel = ChannelManager::connect(connector, endpoints.channel, channel_config);
    Ok(FeedController::new(feed.options(), sink, channel, history))
}

/// Build a configured feed and spawn its controller
pub fn launch_feed<S: ViewSink + 'static>(
    config: &ClientConfig,
    name: &str,
    sink: S,
) -> ClientResult<(FeedHandle, JoinHandle<FeedModel>)> {
    let (controller, handle) = build_feed(config, name, sink)?;
    Ok((handle, tokio::spawn(controller.run())))
}
