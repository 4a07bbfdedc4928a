//! Channel manager
//!
//! Owns one duplex channel to one endpoint and keeps it alive. The state
//! machine is `Disconnected -> Connecting -> Connected -> Disconnected ->
//! Connecting -> ...`: every close (clean, errored, or a failed connect)
//! schedules exactly one new attempt after a fixed delay. There is no
//! backoff growth and no attempt limit. [`ChannelHandle::shutdown`], or
//! dropping the handle, cancels a pending reconnect timer and closes the
//! open connection.
//!
//! Upward, the manager exposes only `Connecting`, `Opened`, `Message` and
//! `Closed` events; the socket itself never leaves the driver task.

use crate::config::ChannelConfig;
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use feedsync_core::ChannelState;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// An open duplex connection, receive side only
#[async_trait]
pub trait DuplexConnection: Send {
    /// Next text frame; `None` once the peer closed the connection
    async fn recv(&mut self) -> Option<TransportResult<String>>;

    /// Close the connection, ignoring failures
    async fn close(&mut self);
}

/// Opens duplex connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`
    async fn open(&self, url: &Url) -> TransportResult<Box<dyn DuplexConnection>>;
}

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection
    Clean,
    /// The connection failed while open
    Error(TransportError),
    /// The connection could not be opened
    Refused(TransportError),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Clean => f.write_str("closed by peer"),
            CloseReason::Error(e) => write!(f, "connection lost: {e}"),
            CloseReason::Refused(e) => write!(f, "connect failed: {e}"),
        }
    }
}

/// Inbound channel event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection attempt started (1-based count across the channel's life)
    Connecting {
        /// Attempt number
        attempt: u64,
    },
    /// The connection is open
    Opened,
    /// One text frame, in delivery order
    Message(String),
    /// The connection ended; a reconnect is scheduled
    Closed {
        /// Why it ended
        reason: CloseReason,
    },
}

/// Handle to a running channel
///
/// Dropping the handle shuts the channel down.
#[derive(Debug)]
pub struct ChannelHandle {
    endpoint: Url,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    state: watch::Receiver<ChannelState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Endpoint this channel connects to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Current connection state
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Watch connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Next inbound event; `None` after shutdown
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Whether shutdown has been requested
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_none()
    }

    /// Stop reconnecting, close the connection and wait for the driver to exit
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(endpoint = %self.endpoint, error = %e, "Channel driver ended abnormally");
            }
        }
        self.events.close();
        info!(endpoint = %self.endpoint, "Channel shut down");
    }
}

/// Starts channels
pub struct ChannelManager;

impl ChannelManager {
    /// Open a channel to `endpoint`; returns immediately
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(
        connector: Arc<dyn Connector>,
        endpoint: Url,
        config: ChannelConfig,
    ) -> ChannelHandle {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ChannelState::Disconnected);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let driver = Driver {
            connector,
            endpoint: endpoint.clone(),
            config,
            events: event_tx,
            state: state_tx,
        };
        let task = tokio::spawn(driver.run(shutdown_rx));

        ChannelHandle {
            endpoint,
            events,
            state,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }
}

struct Driver {
    connector: Arc<dyn Connector>,
    endpoint: Url,
    config: ChannelConfig,
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: watch::Sender<ChannelState>,
}

enum Session {
    Ended(CloseReason),
    Stopped,
}

impl Driver {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.state.send_replace(ChannelState::Connecting);
            if self.events.send(ChannelEvent::Connecting { attempt }).is_err() {
                break;
            }
            info!(endpoint = %self.endpoint, attempt, "Opening channel");

            let opened = tokio::select! {
                _ = &mut shutdown => break,
                opened = self.connector.open(&self.endpoint) => opened,
            };

            let reason = match opened {
                Ok(connection) => match self.session(connection, &mut shutdown).await {
                    Session::Ended(reason) => reason,
                    Session::Stopped => break,
                },
                Err(e) => CloseReason::Refused(e),
            };

            self.state.send_replace(ChannelState::Disconnected);
            warn!(
                endpoint = %self.endpoint,
                attempt,
                reason = %reason,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Channel closed, reconnect scheduled"
            );
            if self.events.send(ChannelEvent::Closed { reason }).is_err() {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        self.state.send_replace(ChannelState::Disconnected);
        debug!(endpoint = %self.endpoint, "Channel driver stopped");
    }

    async fn session(
        &self,
        mut connection: Box<dyn DuplexConnection>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Session {
        self.state.send_replace(ChannelState::Connected);
        info!(endpoint = %self.endpoint, "Channel open");
        if self.events.send(ChannelEvent::Opened).is_err() {
            connection.close().await;
            return Session::Stopped;
        }

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    connection.close().await;
                    return Session::Stopped;
                }
                frame = connection.recv() => match frame {
                    Some(Ok(text)) => {
                        if self.events.send(ChannelEvent::Message(text)).is_err() {
                            connection.close().await;
                            return Session::Stopped;
                        }
                    }
                    Some(Err(e)) => return Session::Ended(CloseReason::Error(e)),
                    None => return Session::Ended(CloseReason::Clean),
                },
            }
        }
    }
}
