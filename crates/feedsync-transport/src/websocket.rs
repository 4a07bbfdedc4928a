//! WebSocket connector
//!
//! [`Connector`] implementation over `tokio-tungstenite`. Text frames pass
//! through; binary frames pass through when they are valid UTF-8.
//! Ping/pong and raw frames are handled by tungstenite and skipped here.

use crate::channel::{Connector, DuplexConnection};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

/// Opens WebSocket connections with a handshake timeout
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Connector with the given handshake timeout
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &Url) -> TransportResult<Box<dyn DuplexConnection>> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidEndpoint(format!(
                "not a websocket url: {url}"
            )));
        }

        let (stream, response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout("WebSocket connect timeout".to_string()))?
            .map_err(|e| TransportError::ConnectionFailed(format!("WebSocket connect failed: {e}")))?;

        debug!(endpoint = %url, status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl DuplexConnection for WebSocketConnection {
    async fn recv(&mut self) -> Option<TransportResult<String>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        return Some(Err(TransportError::Protocol(
                            "binary frame is not UTF-8".to_string(),
                        )))
                    }
                },
                Message::Close(frame) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("Skipping control frame");
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}
