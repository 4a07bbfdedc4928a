//! Scripted duplex connector
//!
//! Each call to `open` consumes the next scripted step: a refusal or a
//! session whose frames the test pushes through a [`SessionController`].
//! Once the script is exhausted, `open` succeeds with a connection that
//! never delivers anything, so the channel settles in `Connected`.

use async_trait::async_trait;
use feedsync_transport::{Connector, DuplexConnection, TransportError, TransportResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

enum Step {
    Refuse(TransportError),
    Session(mpsc::UnboundedReceiver<SessionFrame>),
}

enum SessionFrame {
    Text(String),
    Fail(TransportError),
    Close,
}

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<Step>,
    attempts: Vec<Instant>,
    urls: Vec<Url>,
    client_closes: usize,
}

/// Test side of one scripted session
#[derive(Debug, Clone)]
pub struct SessionController {
    frames: mpsc::UnboundedSender<SessionFrame>,
}

impl std::fmt::Debug for SessionFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFrame::Text(text) => write!(f, "Text({text})"),
            SessionFrame::Fail(e) => write!(f, "Fail({e})"),
            SessionFrame::Close => f.write_str("Close"),
        }
    }
}

impl SessionController {
    /// Deliver a raw text frame
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.frames.send(SessionFrame::Text(text.into()));
    }

    /// Deliver a JSON frame
    pub fn send_json(&self, value: &serde_json::Value) {
        self.send_text(value.to_string());
    }

    /// End the session with a transport error
    pub fn fail(&self, error: TransportError) {
        let _ = self.frames.send(SessionFrame::Fail(error));
    }

    /// End the session cleanly
    pub fn close(&self) {
        let _ = self.frames.send(SessionFrame::Close);
    }
}

/// Connector that replays a script
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl ScriptedConnector {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Next attempt fails to connect
    pub fn push_refusal(&self, error: TransportError) {
        self.state.lock().script.push_back(Step::Refuse(error));
    }

    /// Next attempt opens a session driven by the returned controller
    pub fn push_session(&self) -> SessionController {
        let (frames, rx) = mpsc::unbounded_channel();
        self.state.lock().script.push_back(Step::Session(rx));
        SessionController { frames }
    }

    /// Queue `count` sessions that close as soon as they open
    pub fn push_closed_sessions(&self, count: usize) {
        for _ in 0..count {
            self.push_session().close();
        }
    }

    /// Number of `open` calls so far
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts.len()
    }

    /// When each `open` call happened
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state.lock().attempts.clone()
    }

    /// URLs passed to `open`
    pub fn urls(&self) -> Vec<Url> {
        self.state.lock().urls.clone()
    }

    /// Number of connections the client closed itself
    pub fn client_closes(&self) -> usize {
        self.state.lock().client_closes
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, url: &Url) -> TransportResult<Box<dyn DuplexConnection>> {
        let step = {
            let mut state = self.state.lock();
            state.attempts.push(Instant::now());
            state.urls.push(url.clone());
            state.script.pop_front()
        };
        match step {
            Some(Step::Refuse(error)) => Err(error),
            Some(Step::Session(frames)) => Ok(Box::new(ScriptedConnection {
                frames: Some(frames),
                state: Arc::clone(&self.state),
            })),
            None => Ok(Box::new(ScriptedConnection {
                frames: None,
                state: Arc::clone(&self.state),
            })),
        }
    }
}

struct ScriptedConnection {
    frames: Option<mpsc::UnboundedReceiver<SessionFrame>>,
    state: Arc<Mutex<ConnectorState>>,
}

#[async_trait]
impl DuplexConnection for ScriptedConnection {
    async fn recv(&mut self) -> Option<TransportResult<String>> {
        let Some(frames) = self.frames.as_mut() else {
            return futures::future::pending().await;
        };
        match frames.recv().await {
            Some(SessionFrame::Text(text)) => Some(Ok(text)),
            Some(SessionFrame::Fail(error)) => Some(Err(error)),
            Some(SessionFrame::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        self.state.lock().client_closes += 1;
    }
}
