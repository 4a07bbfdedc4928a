//! Scripted history source

use async_trait::async_trait;
use feedsync_core::{Page, PageCursor};
use feedsync_transport::{FetchError, FetchResult, HistorySource};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct HistoryState {
    replies: VecDeque<FetchResult<Page>>,
    calls: Vec<PageCursor>,
}

/// History source that answers from a queue of replies
///
/// With a gate installed, every fetch waits for one `notify_one` on the
/// gate before answering, which keeps a request in flight for as long as
/// a test needs. An exhausted queue answers with an HTTP error.
#[derive(Clone, Default)]
pub struct ScriptedHistory {
    state: Arc<Mutex<HistoryState>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedHistory {
    /// No replies queued, no gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Same queue, but every fetch waits on the returned gate
    pub fn gated(&self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let gated = Self {
            state: Arc::clone(&self.state),
            gate: Some(Arc::clone(&gate)),
        };
        (gated, gate)
    }

    /// Queue a successful reply
    pub fn push_page(&self, page: Page) {
        self.state.lock().replies.push_back(Ok(page));
    }

    /// Queue a failure
    pub fn push_error(&self, error: FetchError) {
        self.state.lock().replies.push_back(Err(error));
    }

    /// Cursors requested so far
    pub fn calls(&self) -> Vec<PageCursor> {
        self.state.lock().calls.clone()
    }

    /// Number of requests so far
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Shareable trait object for a controller
    pub fn source(&self) -> Arc<dyn HistorySource> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl HistorySource for ScriptedHistory {
    async fn fetch_page(&self, cursor: PageCursor) -> FetchResult<Page> {
        self.state.lock().calls.push(cursor);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.state
            .lock()
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Http("no scripted reply".to_string())))
    }
}
