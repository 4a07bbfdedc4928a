//! Feed controller
//!
//! One controller per mounted feed view. It owns the [`FeedModel`], the
//! feed's channel and its history source, and runs a single task that
//! selects over three inputs: handle commands, channel events and the one
//! in-flight history page. Merges run synchronously between those
//! suspension points, so no locking is involved.

use crate::error::{ClientError, ClientResult};
use crate::pagination::PaginationTrigger;
use crate::sink::{ViewAdapter, ViewSink};
use feedsync_core::{
    decode_frame, ChannelState, EntryId, FeedKind, FeedModel, FeedViewState, LoadPhase,
    MergeEngine, Page, PageCursor, StickPolicy, Viewport,
};
use feedsync_transport::{ChannelEvent, ChannelHandle, FetchResult, HistorySource};
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default distance from the bottom that still counts as "at the bottom"
pub const DEFAULT_NEAR_BOTTOM_PX: u32 = 48;

/// Per-feed behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    /// Which feed this is
    pub kind: FeedKind,
    /// When live appends follow the bottom
    pub stick: StickPolicy,
    /// Bottom distance treated as "at the bottom"
    pub near_bottom_px: u32,
    /// Top distance that triggers the next page
    pub top_threshold_px: u32,
}

impl FeedOptions {
    /// Defaults for a feed kind
    pub fn for_kind(kind: FeedKind) -> Self {
        Self {
            kind,
            stick: StickPolicy::for_kind(kind),
            near_bottom_px: DEFAULT_NEAR_BOTTOM_PX,
            top_threshold_px: 0,
        }
    }
}

/// Point-in-time view of a feed's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Entry ids in feed order
    pub ids: Vec<EntryId>,
    /// Cursor of the next older page
    pub cursor: PageCursor,
    /// Whether an older page exists
    pub has_more: bool,
    /// Whether a history request is outstanding
    pub in_flight: bool,
    /// Channel state
    pub channel_state: ChannelState,
    /// History load phase
    pub phase: LoadPhase,
    /// Last feed state sent to the view
    pub view_state: Option<FeedViewState>,
}

impl FeedSnapshot {
    fn of(model: &FeedModel) -> Self {
        Self {
            ids: model.entries().iter().map(|e| e.id.clone()).collect(),
            cursor: model.cursor(),
            has_more: model.has_more(),
            in_flight: model.in_flight(),
            channel_state: model.channel_state(),
            phase: model.phase(),
            view_state: model.view_state(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the feed holds no entries
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug)]
enum Command {
    View(ViewRequest),
    Teardown,
}

/// Commands handled while the feed stays mounted
#[derive(Debug)]
enum ViewRequest {
    LoadMore,
    Scrolled,
    Snapshot(oneshot::Sender<FeedSnapshot>),
}

/// Cloneable handle used by the view to drive its controller
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl FeedHandle {
    /// The load-more control was activated
    pub fn load_more(&self) -> ClientResult<()> {
        self.send(Command::View(ViewRequest::LoadMore))
    }

    /// The view scrolled; the controller reads metrics from the sink
    pub fn scrolled(&self) -> ClientResult<()> {
        self.send(Command::View(ViewRequest::Scrolled))
    }

    /// Current feed state
    pub async fn snapshot(&self) -> ClientResult<FeedSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::View(ViewRequest::Snapshot(tx)))?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Unmount: stop the channel and abandon any in-flight request
    pub fn teardown(&self) -> ClientResult<()> {
        self.send(Command::Teardown)
    }

    /// Whether the controller is still running
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) -> ClientResult<()> {
        self.commands.send(command).map_err(|_| ClientError::Closed)
    }
}

type PageFuture = BoxFuture<'static, FetchResult<Page>>;

/// Drives one feed view
pub struct FeedController<S> {
    options: FeedOptions,
    engine: MergeEngine,
    trigger: PaginationTrigger,
    model: FeedModel,
    view: ViewAdapter<S>,
    channel: ChannelHandle,
    history: Option<Arc<dyn HistorySource>>,
    commands: mpsc::UnboundedReceiver<Command>,
    pending: Option<PageFuture>,
}

impl<S: ViewSink> FeedController<S> {
    /// Assemble a controller; nothing runs until [`FeedController::run`]
    pub fn new(
        options: FeedOptions,
        sink: S,
        channel: ChannelHandle,
        history: Option<Arc<dyn HistorySource>>,
    ) -> (Self, FeedHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let controller = Self {
            engine: MergeEngine::new(options.stick),
            trigger: PaginationTrigger::new(options.top_threshold_px),
            options,
            model: FeedModel::new(),
            view: ViewAdapter::new(sink),
            channel,
            history,
            commands,
            pending: None,
        };
        (controller, FeedHandle { commands: tx })
    }

    /// Run until teardown (or until every handle is dropped) and return
    /// the final model
    pub async fn run(mut self) -> FeedModel {
        info!(
            kind = %self.options.kind,
            endpoint = %self.channel.endpoint(),
            "Feed mounted"
        );
        self.model.set_channel_state(ChannelState::Connecting);
        if self.history.is_some() {
            self.request_page();
        } else {
            self.model.mark_loaded_without_history();
        }

        let mut channel_open = true;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::View(request)) => self.handle_request(request),
                    Some(Command::Teardown) | None => break,
                },
                event = self.channel.next_event(), if channel_open => match event {
                    Some(event) => self.handle_channel_event(event),
                    None => {
                        warn!(endpoint = %self.channel.endpoint(), "Channel event stream ended");
                        channel_open = false;
                    }
                },
                result = next_page(&mut self.pending) => {
                    self.pending = None;
                    self.handle_page(result);
                }
            }
        }

        self.teardown().await;
        self.model
    }

    fn handle_request(&mut self, request: ViewRequest) {
        match request {
            ViewRequest::LoadMore => self.request_page(),
            ViewRequest::Scrolled => {
                let metrics = self.view.metrics();
                if self.trigger.should_fetch(&self.model, metrics) {
                    self.request_page();
                }
            }
            ViewRequest::Snapshot(reply) => {
                let _ = reply.send(FeedSnapshot::of(&self.model));
            }
        }
    }

    fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connecting { attempt } => {
                debug!(attempt, "Channel connecting");
                self.model.set_channel_state(ChannelState::Connecting);
            }
            ChannelEvent::Opened => self.model.set_channel_state(ChannelState::Connected),
            ChannelEvent::Closed { reason } => {
                debug!(reason = %reason, "Channel closed");
                self.model.set_channel_state(ChannelState::Disconnected);
            }
            ChannelEvent::Message(text) => self.handle_frame(&text),
        }
    }

    fn handle_frame(&mut self, text: &str) {
        let event = match decode_frame(self.options.kind, text) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(kind = %self.options.kind, "Ignoring unhandled frame type");
                return;
            }
            Err(e) => {
                warn!(kind = %self.options.kind, error = %e, "Dropping malformed frame");
                return;
            }
        };

        let metrics = self.view.metrics();
        let viewport = Viewport {
            near_bottom: metrics.distance_from_bottom() <= self.options.near_bottom_px,
        };
        let kind = event.kind();
        let outcome = self.engine.merge_event(&mut self.model, event, viewport);
        debug!(event = %kind, ops = outcome.ops.len(), "Live event merged");
        self.view.apply(&outcome);
        if !outcome.placed_ids().is_empty() {
            self.refresh_load_more();
        }
    }

    fn request_page(&mut self) {
        let Some(history) = self.history.clone() else {
            return;
        };
        let Some(cursor) = self.model.begin_fetch() else {
            debug!(
                in_flight = self.model.in_flight(),
                has_more = self.model.has_more(),
                "History request skipped"
            );
            return;
        };

        info!(page = cursor.page(), "Requesting history page");
        self.view.set_loading(true);
        self.pending = Some(async move { history.fetch_page(cursor).await }.boxed());
    }

    fn handle_page(&mut self, result: FetchResult<Page>) {
        match result {
            Ok(page) => {
                let outcome = self.engine.merge_page(&mut self.model, page);
                self.view.apply(&outcome);
                info!(
                    entries = self.model.len(),
                    cursor = self.model.cursor().page(),
                    has_more = self.model.has_more(),
                    "History page merged"
                );
            }
            Err(e) => {
                warn!(page = self.model.cursor().page(), error = %e, "History request failed");
                self.model.fail_fetch();
                self.view.set_loading(false);
            }
        }
        self.refresh_load_more();
    }

    fn refresh_load_more(&mut self) {
        let visible = self
            .trigger
            .load_more_visible(&self.model, self.view.metrics());
        self.view.set_load_more_visible(visible);
    }

    async fn teardown(&mut self) {
        self.channel.shutdown().await;
        self.model.set_channel_state(ChannelState::Disconnected);
        if self.pending.take().is_some() {
            debug!("Abandoning in-flight history request");
            self.model.fail_fetch();
        }
        info!(kind = %self.options.kind, entries = self.model.len(), "Feed unmounted");
    }
}

async fn next_page(pending: &mut Option<PageFuture>) -> FetchResult<Page> {
    match pending {
        Some(fetch) => fetch.await,
        None => future::pending().await,
    }
}
