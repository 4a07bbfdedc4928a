//! Recording view sink
//!
//! Records every call and keeps a small simulated viewport: each rendered
//! entry or separator is one fixed-height row, so scroll geometry reacts
//! to prepends and appends the way a real list would.

use feedsync_client::{ScrollMetrics, SinkError, SinkResult, ViewSink};
use feedsync_core::{Entry, EntryId, EntryPatch, FeedViewState, NotificationSection};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    /// `prepend_entries`
    Prepend {
        /// Batch ids, ascending
        ids: Vec<EntryId>,
    },
    /// `insert_entry`
    Insert {
        /// Inserted id
        id: EntryId,
        /// Successor id
        before: EntryId,
    },
    /// `append_entry`
    Append {
        /// Appended id
        id: EntryId,
        /// Stick flag
        stick: bool,
    },
    /// `update_entry`
    Update {
        /// Updated id
        id: EntryId,
        /// Patch applied
        patch: EntryPatch,
    },
    /// `insert_separator`
    Separator {
        /// Entry below the label
        before: EntryId,
        /// Label
        label: String,
    },
    /// `set_channel_indicator`
    Indicator {
        /// Element key
        key: String,
        /// Highlight state
        active: bool,
    },
    /// `set_feed_state`
    FeedState(FeedViewState),
    /// `set_section_state`
    SectionState {
        /// Section changed
        section: NotificationSection,
        /// New state
        state: FeedViewState,
    },
    /// `focus_entry`
    Focus(EntryId),
    /// `set_loading`
    Loading(bool),
    /// `set_load_more_visible`
    LoadMore(bool),
    /// `set_scroll_top`
    ScrollTop(u32),
}

#[derive(Debug)]
struct SinkState {
    calls: Vec<SinkCall>,
    rows: Vec<EntryId>,
    /// Entry each separator sits above
    separators: Vec<EntryId>,
    scroll_top: u32,
    client_height: u32,
    row_height: u32,
}

impl SinkState {
    fn metrics(&self) -> ScrollMetrics {
        let rows = (self.rows.len() + self.separators.len()) as u32;
        ScrollMetrics {
            scroll_top: self.scroll_top,
            scroll_height: rows * self.row_height,
            client_height: self.client_height,
        }
    }

    fn position(&self, id: &EntryId) -> SinkResult<usize> {
        self.rows
            .iter()
            .position(|row| row == id)
            .ok_or_else(|| SinkError::missing(id.to_string()))
    }

    /// Pixel offset of an entry's row, counting separators above it
    fn row_top(&self, id: &EntryId) -> SinkResult<u32> {
        let index = self.position(id)?;
        let labels = self
            .separators
            .iter()
            .filter(|before| self.position(before).is_ok_and(|at| at <= index))
            .count();
        Ok((index + labels) as u32 * self.row_height)
    }
}

/// Sink that records calls; clones share state
#[derive(Debug, Clone)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::with_viewport(400, 20)
    }
}

impl RecordingSink {
    /// 400px viewport with 20px rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom viewport geometry
    pub fn with_viewport(client_height: u32, row_height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                calls: Vec::new(),
                rows: Vec::new(),
                separators: Vec::new(),
                scroll_top: 0,
                client_height,
                row_height,
            })),
        }
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    /// Drain recorded calls
    pub fn take_calls(&self) -> Vec<SinkCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Rendered entry ids, top to bottom
    pub fn rendered_ids(&self) -> Vec<EntryId> {
        self.state.lock().rows.clone()
    }

    /// Current simulated geometry
    pub fn metrics(&self) -> ScrollMetrics {
        self.state.lock().metrics()
    }

    /// Whether an entry's whole row lies inside the viewport
    pub fn is_visible(&self, id: &EntryId) -> bool {
        let state = self.state.lock();
        state.row_top(id).is_ok_and(|top| {
            top >= state.scroll_top && top + state.row_height <= state.scroll_top + state.client_height
        })
    }

    /// Simulate the user scrolling
    pub fn scroll_to(&self, scroll_top: u32) {
        let mut state = self.state.lock();
        let max = state.metrics().bottom_offset();
        state.scroll_top = scroll_top.min(max);
    }

    fn record(&self, call: SinkCall) {
        self.state.lock().calls.push(call);
    }
}

impl ViewSink for RecordingSink {
    fn prepend_entries(&mut self, batch: &[Entry]) -> SinkResult<()> {
        let ids: Vec<EntryId> = batch.iter().map(|e| e.id.clone()).collect();
        {
            let mut state = self.state.lock();
            let below = std::mem::replace(&mut state.rows, ids.clone());
            state.rows.extend(below);
        }
        self.record(SinkCall::Prepend { ids });
        Ok(())
    }

    fn insert_entry(&mut self, entry: &Entry, before: &EntryId) -> SinkResult<()> {
        {
            let mut state = self.state.lock();
            let index = state.position(before)?;
            state.rows.insert(index, entry.id.clone());
        }
        self.record(SinkCall::Insert {
            id: entry.id.clone(),
            before: before.clone(),
        });
        Ok(())
    }

    fn append_entry(&mut self, entry: &Entry, stick_to_bottom: bool) -> SinkResult<()> {
        {
            let mut state = self.state.lock();
            state.rows.push(entry.id.clone());
            if stick_to_bottom {
                state.scroll_top = state.metrics().bottom_offset();
            }
        }
        self.record(SinkCall::Append {
            id: entry.id.clone(),
            stick: stick_to_bottom,
        });
        Ok(())
    }

    fn update_entry(&mut self, id: &EntryId, patch: &EntryPatch) -> SinkResult<()> {
        self.state.lock().position(id)?;
        self.record(SinkCall::Update {
            id: id.clone(),
            patch: patch.clone(),
        });
        Ok(())
    }

    fn insert_separator(&mut self, before: &EntryId, label: &str) -> SinkResult<()> {
        {
            let mut state = self.state.lock();
            state.position(before)?;
            state.separators.push(before.clone());
        }
        self.record(SinkCall::Separator {
            before: before.clone(),
            label: label.to_string(),
        });
        Ok(())
    }

    fn set_channel_indicator(&mut self, element_key: &str, active: bool) -> SinkResult<()> {
        self.record(SinkCall::Indicator {
            key: element_key.to_string(),
            active,
        });
        Ok(())
    }

    fn set_feed_state(&mut self, state: FeedViewState) -> SinkResult<()> {
        self.record(SinkCall::FeedState(state));
        Ok(())
    }

    fn set_section_state(
        &mut self,
        section: NotificationSection,
        state: FeedViewState,
    ) -> SinkResult<()> {
        self.record(SinkCall::SectionState { section, state });
        Ok(())
    }

    fn focus_entry(&mut self, id: &EntryId) -> SinkResult<()> {
        {
            let mut state = self.state.lock();
            let top = state.row_top(id)?;
            let bottom = top + state.row_height;
            if top < state.scroll_top {
                state.scroll_top = top;
            } else if bottom > state.scroll_top + state.client_height {
                state.scroll_top = bottom.saturating_sub(state.client_height);
            }
        }
        self.record(SinkCall::Focus(id.clone()));
        Ok(())
    }

    fn set_loading(&mut self, loading: bool) -> SinkResult<()> {
        self.record(SinkCall::Loading(loading));
        Ok(())
    }

    fn set_load_more_visible(&mut self, visible: bool) -> SinkResult<()> {
        self.record(SinkCall::LoadMore(visible));
        Ok(())
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.metrics()
    }

    fn set_scroll_top(&mut self, scroll_top: u32) {
        let mut state = self.state.lock();
        state.scroll_top = scroll_top.min(state.metrics().bottom_offset());
        state.calls.push(SinkCall::ScrollTop(scroll_top));
    }
}
