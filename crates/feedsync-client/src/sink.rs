//! View sink interface and the adapter that drives it
//!
//! The merge engine describes render mutations; a [`ViewSink`] performs
//! them. [`ViewAdapter`] sits between the two: it applies each op, logs
//! and skips ops the sink cannot perform, turns the outcome's
//! [`ScrollDirective`] into a concrete scroll offset and finally hands the
//! sink any focus request.

use crate::error::SinkResult;
use feedsync_core::{
    Entry, EntryId, EntryPatch, FeedViewState, MergeOutcome, NotificationSection,
    ScrollDirective, ViewOp,
};
use tracing::warn;

/// Scroll geometry of the rendered feed, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    /// Offset of the viewport from the top of the content
    pub scroll_top: u32,
    /// Total content height
    pub scroll_height: u32,
    /// Viewport height
    pub client_height: u32,
}

impl ScrollMetrics {
    /// Offset that shows the bottom of the content
    pub fn bottom_offset(&self) -> u32 {
        self.scroll_height.saturating_sub(self.client_height)
    }

    /// Pixels between the bottom of the viewport and the end of the content
    pub fn distance_from_bottom(&self) -> u32 {
        self.bottom_offset().saturating_sub(self.scroll_top)
    }

    /// Whether the content is taller than the viewport
    pub fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Render target of one feed view
///
/// Implementations own all render state. Methods that reference an entry
/// or element that is not rendered should return
/// [`SinkError::MissingTarget`](crate::error::SinkError::MissingTarget)
/// rather than panic.
pub trait ViewSink: Send {
    /// Insert a batch above everything rendered (ascending order)
    fn prepend_entries(&mut self, batch: &[Entry]) -> SinkResult<()>;

    /// Insert an entry directly before a rendered one
    fn insert_entry(&mut self, entry: &Entry, before: &EntryId) -> SinkResult<()>;

    /// Append an entry; scroll to it when `stick_to_bottom` is set
    fn append_entry(&mut self, entry: &Entry, stick_to_bottom: bool) -> SinkResult<()>;

    /// Change display fields of a rendered entry
    fn update_entry(&mut self, id: &EntryId, patch: &EntryPatch) -> SinkResult<()>;

    /// Insert a group label directly above a rendered entry
    fn insert_separator(&mut self, before: &EntryId, label: &str) -> SinkResult<()>;

    /// Highlight or clear the indicator rendered under `element_key`
    fn set_channel_indicator(&mut self, element_key: &str, active: bool) -> SinkResult<()>;

    /// Switch between empty-feed and populated rendering
    fn set_feed_state(&mut self, state: FeedViewState) -> SinkResult<()>;

    /// Switch one notification section between placeholder and entries
    fn set_section_state(
        &mut self,
        section: NotificationSection,
        state: FeedViewState,
    ) -> SinkResult<()>;

    /// Scroll a rendered entry into view
    fn focus_entry(&mut self, id: &EntryId) -> SinkResult<()>;

    /// Show or hide the loading indicator
    fn set_loading(&mut self, loading: bool) -> SinkResult<()>;

    /// Show or hide the trailing "load more" control
    fn set_load_more_visible(&mut self, visible: bool) -> SinkResult<()>;

    /// Current scroll geometry
    fn scroll_metrics(&self) -> ScrollMetrics;

    /// Move the viewport
    fn set_scroll_top(&mut self, scroll_top: u32);
}

/// Applies merge outcomes to a sink
#[derive(Debug)]
pub struct ViewAdapter<S> {
    sink: S,
    load_more_visible: Option<bool>,
}

impl<S: ViewSink> ViewAdapter<S> {
    /// Wrap a sink
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            load_more_visible: None,
        }
    }

    /// The wrapped sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Unwrap the sink
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Current scroll geometry
    pub fn metrics(&self) -> ScrollMetrics {
        self.sink.scroll_metrics()
    }

    /// Apply every op, then the scroll directive, then the focus request
    ///
    /// Returns the number of ops that failed and were skipped.
    pub fn apply(&mut self, outcome: &MergeOutcome) -> usize {
        let before = self.sink.scroll_metrics();
        let mut anchored = before;
        let mut skipped = 0;
        for (index, op) in outcome.ops.iter().enumerate() {
            if let Err(e) = self.apply_op(op) {
                warn!(op = op_name(op), error = %e, "Skipping view op");
                skipped += 1;
            }
            if index + 1 == outcome.above_anchor {
                anchored = self.sink.scroll_metrics();
            }
        }

        match outcome.scroll {
            ScrollDirective::Keep => {}
            ScrollDirective::PreserveAnchor => {
                let delta = anchored.scroll_height.saturating_sub(before.scroll_height);
                let after = self.sink.scroll_metrics();
                self.sink.set_scroll_top(after.scroll_top.saturating_add(delta));
            }
            ScrollDirective::ToBottom => {
                let after = self.sink.scroll_metrics();
                self.sink.set_scroll_top(after.bottom_offset());
            }
        }

        if let Some(id) = outcome.focus() {
            if let Err(e) = self.sink.focus_entry(id) {
                warn!(id = %id, error = %e, "Skipping focus request");
                skipped += 1;
            }
        }
        skipped
    }

    /// Show or hide the loading indicator outside a merge
    pub fn set_loading(&mut self, loading: bool) {
        if let Err(e) = self.sink.set_loading(loading) {
            warn!(error = %e, "Failed to toggle loading indicator");
        }
    }

    /// Show or hide the load-more control; only calls the sink on change
    pub fn set_load_more_visible(&mut self, visible: bool) {
        if self.load_more_visible == Some(visible) {
            return;
        }
        match self.sink.set_load_more_visible(visible) {
            Ok(()) => self.load_more_visible = Some(visible),
            Err(e) => warn!(error = %e, "Failed to toggle load-more control"),
        }
    }

    fn apply_op(&mut self, op: &ViewOp) -> SinkResult<()> {
        match op {
            ViewOp::PrependEntries { entries, .. } => self.sink.prepend_entries(entries),
            ViewOp::InsertEntry { entry, before } => self.sink.insert_entry(entry, before),
            ViewOp::AppendEntry {
                entry,
                stick_to_bottom,
            } => self.sink.append_entry(entry, *stick_to_bottom),
            ViewOp::UpdateEntry { id, patch } => self.sink.update_entry(id, patch),
            ViewOp::InsertSeparator { before, label } => self.sink.insert_separator(before, label),
            ViewOp::SetIndicator { key, active } => {
                self.sink.set_channel_indicator(key.element_key(), *active)
            }
            ViewOp::SetFeedState(state) => self.sink.set_feed_state(*state),
            ViewOp::SetSectionState { section, state } => {
                self.sink.set_section_state(*section, *state)
            }
            ViewOp::SetLoading(loading) => self.sink.set_loading(*loading),
        }
    }
}

fn op_name(op: &ViewOp) -> &'static str {
    match op {
        ViewOp::PrependEntries { .. } => "prepend_entries",
        ViewOp::InsertEntry { .. } => "insert_entry",
        ViewOp::AppendEntry { .. } => "append_entry",
        ViewOp::UpdateEntry { .. } => "update_entry",
        ViewOp::InsertSeparator { .. } => "insert_separator",
        ViewOp::SetIndicator { .. } => "set_indicator",
        ViewOp::SetFeedState(_) => "set_feed_state",
        ViewOp::SetSectionState { .. } => "set_section_state",
        ViewOp::SetLoading(_) => "set_loading",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_geometry() {
        let metrics = ScrollMetrics {
            scroll_top: 100,
            scroll_height: 500,
            client_height: 300,
        };
        assert_eq!(metrics.bottom_offset(), 200);
        assert_eq!(metrics.distance_from_bottom(), 100);
        assert!(metrics.overflows());

        let short = ScrollMetrics {
            scroll_top: 0,
            scroll_height: 120,
            client_height: 300,
        };
        assert_eq!(short.bottom_offset(), 0);
        assert_eq!(short.distance_from_bottom(), 0);
        assert!(!short.overflows());
    }
}
