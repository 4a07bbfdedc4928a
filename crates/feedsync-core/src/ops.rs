//! View operations emitted by the merge engine
//!
//! The merge engine never touches a render target. It returns a
//! [`MergeOutcome`]: an ordered list of [`ViewOp`]s plus a single
//! [`ScrollDirective`] that a view adapter applies after the ops.

use crate::entry::{Entry, EntryId, EntryPatch};
use crate::route::{IndicatorKey, NotificationSection};
use serde::{Deserialize, Serialize};

/// Coarse state of the rendered feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedViewState {
    /// Loaded and nothing to show
    Empty,
    /// At least one entry rendered
    Populated,
}

/// What the view should do with its scroll offset once ops are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollDirective {
    /// Leave the scroll offset alone
    #[default]
    Keep,
    /// Content was inserted above the viewport; shift the offset by the
    /// height of the ops counted in [`MergeOutcome::above_anchor`] so the
    /// visible entries stay put
    PreserveAnchor,
    /// Jump to the newest entry
    ToBottom,
}

/// One render mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewOp {
    /// Insert a batch above everything rendered, oldest first
    PrependEntries {
        /// Entries in ascending order
        entries: Vec<Entry>,
        /// Entry to bring into view once the batch is rendered and the
        /// scroll directive applied
        focus: Option<EntryId>,
    },
    /// Insert an entry directly before an already rendered one
    InsertEntry {
        /// Entry to insert
        entry: Entry,
        /// Existing entry it goes in front of
        before: EntryId,
    },
    /// Append an entry after everything rendered
    AppendEntry {
        /// Entry to append
        entry: Entry,
        /// Whether the view should follow it to the bottom
        stick_to_bottom: bool,
    },
    /// Change display fields of a rendered entry in place
    UpdateEntry {
        /// Entry to change
        id: EntryId,
        /// Fields to set
        patch: EntryPatch,
    },
    /// Insert a group label directly above an entry
    InsertSeparator {
        /// Entry the label sits above
        before: EntryId,
        /// Label text
        label: String,
    },
    /// Highlight or clear a navigation indicator
    SetIndicator {
        /// Indicator to change
        key: IndicatorKey,
        /// New highlight state
        active: bool,
    },
    /// Switch between empty-feed and populated rendering
    SetFeedState(FeedViewState),
    /// Switch one notification section between its placeholder and its
    /// entries
    SetSectionState {
        /// Section to change
        section: NotificationSection,
        /// New state of the section
        state: FeedViewState,
    },
    /// Show or hide the loading indicator
    SetLoading(bool),
}

/// Result of one merge
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Ops in application order
    pub ops: Vec<ViewOp>,
    /// Scroll handling after the ops
    pub scroll: ScrollDirective,
    /// Number of leading ops that insert content above the viewport anchor
    pub above_anchor: usize,
}

impl MergeOutcome {
    /// An outcome that changes nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// True when applying this outcome is a no-op
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.scroll == ScrollDirective::Keep
    }

    pub(crate) fn push(&mut self, op: ViewOp) {
        self.ops.push(op);
    }

    /// Entry the view should bring into view after scrolling
    pub fn focus(&self) -> Option<&EntryId> {
        self.ops.iter().find_map(|op| match op {
            ViewOp::PrependEntries { focus, .. } => focus.as_ref(),
            _ => None,
        })
    }

    /// Ids of every entry this outcome places in the view, in op order
    pub fn placed_ids(&self) -> Vec<&EntryId> {
        let mut ids = Vec::new();
        for op in &self.ops {
            match op {
                ViewOp::PrependEntries { entries, .. } => ids.extend(entries.iter().map(|e| &e.id)),
                ViewOp::InsertEntry { entry, .. } | ViewOp::AppendEntry { entry, .. } => {
                    ids.push(&entry.id)
                }
                _ => {}
            }
        }
        ids
    }
}
