//! Pagination trigger
//!
//! Decides when a scroll report should pull the next older page and
//! whether the trailing load-more control is shown. The single in-flight
//! rule itself lives in `FeedModel::begin_fetch`.

use crate::sink::ScrollMetrics;
use feedsync_core::{FeedModel, LoadPhase};

/// Scroll-to-top and load-more rules for one feed view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationTrigger {
    top_threshold_px: u32,
}

impl PaginationTrigger {
    /// Trigger that fires when the viewport is within `top_threshold_px`
    /// of the top
    pub fn new(top_threshold_px: u32) -> Self {
        Self { top_threshold_px }
    }

    /// Whether the viewport is at the top of the content
    pub fn at_top(&self, metrics: ScrollMetrics) -> bool {
        metrics.scroll_top <= self.top_threshold_px
    }

    /// Whether a scroll report should request the next page
    pub fn should_fetch(&self, model: &FeedModel, metrics: ScrollMetrics) -> bool {
        self.at_top(metrics) && !model.in_flight() && pages_remain(model)
    }

    /// The load-more control shows only while a page can still be
    /// requested and the rendered entries do not fill the viewport
    pub fn load_more_visible(&self, model: &FeedModel, metrics: ScrollMetrics) -> bool {
        pages_remain(model) && !metrics.overflows()
    }
}

/// A feed whose first page never arrived can always ask for it again
fn pages_remain(model: &FeedModel) -> bool {
    match model.phase() {
        LoadPhase::NotLoaded => !model.in_flight(),
        LoadPhase::Loaded => model.has_more(),
        LoadPhase::Empty => false,
    }
}

impl Default for PaginationTrigger {
    fn default() -> Self {
        Self::new(0)
    }
}
