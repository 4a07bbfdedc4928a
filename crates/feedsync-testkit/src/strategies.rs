//! Property test strategies for feed operations
//!
//! Ids are drawn from a small pool so generated sequences collide often;
//! duplicate suppression is only exercised when ids repeat.

use feedsync_core::{EntryId, EntryPatch, IncomingEntry, Page, Payload};
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

/// One input to a feed, as the controller would see it
#[derive(Debug, Clone)]
pub enum FeedOp {
    /// History page, newest first
    Page(Page),
    /// Live `create`/`new`
    Live(IncomingEntry),
    /// Live `update`
    Update(EntryId, EntryPatch),
}

/// Ids `e0..e23`
pub fn arb_entry_id() -> impl Strategy<Value = EntryId> {
    (0u8..24).prop_map(|n| EntryId::new(format!("e{n}")))
}

/// Entry with an optional key in a narrow range so keys tie
pub fn arb_incoming() -> impl Strategy<Value = IncomingEntry> {
    (arb_entry_id(), proptest::option::of(-40i64..40), any::<bool>()).prop_map(
        |(id, key, labelled)| {
            let mut entry = IncomingEntry::new(id.clone(), Payload::new(id.to_string()));
            entry.sort_key = key.map(feedsync_core::SortKey);
            if labelled {
                entry.separator_label = Some(format!("before {id}"));
            }
            entry
        },
    )
}

/// Patch touching the unread count and preview
pub fn arb_patch() -> impl Strategy<Value = EntryPatch> {
    (proptest::option::of(0u32..5), proptest::option::of("[a-c]{1,3}")).prop_map(
        |(unread_count, preview)| EntryPatch {
            unread_count,
            preview,
            ..EntryPatch::default()
        },
    )
}

/// Page of up to eight entries
pub fn arb_page() -> impl Strategy<Value = Page> {
    (
        proptest::option::of(proptest::collection::vec(arb_incoming(), 0..8)),
        any::<bool>(),
    )
        .prop_map(|(entries, has_more)| Page { entries, has_more })
}

/// Any single feed input
pub fn arb_feed_op() -> impl Strategy<Value = FeedOp> {
    prop_oneof![
        2 => arb_page().prop_map(FeedOp::Page),
        4 => arb_incoming().prop_map(FeedOp::Live),
        2 => (arb_entry_id(), arb_patch()).prop_map(|(id, patch)| FeedOp::Update(id, patch)),
    ]
}

/// Sequence of up to `max` feed inputs
pub fn arb_feed_ops(max: usize) -> impl Strategy<Value = Vec<FeedOp>> {
    proptest::collection::vec(arb_feed_op(), 0..max)
}
