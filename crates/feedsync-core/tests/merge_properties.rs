#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]
//! Property-based tests for the merge engine
//!
//! For arbitrary interleavings of history pages, live appends and updates:
//! - entries stay sorted by `(sort_key, id)` with unique ids
//! - appending or updating twice equals doing it once
//! - only pages move the cursor
//! - live entries always land at the tail

use feedsync_core::{FeedModel, MergeEngine, MergeOutcome, StickPolicy, Viewport};
use feedsync_testkit::strategies::{arb_entry_id, arb_feed_ops, arb_incoming, arb_patch, FeedOp};
use proptest::prelude::*;
use std::collections::HashSet;

fn apply(engine: &MergeEngine, model: &mut FeedModel, op: &FeedOp) -> MergeOutcome {
    match op.clone() {
        FeedOp::Page(page) => {
            model.begin_fetch();
            engine.merge_page(model, page)
        }
        FeedOp::Live(entry) => engine.merge_live(model, entry, Viewport::default()),
        FeedOp::Update(id, patch) => engine.merge_update(model, &id, &patch),
    }
}

fn build(ops: &[FeedOp]) -> (MergeEngine, FeedModel) {
    let engine = MergeEngine::new(StickPolicy::NearBottom);
    let mut model = FeedModel::new();
    for op in ops {
        apply(&engine, &mut model, op);
    }
    (engine, model)
}

proptest! {
    /// Property: the model is sorted and duplicate-free after any sequence
    #[test]
    fn prop_model_stays_ordered_and_unique(ops in arb_feed_ops(40)) {
        let engine = MergeEngine::new(StickPolicy::NearBottom);
        let mut model = FeedModel::new();
        for op in &ops {
            apply(&engine, &mut model, op);
            prop_assert!(model.is_consistent());
        }

        let ids: HashSet<_> = model.entries().iter().map(|e| e.id.clone()).collect();
        prop_assert_eq!(ids.len(), model.len());
    }

    /// Property: every placed entry is reported exactly once, in view ops
    #[test]
    fn prop_outcomes_place_each_new_entry_once(ops in arb_feed_ops(30)) {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        let mut placed = Vec::new();
        for op in &ops {
            let outcome = apply(&engine, &mut model, op);
            placed.extend(outcome.placed_ids().into_iter().cloned());
        }

        let unique: HashSet<_> = placed.iter().cloned().collect();
        prop_assert_eq!(unique.len(), placed.len());
        prop_assert_eq!(placed.len(), model.len());
    }

    /// Property: appending the same entry twice equals appending it once
    #[test]
    fn prop_append_is_idempotent(ops in arb_feed_ops(20), entry in arb_incoming()) {
        let (engine, mut once) = build(&ops);
        let mut twice = once.clone();

        engine.merge_live(&mut once, entry.clone(), Viewport::default());
        engine.merge_live(&mut twice, entry.clone(), Viewport::default());
        let second = engine.merge_live(&mut twice, entry, Viewport::default());

        prop_assert!(second.is_empty());
        prop_assert_eq!(once.entries(), twice.entries());
    }

    /// Property: updating twice equals updating once; unknown ids change nothing
    #[test]
    fn prop_update_is_idempotent(
        ops in arb_feed_ops(20),
        id in arb_entry_id(),
        patch in arb_patch()
    ) {
        let (engine, mut once) = build(&ops);
        let before_len = once.len();
        let known = once.contains(&id);
        let mut twice = once.clone();

        engine.merge_update(&mut once, &id, &patch);
        engine.merge_update(&mut twice, &id, &patch);
        let second = engine.merge_update(&mut twice, &id, &patch);

        prop_assert!(second.is_empty());
        prop_assert_eq!(once.entries(), twice.entries());
        prop_assert_eq!(once.len(), before_len);
        if !known {
            prop_assert!(!once.contains(&id));
        }
    }

    /// Property: the cursor advances once per page that reports more, and
    /// live events never touch pagination state
    #[test]
    fn prop_only_pages_move_the_cursor(ops in arb_feed_ops(30)) {
        let engine = MergeEngine::new(StickPolicy::Always);
        let mut model = FeedModel::new();
        let mut advancing_pages = 0u32;
        for op in &ops {
            let cursor = model.cursor();
            let has_more = model.has_more();
            apply(&engine, &mut model, op);
            match op {
                FeedOp::Page(page) => {
                    if page.has_more {
                        advancing_pages += 1;
                    }
                    prop_assert!(!model.in_flight());
                }
                FeedOp::Live(_) | FeedOp::Update(..) => {
                    prop_assert_eq!(model.cursor(), cursor);
                    prop_assert_eq!(model.has_more(), has_more);
                }
            }
        }
        prop_assert_eq!(model.cursor().page(), 1 + advancing_pages);
    }

    /// Property: a new live entry always becomes the newest entry
    #[test]
    fn prop_live_entry_lands_at_tail(ops in arb_feed_ops(20), entry in arb_incoming()) {
        let (engine, mut model) = build(&ops);
        prop_assume!(!model.contains(&entry.id));

        let id = entry.id.clone();
        engine.merge_live(&mut model, entry, Viewport::default());
        prop_assert_eq!(model.newest().map(|e| &e.id), Some(&id));
        prop_assert!(model.is_consistent());
    }
}
