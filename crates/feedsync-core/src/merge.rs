//! Merge engine
//!
//! Reconciles history pages and live events into a [`FeedModel`] and
//! describes the resulting render mutations as a [`MergeOutcome`].
//! Every merge keeps the model sorted by `(sort_key, id)` with unique ids;
//! duplicates and updates for unknown ids are absorbed as no-ops.

use crate::entry::{order_of, Entry, EntryId, EntryPatch, IncomingEntry, SortKey};
use crate::event::FeedEvent;
use crate::model::{FeedModel, LoadPhase};
use crate::ops::{FeedViewState, MergeOutcome, ScrollDirective, ViewOp};
use crate::page::Page;
use crate::route::{FeedKind, NotificationSection};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// When a live append should pull the view to the bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StickPolicy {
    /// Always follow new entries
    Always,
    /// Follow only when the view already shows the newest entry
    NearBottom,
    /// Never move the view on append
    Never,
}

impl StickPolicy {
    /// Default policy for a feed kind
    pub fn for_kind(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Chat => StickPolicy::NearBottom,
            FeedKind::ChatList | FeedKind::Notifications | FeedKind::Navbar => StickPolicy::Never,
        }
    }

    fn sticks(self, viewport: Viewport) -> bool {
        match self {
            StickPolicy::Always => true,
            StickPolicy::NearBottom => viewport.near_bottom,
            StickPolicy::Never => false,
        }
    }
}

/// What the merge engine needs to know about the view before a live append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Whether the view was at (or close to) the newest entry
    pub near_bottom: bool,
}

impl Viewport {
    /// A viewport showing the newest entry
    pub fn at_bottom() -> Self {
        Self { near_bottom: true }
    }

    /// A viewport scrolled away from the newest entry
    pub fn scrolled_up() -> Self {
        Self { near_bottom: false }
    }
}

/// Stateless merge rules, parameterized by the stick policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeEngine {
    policy: StickPolicy,
}

impl MergeEngine {
    /// Engine with the given stick policy
    pub fn new(policy: StickPolicy) -> Self {
        Self { policy }
    }

    /// Engine with the default policy for a feed kind
    pub fn for_kind(kind: FeedKind) -> Self {
        Self::new(StickPolicy::for_kind(kind))
    }

    /// Active stick policy
    pub fn policy(&self) -> StickPolicy {
        self.policy
    }

    /// Merge a history page
    ///
    /// Records the cursor outcome, drops ids already present, prepends the
    /// entries older than everything held and places any others at their
    /// sorted position. The first page scrolls to the bottom and may carry a
    /// focus request; later pages ask the view to preserve its anchor.
    pub fn merge_page(&self, model: &mut FeedModel, page: Page) -> MergeOutcome {
        let first_load = model.phase() == LoadPhase::NotLoaded;
        model.record_page(page.has_more);

        let mut outcome = MergeOutcome::none();
        let incoming = page.entries.unwrap_or_default();
        let resolved = resolve_history_keys(model, incoming);

        let mut seen = HashSet::new();
        let mut older = Vec::new();
        let mut overlapping = Vec::new();
        for entry in resolved {
            if model.contains(&entry.id) || !seen.insert(entry.id.clone()) {
                debug!(id = %entry.id, "Dropping duplicate history entry");
                continue;
            }
            if is_older_than_all(model, &entry) {
                older.push(entry);
            } else {
                overlapping.push(entry);
            }
        }
        older.sort_by(Entry::order);
        overlapping.sort_by(Entry::order);
        let opened = opened_sections(model, older.iter().chain(&overlapping));

        let prepended = !older.is_empty();
        if prepended {
            let focus = if model.focus_consumed() {
                None
            } else {
                older
                    .iter()
                    .find(|entry| entry.is_boundary_focus_target)
                    .map(|entry| entry.id.clone())
            };
            let separators = separators_of(&older);
            model.prepend(older.clone());
            outcome.push(ViewOp::PrependEntries {
                entries: older,
                focus,
            });
            outcome.ops.extend(separators);
        }
        outcome.above_anchor = outcome.ops.len();

        for entry in overlapping {
            let separators = separators_of(std::slice::from_ref(&entry));
            outcome.push(place_sorted(model, entry, false));
            outcome.ops.extend(separators);
        }
        push_opened_sections(&mut outcome, opened);

        if first_load {
            model.consume_focus();
            if model.is_empty() && !model.has_more() {
                model.set_phase(LoadPhase::Empty);
            }
        }

        let desired = if model.is_empty() {
            FeedViewState::Empty
        } else {
            FeedViewState::Populated
        };
        if model.view_state() != Some(desired)
            && (first_load || desired == FeedViewState::Populated)
        {
            model.set_view_state(desired);
            outcome.push(ViewOp::SetFeedState(desired));
        }
        outcome.push(ViewOp::SetLoading(false));

        outcome.scroll = if first_load && !model.is_empty() {
            ScrollDirective::ToBottom
        } else if prepended {
            ScrollDirective::PreserveAnchor
        } else {
            ScrollDirective::Keep
        };
        outcome
    }

    /// Merge one live `create`/`new` entry at the tail
    pub fn merge_live(
        &self,
        model: &mut FeedModel,
        incoming: IncomingEntry,
        viewport: Viewport,
    ) -> MergeOutcome {
        if model.contains(&incoming.id) {
            debug!(id = %incoming.id, "Dropping duplicate live entry");
            return MergeOutcome::none();
        }

        let key = resolve_live_key(model, &incoming);
        let entry = incoming.into_entry(key);
        let stick_to_bottom = self.policy.sticks(viewport);
        let opened = opened_sections(model, std::iter::once(&entry));

        let mut outcome = MergeOutcome::none();
        if model.newest().map_or(true, |newest| entry.order(newest) == Ordering::Greater) {
            model.push_back(entry.clone());
            outcome.push(ViewOp::AppendEntry {
                entry,
                stick_to_bottom,
            });
        } else {
            // Only reachable once the newest key saturates at i64::MAX
            debug!(id = %entry.id, "Live entry cannot sort last; placing it in order");
            outcome.push(place_sorted(model, entry, stick_to_bottom));
        }
        push_opened_sections(&mut outcome, opened);
        if model.view_state() != Some(FeedViewState::Populated) {
            model.set_view_state(FeedViewState::Populated);
            outcome.push(ViewOp::SetFeedState(FeedViewState::Populated));
        }
        outcome
    }

    /// Apply an in-place update; unknown ids and no-change patches emit nothing
    pub fn merge_update(
        &self,
        model: &mut FeedModel,
        id: &EntryId,
        patch: &EntryPatch,
    ) -> MergeOutcome {
        let Some(entry) = model.entry_mut(id) else {
            debug!(id = %id, "Ignoring update for unknown entry");
            return MergeOutcome::none();
        };
        if !entry.fields.apply(patch) {
            return MergeOutcome::none();
        }

        let mut outcome = MergeOutcome::none();
        outcome.push(ViewOp::UpdateEntry {
            id: id.clone(),
            patch: patch.clone(),
        });
        outcome
    }

    /// Dispatch a decoded channel event
    pub fn merge_event(
        &self,
        model: &mut FeedModel,
        event: FeedEvent,
        viewport: Viewport,
    ) -> MergeOutcome {
        match event {
            FeedEvent::Create(entry) | FeedEvent::NewItem(entry) => {
                self.merge_live(model, entry, viewport)
            }
            FeedEvent::Update { id, patch } => self.merge_update(model, &id, &patch),
            FeedEvent::Indicator { key, active } => {
                model.set_indicator(key, active);
                let mut outcome = MergeOutcome::none();
                outcome.push(ViewOp::SetIndicator { key, active });
                outcome
            }
        }
    }
}

/// Entries without a key get consecutive keys below the current oldest one
/// in server (newest-first) order
fn resolve_history_keys(model: &FeedModel, incoming: Vec<IncomingEntry>) -> Vec<Entry> {
    let base = model.oldest().map_or(SortKey(0), |entry| entry.sort_key);
    incoming
        .into_iter()
        .zip(1i64..)
        .map(|(entry, offset)| {
            let key = entry.sort_key.unwrap_or_else(|| base.back(offset));
            entry.into_entry(key)
        })
        .collect()
}

/// Live entries always land after the newest entry held
fn resolve_live_key(model: &FeedModel, incoming: &IncomingEntry) -> SortKey {
    let Some(newest) = model.newest() else {
        return incoming.sort_key.unwrap_or_default();
    };
    match incoming.sort_key {
        Some(key)
            if order_of(key, &incoming.id, newest.sort_key, &newest.id) == Ordering::Greater =>
        {
            key
        }
        _ => newest.sort_key.successor(),
    }
}

/// Insert at the sorted position and describe where the entry went
fn place_sorted(model: &mut FeedModel, entry: Entry, stick_to_bottom: bool) -> ViewOp {
    let index = model.insert_sorted(entry.clone());
    match model.entries().get(index + 1) {
        Some(next) => ViewOp::InsertEntry {
            entry,
            before: next.id.clone(),
        },
        None => ViewOp::AppendEntry {
            entry,
            stick_to_bottom,
        },
    }
}

/// Sections that hold nothing yet and are about to receive an entry
fn opened_sections<'a>(
    model: &FeedModel,
    entries: impl IntoIterator<Item = &'a Entry>,
) -> Vec<NotificationSection> {
    let mut opened = Vec::new();
    for section in entries.into_iter().filter_map(|entry| entry.section) {
        if !opened.contains(&section) && !model.has_section(section) {
            opened.push(section);
        }
    }
    opened
}

fn push_opened_sections(outcome: &mut MergeOutcome, opened: Vec<NotificationSection>) {
    for section in opened {
        outcome.push(ViewOp::SetSectionState {
            section,
            state: FeedViewState::Populated,
        });
    }
}

fn is_older_than_all(model: &FeedModel, entry: &Entry) -> bool {
    model
        .oldest()
        .map_or(true, |oldest| entry.order(oldest) == Ordering::Less)
}

fn separators_of(entries: &[Entry]) -> Vec<ViewOp> {
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .separator_label
                .as_ref()
                .map(|label| ViewOp::InsertSeparator {
                    before: entry.id.clone(),
                    label: label.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Payload;
    use crate::route::IndicatorKey;
    use assert_matches::assert_matches;

    fn incoming(id: &str, key: i64) -> IncomingEntry {
        IncomingEntry::new(id, Payload::new(format!("<p>{id}</p>"))).with_sort_key(key)
    }

    fn ids(model: &FeedModel) -> Vec<&str> {
        model.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_first_page_prepends_ascending_and_scrolls_to_bottom() {
        let engine = MergeEngine::new(StickPolicy::NearBottom);
        let mut model = FeedModel::new();
        model.begin_fetch();

        let page = Page::new(vec![incoming("c", 3), incoming("b", 2), incoming("a", 1)], true);
        let outcome = engine.merge_page(&mut model, page);

        assert_eq!(ids(&model), ["a", "b", "c"]);
        assert_eq!(outcome.scroll, ScrollDirective::ToBottom);
        assert_matches!(&outcome.ops[0], ViewOp::PrependEntries { entries, focus: None } => {
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[0].id.as_str(), "a");
        });
        assert!(outcome.ops.contains(&ViewOp::SetFeedState(FeedViewState::Populated)));
        assert_eq!(outcome.ops.last(), Some(&ViewOp::SetLoading(false)));
    }

    #[test]
    fn test_later_page_preserves_anchor() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        model.begin_fetch();
        engine.merge_page(&mut model, Page::new(vec![incoming("b", 2)], true));

        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::new(vec![incoming("a", 1)], false));

        assert_eq!(outcome.scroll, ScrollDirective::PreserveAnchor);
        assert!(!outcome
            .ops
            .iter()
            .any(|op| matches!(op, ViewOp::SetFeedState(_))));
        assert_eq!(ids(&model), ["a", "b"]);
        assert!(!model.has_more());
    }

    #[test]
    fn test_focus_only_on_first_page() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();

        let mut target = incoming("b", 2);
        target.focus_target = true;
        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::new(vec![target, incoming("a", 1)], true));
        assert_matches!(&outcome.ops[0], ViewOp::PrependEntries { focus: Some(id), .. } => {
            assert_eq!(id.as_str(), "b");
        });

        let mut again = incoming("0", 0);
        again.focus_target = true;
        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::new(vec![again], false));
        assert_matches!(&outcome.ops[0], ViewOp::PrependEntries { focus: None, .. });
    }

    #[test]
    fn test_only_prepended_ops_sit_above_anchor() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        model.begin_fetch();
        engine.merge_page(&mut model, Page::new(vec![incoming("d", 4), incoming("b", 2)], true));

        let mut labelled = incoming("a", 1);
        labelled.separator_label = Some("Monday".into());
        model.begin_fetch();
        let outcome =
            engine.merge_page(&mut model, Page::new(vec![incoming("c", 3), labelled], false));

        assert_eq!(ids(&model), ["a", "b", "c", "d"]);
        assert_eq!(outcome.scroll, ScrollDirective::PreserveAnchor);
        assert_eq!(outcome.above_anchor, 2);
        assert_matches!(&outcome.ops[0], ViewOp::PrependEntries { .. });
        assert_matches!(&outcome.ops[1], ViewOp::InsertSeparator { .. });
        assert_matches!(&outcome.ops[2], ViewOp::InsertEntry { before, .. } => {
            assert_eq!(before.as_str(), "d");
        });
    }

    #[test]
    fn test_separator_follows_prepend() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        let mut labelled = incoming("a", 1);
        labelled.separator_label = Some("Yesterday".into());

        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::new(vec![incoming("b", 2), labelled], false));
        assert_eq!(
            outcome.ops[1],
            ViewOp::InsertSeparator {
                before: EntryId::new("a"),
                label: "Yesterday".into()
            }
        );
    }

    #[test]
    fn test_empty_first_page_sets_empty_state() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::empty());

        assert_eq!(model.phase(), LoadPhase::Empty);
        assert!(!model.has_more());
        assert_eq!(
            outcome.ops,
            vec![
                ViewOp::SetFeedState(FeedViewState::Empty),
                ViewOp::SetLoading(false)
            ]
        );
        assert_eq!(outcome.scroll, ScrollDirective::Keep);
    }

    #[test]
    fn test_unkeyed_history_entries_sort_below_oldest() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        model.begin_fetch();
        let page = Page::new(
            vec![
                IncomingEntry::new("newer", Payload::default()),
                IncomingEntry::new("older", Payload::default()),
            ],
            false,
        );
        engine.merge_page(&mut model, page);

        assert_eq!(ids(&model), ["older", "newer"]);
        assert_eq!(model.entries()[1].sort_key, SortKey(-1));
    }

    #[test]
    fn test_overlapping_history_entry_is_inserted_in_place() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        engine.merge_live(&mut model, incoming("a", 1), Viewport::default());
        engine.merge_live(&mut model, incoming("c", 3), Viewport::default());

        model.begin_fetch();
        let outcome = engine.merge_page(&mut model, Page::new(vec![incoming("b", 2)], false));
        assert_eq!(ids(&model), ["a", "b", "c"]);
        assert_matches!(&outcome.ops[0], ViewOp::InsertEntry { before, .. } => {
            assert_eq!(before.as_str(), "c");
        });
        assert_eq!(outcome.scroll, ScrollDirective::ToBottom);
    }

    #[test]
    fn test_live_append_stick_policy() {
        let mut model = FeedModel::new();
        let near = MergeEngine::new(StickPolicy::NearBottom);

        let outcome = near.merge_live(&mut model, incoming("a", 1), Viewport::at_bottom());
        assert_matches!(&outcome.ops[0], ViewOp::AppendEntry { stick_to_bottom: true, .. });

        let outcome = near.merge_live(&mut model, incoming("b", 2), Viewport::scrolled_up());
        assert_matches!(&outcome.ops[0], ViewOp::AppendEntry { stick_to_bottom: false, .. });

        let always = MergeEngine::new(StickPolicy::Always);
        let outcome = always.merge_live(&mut model, incoming("c", 3), Viewport::scrolled_up());
        assert_matches!(&outcome.ops[0], ViewOp::AppendEntry { stick_to_bottom: true, .. });
    }

    #[test]
    fn test_live_key_is_lifted_past_newest() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        engine.merge_live(&mut model, incoming("b", 10), Viewport::default());
        engine.merge_live(&mut model, incoming("a", 4), Viewport::default());
        engine.merge_live(&mut model, IncomingEntry::new("c", Payload::default()), Viewport::default());

        assert_eq!(ids(&model), ["b", "a", "c"]);
        assert_eq!(model.newest().map(|e| e.sort_key), Some(SortKey(12)));
        assert!(model.is_consistent());
    }

    #[test]
    fn test_live_entry_after_saturated_key_stays_sorted() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        engine.merge_live(&mut model, incoming("z", i64::MAX), Viewport::default());

        let outcome = engine.merge_live(
            &mut model,
            IncomingEntry::new("a", Payload::default()),
            Viewport::default(),
        );

        assert_eq!(ids(&model), ["a", "z"]);
        assert!(model.is_consistent());
        assert_matches!(&outcome.ops[0], ViewOp::InsertEntry { entry, before } => {
            assert_eq!(entry.id.as_str(), "a");
            assert_eq!(before.as_str(), "z");
        });
    }

    #[test]
    fn test_duplicate_live_entry_is_dropped() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        let first = engine.merge_live(&mut model, incoming("x", 1), Viewport::default());
        assert_eq!(
            first.ops.last(),
            Some(&ViewOp::SetFeedState(FeedViewState::Populated))
        );

        let second = engine.merge_live(&mut model, incoming("x", 5), Viewport::default());
        assert!(second.is_empty());
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_update_unknown_and_unchanged_are_silent() {
        let engine = MergeEngine::new(StickPolicy::Never);
        let mut model = FeedModel::new();
        engine.merge_live(&mut model, incoming("a", 1), Viewport::default());

        let patch = EntryPatch {
            unread_count: Some(4),
            ..Default::default()
        };
        assert!(engine
            .merge_update(&mut model, &EntryId::new("zz"), &patch)
            .is_empty());

        let outcome = engine.merge_update(&mut model, &EntryId::new("a"), &patch);
        assert_eq!(outcome.ops.len(), 1);
        assert!(engine
            .merge_update(&mut model, &EntryId::new("a"), &patch)
            .is_empty());
        assert_eq!(model.entries()[0].fields.unread_count, Some(4));
    }

    #[test]
    fn test_indicator_event() {
        let engine = MergeEngine::for_kind(FeedKind::Navbar);
        let mut model = FeedModel::new();
        let outcome = engine.merge_event(
            &mut model,
            FeedEvent::Indicator {
                key: IndicatorKey::Chats,
                active: true,
            },
            Viewport::default(),
        );
        assert_eq!(
            outcome.ops,
            vec![ViewOp::SetIndicator {
                key: IndicatorKey::Chats,
                active: true
            }]
        );
        assert!(model.indicator(IndicatorKey::Chats));
        assert!(model.is_empty());
    }
}
