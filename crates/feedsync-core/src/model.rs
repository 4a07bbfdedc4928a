//! Feed model
//!
//! The ordered, deduplicated in-memory feed owned by one feed instance,
//! together with its pagination cursor and channel state. Mutation of the
//! entry sequence goes through the merge engine; pagination bookkeeping is
//! exposed so the controller can gate fetches.

use crate::entry::{order_of, Entry, EntryId, SortKey};
use crate::ops::FeedViewState;
use crate::page::PageCursor;
use crate::route::{IndicatorKey, NotificationSection};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Connection state of the feed's duplex channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelState {
    /// No connection and no attempt under way
    #[default]
    Disconnected,
    /// An attempt is under way
    Connecting,
    /// Open and delivering frames
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
        })
    }
}

/// Whether history has been loaded yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadPhase {
    /// First page not received yet
    #[default]
    NotLoaded,
    /// At least one page received
    Loaded,
    /// First page received and the feed had nothing in it
    Empty,
}

/// Ordered feed state for one feed instance
#[derive(Debug, Clone, Default)]
pub struct FeedModel {
    entries: Vec<Entry>,
    keys: HashMap<EntryId, SortKey>,
    cursor: PageCursor,
    has_more: bool,
    in_flight: bool,
    phase: LoadPhase,
    channel_state: ChannelState,
    focus_consumed: bool,
    view_state: Option<FeedViewState>,
    indicators: BTreeMap<IndicatorKey, bool>,
}

impl FeedModel {
    /// An empty, not yet loaded feed
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in ascending `(sort_key, id)` order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Whether any entry is rendered into `section`
    pub fn has_section(&self, section: NotificationSection) -> bool {
        self.entries.iter().any(|entry| entry.section == Some(section))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the feed holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry with this id is present
    pub fn contains(&self, id: &EntryId) -> bool {
        self.keys.contains_key(id)
    }

    /// Index of an entry
    pub fn position(&self, id: &EntryId) -> Option<usize> {
        let key = *self.keys.get(id)?;
        self.entries
            .binary_search_by(|probe| order_of(probe.sort_key, &probe.id, key, id))
            .ok()
    }

    /// Look up an entry
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.position(id).map(|index| &self.entries[index])
    }

    /// Oldest entry
    pub fn oldest(&self) -> Option<&Entry> {
        self.entries.first()
    }

    /// Newest entry
    pub fn newest(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Cursor of the next older page
    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    /// Whether an older page exists
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether a history request is outstanding
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// History load phase
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Channel state
    pub fn channel_state(&self) -> ChannelState {
        self.channel_state
    }

    /// Record a channel transition
    pub fn set_channel_state(&mut self, state: ChannelState) {
        self.channel_state = state;
    }

    /// Last feed state sent to the view
    pub fn view_state(&self) -> Option<FeedViewState> {
        self.view_state
    }

    /// Current state of a navigation indicator
    pub fn indicator(&self, key: IndicatorKey) -> bool {
        self.indicators.get(&key).copied().unwrap_or(false)
    }

    /// Whether the first-render focus has been handed out
    pub fn focus_consumed(&self) -> bool {
        self.focus_consumed
    }

    /// Claim the single outstanding history request
    ///
    /// Returns the cursor to fetch, or `None` when a request is already
    /// outstanding or no older page exists.
    pub fn begin_fetch(&mut self) -> Option<PageCursor> {
        if self.in_flight {
            return None;
        }
        let allowed = match self.phase {
            LoadPhase::NotLoaded => true,
            LoadPhase::Loaded => self.has_more,
            LoadPhase::Empty => false,
        };
        if !allowed {
            return None;
        }
        self.in_flight = true;
        Some(self.cursor)
    }

    /// Release the outstanding request after a failure; cursor is unchanged
    pub fn fail_fetch(&mut self) {
        self.in_flight = false;
    }

    /// Treat the feed as fully loaded without fetching history
    pub fn mark_loaded_without_history(&mut self) {
        self.phase = LoadPhase::Loaded;
        self.has_more = false;
        self.in_flight = false;
    }

    /// Check the ordering and uniqueness invariants
    pub fn is_consistent(&self) -> bool {
        let ordered = self
            .entries
            .windows(2)
            .all(|pair| pair[0].order(&pair[1]) == Ordering::Less);
        let indexed = self.keys.len() == self.entries.len()
            && self
                .entries
                .iter()
                .all(|entry| self.keys.get(&entry.id) == Some(&entry.sort_key));
        ordered && indexed
    }

    pub(crate) fn record_page(&mut self, has_more: bool) {
        if has_more {
            self.cursor = self.cursor.next();
        }
        self.has_more = has_more;
        self.in_flight = false;
        if self.phase == LoadPhase::NotLoaded {
            self.phase = LoadPhase::Loaded;
        }
    }

    pub(crate) fn set_phase(&mut self, phase: LoadPhase) {
        self.phase = phase;
    }

    pub(crate) fn consume_focus(&mut self) {
        self.focus_consumed = true;
    }

    pub(crate) fn set_view_state(&mut self, state: FeedViewState) {
        self.view_state = Some(state);
    }

    pub(crate) fn set_indicator(&mut self, key: IndicatorKey, active: bool) {
        self.indicators.insert(key, active);
    }

    pub(crate) fn entry_mut(&mut self, id: &EntryId) -> Option<&mut Entry> {
        let index = self.position(id)?;
        self.entries.get_mut(index)
    }

    /// Put a batch that is entirely older than the current oldest entry in front
    pub(crate) fn prepend(&mut self, batch: Vec<Entry>) {
        for entry in &batch {
            self.keys.insert(entry.id.clone(), entry.sort_key);
        }
        let newer = std::mem::replace(&mut self.entries, batch);
        self.entries.extend(newer);
    }

    /// Append an entry that sorts after the current newest entry
    pub(crate) fn push_back(&mut self, entry: Entry) {
        self.keys.insert(entry.id.clone(), entry.sort_key);
        self.entries.push(entry);
    }

    /// Insert at the sorted position, returning the index used
    pub(crate) fn insert_sorted(&mut self, entry: Entry) -> usize {
        let index = self
            .entries
            .partition_point(|probe| probe.order(&entry) == Ordering::Less);
        self.keys.insert(entry.id.clone(), entry.sort_key);
        self.entries.insert(index, entry);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{IncomingEntry, Payload};

    fn entry(id: &str, key: i64) -> Entry {
        IncomingEntry::new(id, Payload::default()).into_entry(SortKey(key))
    }

    #[test]
    fn test_begin_fetch_is_exclusive() {
        let mut model = FeedModel::new();
        assert_eq!(model.begin_fetch(), Some(PageCursor::FIRST));
        assert_eq!(model.begin_fetch(), None);

        model.fail_fetch();
        assert_eq!(model.begin_fetch(), Some(PageCursor::FIRST));
    }

    #[test]
    fn test_record_page_advances_cursor_only_with_more() {
        let mut model = FeedModel::new();
        model.begin_fetch();
        model.record_page(true);
        assert_eq!(model.cursor().page(), 2);
        assert!(model.has_more());
        assert!(!model.in_flight());

        model.begin_fetch();
        model.record_page(false);
        assert_eq!(model.cursor().page(), 2);
        assert!(!model.has_more());
        assert_eq!(model.begin_fetch(), None);
    }

    #[test]
    fn test_feed_without_history_never_fetches() {
        let mut model = FeedModel::new();
        model.mark_loaded_without_history();
        assert_eq!(model.phase(), LoadPhase::Loaded);
        assert_eq!(model.begin_fetch(), None);
    }

    #[test]
    fn test_sorted_insert_and_lookup() {
        let mut model = FeedModel::new();
        model.push_back(entry("a", 1));
        model.push_back(entry("c", 5));
        assert_eq!(model.insert_sorted(entry("b", 3)), 1);
        model.prepend(vec![entry("z", -2), entry("y", -1)]);

        let ids: Vec<_> = model.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["z", "y", "a", "b", "c"]);
        assert_eq!(model.position(&EntryId::new("b")), Some(3));
        assert!(model.get(&EntryId::new("missing")).is_none());
        assert!(model.is_consistent());
    }
}
