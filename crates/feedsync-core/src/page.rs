//! History pages and the pagination cursor

use crate::entry::{EntryFields, EntryId, IncomingEntry, Payload, SortKey};
use crate::error::FeedResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based page number of the next older page to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(u32);

impl PageCursor {
    /// The newest page
    pub const FIRST: PageCursor = PageCursor(1);

    /// Cursor for an explicit page number (0 is clamped to 1)
    pub fn new(page: u32) -> Self {
        Self(page.max(1))
    }

    /// Page number
    pub fn page(self) -> u32 {
        self.0
    }

    /// The page after this one
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One history response
///
/// `entries` is `None` when the server reported no data for the page,
/// which on the first page means the feed is empty. Entries are in server
/// order: newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    /// Entries, newest first
    pub entries: Option<Vec<IncomingEntry>>,
    /// Whether an older page exists
    pub has_more: bool,
}

impl Page {
    /// A page without data
    pub fn empty() -> Self {
        Self::default()
    }

    /// A page with entries (newest first)
    pub fn new(entries: Vec<IncomingEntry>, has_more: bool) -> Self {
        Self {
            entries: Some(entries),
            has_more,
        }
    }

    /// Decode the JSON body of a history response
    pub fn from_json(body: &str) -> FeedResult<Self> {
        let wire: WirePage = serde_json::from_str(body)?;
        Ok(wire.into())
    }

    /// Number of entries carried
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    /// True when the page carries no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    message_list: Option<Vec<WireEntry>>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    id: EntryId,
    #[serde(default)]
    sort_key: Option<i64>,
    #[serde(default)]
    template: String,
    #[serde(default)]
    separator: Option<String>,
    #[serde(default)]
    is_last_unviewed_message: bool,
}

impl From<WirePage> for Page {
    fn from(wire: WirePage) -> Self {
        let entries = wire
            .message_list
            .map(|list| list.into_iter().map(IncomingEntry::from).collect());
        Self {
            entries,
            has_more: wire.has_next,
        }
    }
}

impl From<WireEntry> for IncomingEntry {
    fn from(wire: WireEntry) -> Self {
        Self {
            id: wire.id,
            sort_key: wire.sort_key.map(SortKey),
            payload: Payload::new(wire.template),
            separator_label: wire.separator.filter(|label| !label.is_empty()),
            focus_target: wire.is_last_unviewed_message,
            section: None,
            fields: EntryFields::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_message_list_is_no_data() {
        let page = Page::from_json(r#"{"message_list": null, "has_next": false}"#).unwrap();
        assert_eq!(page.entries, None);
        assert!(!page.has_more);

        let page = Page::from_json(r#"{"has_next": false}"#).unwrap();
        assert_eq!(page.entries, None);
    }

    #[test]
    fn test_page_entries_keep_server_order() {
        let body = r#"{
            "message_list": [
                {"id": 3, "sort_key": 30, "template": "<p>c</p>", "separator": "Today"},
                {"id": 2, "sort_key": 20, "template": "<p>b</p>", "is_last_unviewed_message": true},
                {"id": "1", "template": "<p>a</p>", "separator": ""}
            ],
            "has_next": true
        }"#;
        let page = Page::from_json(body).unwrap();
        let entries = page.entries.as_ref().unwrap();

        assert!(page.has_more);
        assert_eq!(page.len(), 3);
        assert_eq!(entries[0].id.as_str(), "3");
        assert_eq!(entries[0].separator_label.as_deref(), Some("Today"));
        assert!(entries[1].focus_target);
        assert_eq!(entries[2].sort_key, None);
        assert_eq!(entries[2].separator_label, None);
    }

    #[test]
    fn test_malformed_body_is_a_decode_error() {
        assert!(Page::from_json("<html>").is_err());
    }

    #[test]
    fn test_cursor_starts_at_one() {
        assert_eq!(PageCursor::default().page(), 1);
        assert_eq!(PageCursor::new(0), PageCursor::FIRST);
        assert_eq!(PageCursor::FIRST.next().page(), 2);
    }
}
