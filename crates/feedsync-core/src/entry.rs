//! Feed entries
//!
//! An [`Entry`] is one unit of feed content: a chat message, a chat summary
//! in the chat list, or a notification. The core never interprets the
//! rendered payload; it only orders entries by `(sort_key, id)` and keeps
//! a handful of display fields that live updates may change in place.

use crate::route::NotificationSection;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Opaque, stable entry identifier, unique within one feed
///
/// Servers send ids as strings (uuids) or integers; both decode to the
/// same textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create an id from its textual form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Textual form of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// Monotonic ordering key (creation time or server sequence)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SortKey(pub i64);

impl SortKey {
    /// The key immediately after this one
    pub fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The key `offset` steps before this one
    pub fn back(self, offset: i64) -> Self {
        Self(self.0.saturating_sub(offset))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-rendered markup, passed through untouched
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    /// Wrap rendered content
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Rendered content as received
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Display-relevant fields that `update` events change in place
///
/// Which fields are meaningful depends on the feed kind: chat summaries
/// carry a preview, author, date label and unread count; notifications
/// carry a status label and a finished flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFields {
    /// Status label (e.g. "Accepted")
    pub status: Option<String>,
    /// Whether the underlying request has finished
    pub finished: Option<bool>,
    /// Unread message count
    pub unread_count: Option<u32>,
    /// Last-message preview text
    pub preview: Option<String>,
    /// Author of the last message
    pub preview_author: Option<String>,
    /// Pre-formatted date/time label of the last message
    pub date_label: Option<String>,
}

impl EntryFields {
    /// Apply a patch; returns whether any field changed
    pub fn apply(&mut self, patch: &EntryPatch) -> bool {
        let mut changed = false;
        changed |= assign(&mut self.status, &patch.status);
        changed |= assign(&mut self.finished, &patch.finished);
        changed |= assign(&mut self.unread_count, &patch.unread_count);
        changed |= assign(&mut self.preview, &patch.preview);
        changed |= assign(&mut self.preview_author, &patch.preview_author);
        changed |= assign(&mut self.date_label, &patch.date_label);
        changed
    }
}

fn assign<T: Clone + PartialEq>(slot: &mut Option<T>, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(v) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

/// Partial update of [`EntryFields`]; `None` leaves a field untouched
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    /// New status label
    pub status: Option<String>,
    /// New finished flag
    pub finished: Option<bool>,
    /// New unread count
    pub unread_count: Option<u32>,
    /// New last-message preview
    pub preview: Option<String>,
    /// New last-message author
    pub preview_author: Option<String>,
    /// New date label
    pub date_label: Option<String>,
}

impl EntryPatch {
    /// True when the patch carries no field at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An entry as it arrives from the wire, before the merge engine has
/// assigned its final position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEntry {
    /// Stable id
    pub id: EntryId,
    /// Server ordering key, if the server sent one
    pub sort_key: Option<SortKey>,
    /// Rendered content
    pub payload: Payload,
    /// Group label to show directly above this entry
    pub separator_label: Option<String>,
    /// Whether the view should focus this entry on first render
    pub focus_target: bool,
    /// Notification routing, for notification feeds
    pub section: Option<NotificationSection>,
    /// Initial display fields
    pub fields: EntryFields,
}

impl IncomingEntry {
    /// A bare entry with an id and payload
    pub fn new(id: impl Into<EntryId>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            sort_key: None,
            payload,
            separator_label: None,
            focus_target: false,
            section: None,
            fields: EntryFields::default(),
        }
    }

    /// Set the server ordering key
    pub fn with_sort_key(mut self, key: i64) -> Self {
        self.sort_key = Some(SortKey(key));
        self
    }

    /// Resolve into a placed entry with the given key
    pub fn into_entry(self, sort_key: SortKey) -> Entry {
        Entry {
            id: self.id,
            sort_key,
            payload: self.payload,
            separator_label: self.separator_label,
            is_boundary_focus_target: self.focus_target,
            section: self.section,
            fields: self.fields,
        }
    }
}

/// One placed feed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable id, unique within the feed
    pub id: EntryId,
    /// Ordering key; ties broken by `id`
    pub sort_key: SortKey,
    /// Rendered content
    pub payload: Payload,
    /// Group label shown directly above this entry
    pub separator_label: Option<String>,
    /// Entry the view should focus on first render
    pub is_boundary_focus_target: bool,
    /// Notification routing, for notification feeds
    pub section: Option<NotificationSection>,
    /// Display fields mutated by updates
    pub fields: EntryFields,
}

impl Entry {
    /// Total order of entries within a feed
    pub fn order(&self, other: &Self) -> Ordering {
        order_of(self.sort_key, &self.id, other.sort_key, &other.id)
    }
}

/// Order two `(sort_key, id)` pairs
pub(crate) fn order_of(a_key: SortKey, a_id: &EntryId, b_key: SortKey, b_id: &EntryId) -> Ordering {
    a_key.cmp(&b_key).then_with(|| a_id.cmp(b_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_accepts_strings_and_numbers() {
        let text: EntryId = serde_json::from_str("\"3f2a\"").unwrap();
        let number: EntryId = serde_json::from_str("42").unwrap();
        assert_eq!(text.as_str(), "3f2a");
        assert_eq!(number.as_str(), "42");
        assert_eq!(serde_json::to_string(&number).unwrap(), "\"42\"");
    }

    #[test]
    fn test_patch_application_is_idempotent() {
        let mut fields = EntryFields::default();
        let patch = EntryPatch {
            unread_count: Some(3),
            preview: Some("hello".into()),
            ..Default::default()
        };

        assert!(fields.apply(&patch));
        let once = fields.clone();
        assert!(!fields.apply(&patch));
        assert_eq!(fields, once);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut fields = EntryFields {
            status: Some("Pending".into()),
            ..Default::default()
        };
        assert!(EntryPatch::default().is_empty());
        assert!(!fields.apply(&EntryPatch::default()));
        assert_eq!(fields.status.as_deref(), Some("Pending"));
    }

    #[test]
    fn test_ties_broken_by_id() {
        let a = IncomingEntry::new("a", Payload::default()).into_entry(SortKey(5));
        let b = IncomingEntry::new("b", Payload::default()).into_entry(SortKey(5));
        let c = IncomingEntry::new("0", Payload::default()).into_entry(SortKey(6));
        assert_eq!(a.order(&b), Ordering::Less);
        assert_eq!(b.order(&c), Ordering::Less);
    }
}
