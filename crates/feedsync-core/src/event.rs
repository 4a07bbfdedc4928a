//! Inbound channel frames
//!
//! Every text frame is a JSON object with a `type` discriminator and
//! variant-specific fields. Frames are decoded per feed kind into a
//! [`FeedEvent`]; unknown `type` values decode to `None`.

use crate::entry::{EntryFields, EntryId, EntryPatch, IncomingEntry, Payload, SortKey};
use crate::error::FeedResult;
use crate::route::{notification_entry_id, FeedKind, IndicatorKey, NotificationSection};
use serde::Deserialize;
use std::fmt;

/// Discriminant of a [`FeedEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new entry (`create`)
    Create,
    /// In-place change of an existing entry (`update`)
    Update,
    /// Notification arrival (`new`)
    NewItem,
    /// Navbar indicator toggle
    Indicator,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::NewItem => "new",
            EventKind::Indicator => "indicator",
        })
    }
}

/// Typed inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// New chat message or new chat in the chat list
    Create(IncomingEntry),
    /// Routed notification arrival
    NewItem(IncomingEntry),
    /// Status/count change of an existing entry
    Update {
        /// Entry to change
        id: EntryId,
        /// Fields to set
        patch: EntryPatch,
    },
    /// Navbar indicator change
    Indicator {
        /// Which indicator
        key: IndicatorKey,
        /// Whether it should be highlighted
        active: bool,
    },
}

impl FeedEvent {
    /// Discriminant of this event
    pub fn kind(&self) -> EventKind {
        match self {
            FeedEvent::Create(_) => EventKind::Create,
            FeedEvent::NewItem(_) => EventKind::NewItem,
            FeedEvent::Update { .. } => EventKind::Update,
            FeedEvent::Indicator { .. } => EventKind::Indicator,
        }
    }
}

/// Decode one text frame for the given feed kind
///
/// Returns `Ok(None)` for well-formed frames of a type this feed does not
/// handle, and an error for frames that are not valid JSON objects of the
/// expected shape.
pub fn decode_frame(kind: FeedKind, text: &str) -> FeedResult<Option<FeedEvent>> {
    match kind {
        FeedKind::Chat => Ok(serde_json::from_str::<ChatFrame>(text)?.into_event()),
        FeedKind::ChatList => Ok(serde_json::from_str::<ChatListFrame>(text)?.into_event()),
        FeedKind::Notifications => {
            Ok(serde_json::from_str::<NotificationFrame>(text)?.into_event())
        }
        FeedKind::Navbar => Ok(serde_json::from_str::<NavbarFrame>(text)?.into_event()),
    }
}

fn payload(template: Option<String>) -> Payload {
    Payload::new(template.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatFrame {
    Create {
        chat_message_id: EntryId,
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        sort_key: Option<i64>,
    },
    #[serde(other)]
    Other,
}

impl ChatFrame {
    fn into_event(self) -> Option<FeedEvent> {
        match self {
            ChatFrame::Create {
                chat_message_id,
                template,
                sort_key,
            } => {
                let mut entry = IncomingEntry::new(chat_message_id, payload(template));
                entry.sort_key = sort_key.map(SortKey);
                Some(FeedEvent::Create(entry))
            }
            ChatFrame::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatListFrame {
    Create {
        chat_id: EntryId,
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        sort_key: Option<i64>,
        #[serde(default)]
        chat_message_content: Option<String>,
        #[serde(default)]
        chat_message_date: Option<String>,
        #[serde(default)]
        chat_unviewed_messages_count: Option<u32>,
        #[serde(default)]
        chat_message_author: Option<String>,
    },
    Update {
        chat_id: EntryId,
        #[serde(default)]
        chat_message_content: Option<String>,
        #[serde(default)]
        chat_message_date: Option<String>,
        #[serde(default)]
        chat_unviewed_messages_count: Option<u32>,
        #[serde(default)]
        chat_message_author: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl ChatListFrame {
    fn into_event(self) -> Option<FeedEvent> {
        match self {
            ChatListFrame::Create {
                chat_id,
                template,
                sort_key,
                chat_message_content,
                chat_message_date,
                chat_unviewed_messages_count,
                chat_message_author,
            } => {
                let mut entry = IncomingEntry::new(chat_id, payload(template));
                entry.sort_key = sort_key.map(SortKey);
                entry.fields = EntryFields {
                    preview: chat_message_content,
                    date_label: chat_message_date,
                    unread_count: chat_unviewed_messages_count,
                    preview_author: chat_message_author,
                    ..EntryFields::default()
                };
                Some(FeedEvent::Create(entry))
            }
            ChatListFrame::Update {
                chat_id,
                chat_message_content,
                chat_message_date,
                chat_unviewed_messages_count,
                chat_message_author,
            } => Some(FeedEvent::Update {
                id: chat_id,
                patch: EntryPatch {
                    preview: chat_message_content,
                    date_label: chat_message_date,
                    unread_count: chat_unviewed_messages_count,
                    preview_author: chat_message_author,
                    ..EntryPatch::default()
                },
            }),
            ChatListFrame::Other => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NotificationBody {
    #[serde(default)]
    id: Option<EntryId>,
    #[serde(default)]
    group: Option<EntryId>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NotificationFrame {
    New {
        #[serde(default)]
        id: Option<EntryId>,
        #[serde(default)]
        group_id: Option<EntryId>,
        #[serde(default)]
        notification: Option<NotificationBody>,
        #[serde(default)]
        is_group: bool,
        #[serde(default)]
        is_sent: bool,
        #[serde(default)]
        template: Option<String>,
        #[serde(default)]
        sort_key: Option<i64>,
    },
    Update {
        id: EntryId,
        #[serde(default)]
        group_id: Option<EntryId>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        finished: Option<bool>,
    },
    #[serde(other)]
    Other,
}

impl NotificationFrame {
    fn into_event(self) -> Option<FeedEvent> {
        match self {
            NotificationFrame::New {
                id,
                group_id,
                notification,
                is_group,
                is_sent,
                template,
                sort_key,
            } => {
                let body = notification.unwrap_or_default();
                let id = id.or(body.id)?;
                let section = NotificationSection::route(is_group, is_sent);
                let group_id = if section.is_group() {
                    group_id.or(body.group)
                } else {
                    None
                };

                let mut entry = IncomingEntry::new(
                    notification_entry_id(group_id.as_ref(), &id),
                    payload(template),
                );
                entry.sort_key = sort_key.map(SortKey);
                entry.section = Some(section);
                Some(FeedEvent::NewItem(entry))
            }
            NotificationFrame::Update {
                id,
                group_id,
                status,
                finished,
            } => Some(FeedEvent::Update {
                id: notification_entry_id(group_id.as_ref(), &id),
                patch: EntryPatch {
                    status,
                    finished,
                    ..EntryPatch::default()
                },
            }),
            NotificationFrame::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NavbarFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    value: bool,
}

impl NavbarFrame {
    fn into_event(self) -> Option<FeedEvent> {
        IndicatorKey::from_frame_type(&self.frame_type).map(|key| FeedEvent::Indicator {
            key,
            active: self.value,
        })
    }
}
