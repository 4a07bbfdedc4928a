//! Feed kinds and closed routing enums
//!
//! Replaces string-keyed lookups (element ids composed from flags) with
//! small enums and total mapping functions.

use crate::entry::EntryId;
use crate::error::{FeedError, FeedResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The feed variants served by one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// Aggregate unread/pending indicators shown in the navigation bar
    Navbar,
    /// Message stream of a single chat
    Chat,
    /// List of chats with last-message previews
    ChatList,
    /// Friendship and group requests
    Notifications,
}

impl FeedKind {
    /// Channel path for this kind; chat feeds need the chat id
    pub fn channel_path(self, chat_id: Option<&str>) -> FeedResult<String> {
        match self {
            FeedKind::Navbar => Ok("/ws/navbar/".to_string()),
            FeedKind::ChatList => Ok("/ws/chats/".to_string()),
            FeedKind::Notifications => Ok("/ws/notification_updates/".to_string()),
            FeedKind::Chat => match chat_id {
                Some(id) if !id.is_empty() => Ok(format!("/ws/chat/{id}/")),
                _ => Err(FeedError::invalid("chat feeds need a chat id")),
            },
        }
    }

    /// Whether this kind carries entries at all (the navbar only toggles indicators)
    pub fn has_entries(self) -> bool {
        !matches!(self, FeedKind::Navbar)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedKind::Navbar => "navbar",
            FeedKind::Chat => "chat",
            FeedKind::ChatList => "chat-list",
            FeedKind::Notifications => "notifications",
        })
    }
}

/// Box a notification is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationSection {
    /// Group request sent by the viewer
    GroupSent,
    /// Group request received by the viewer
    GroupReceived,
    /// Friendship request sent by the viewer
    FriendSent,
    /// Friendship request received by the viewer
    FriendReceived,
}

impl NotificationSection {
    /// Total mapping from the routing flags
    pub fn route(is_group: bool, is_sent: bool) -> Self {
        match (is_group, is_sent) {
            (true, true) => Self::GroupSent,
            (true, false) => Self::GroupReceived,
            (false, true) => Self::FriendSent,
            (false, false) => Self::FriendReceived,
        }
    }

    /// Whether this section holds group requests
    pub fn is_group(self) -> bool {
        matches!(self, Self::GroupSent | Self::GroupReceived)
    }

    /// Render target key of the section container
    pub fn element_key(self) -> &'static str {
        match self {
            Self::GroupSent => "group-send-notifications",
            Self::GroupReceived => "group-received-notifications",
            Self::FriendSent => "friend-send-notifications",
            Self::FriendReceived => "friend-received-notifications",
        }
    }
}

/// Compose the feed-unique id of a notification from its routing fields
///
/// Group and friendship requests live in separate id spaces on the server,
/// so the group id (when present) is part of the key.
pub fn notification_entry_id(group_id: Option<&EntryId>, id: &EntryId) -> EntryId {
    match group_id {
        Some(group) => EntryId::new(format!("group-{group}-{id}")),
        None => EntryId::new(format!("friend-{id}")),
    }
}

/// Navigation-bar indicator toggled by the navbar channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicatorKey {
    /// Unread direct-chat messages
    Chats,
    /// Pending notifications
    Notifications,
    /// Unread group-chat messages
    Groups,
}

impl IndicatorKey {
    /// Map a navbar frame type to its indicator
    pub fn from_frame_type(frame_type: &str) -> Option<Self> {
        match frame_type {
            "navbar_chat_unviewed_messages" => Some(Self::Chats),
            "navbar_notification_pending_notifications" => Some(Self::Notifications),
            "navbar_groupchat_unviewed_messages" => Some(Self::Groups),
            _ => None,
        }
    }

    /// Render target key of the indicator
    pub fn element_key(self) -> &'static str {
        match self {
            Self::Chats => "nav-chats",
            Self::Notifications => "nav-notifications",
            Self::Groups => "nav-group",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_routing_is_total() {
        let all = [
            (true, true, NotificationSection::GroupSent),
            (true, false, NotificationSection::GroupReceived),
            (false, true, NotificationSection::FriendSent),
            (false, false, NotificationSection::FriendReceived),
        ];
        for (is_group, is_sent, expected) in all {
            let section = NotificationSection::route(is_group, is_sent);
            assert_eq!(section, expected);
            assert_eq!(section.is_group(), is_group);
        }
    }

    #[test]
    fn test_channel_paths() {
        assert_eq!(FeedKind::Navbar.channel_path(None).unwrap(), "/ws/navbar/");
        assert_eq!(FeedKind::Chat.channel_path(Some("c1")).unwrap(), "/ws/chat/c1/");
        assert!(FeedKind::Chat.channel_path(None).is_err());
        assert!(FeedKind::Chat.channel_path(Some("")).is_err());
    }

    #[test]
    fn test_notification_ids_are_namespaced() {
        let id = EntryId::new("7");
        let group = EntryId::new("3");
        assert_eq!(notification_entry_id(Some(&group), &id).as_str(), "group-3-7");
        assert_eq!(notification_entry_id(None, &id).as_str(), "friend-7");
    }

    #[test]
    fn test_indicator_keys() {
        assert_eq!(
            IndicatorKey::from_frame_type("navbar_groupchat_unviewed_messages"),
            Some(IndicatorKey::Groups)
        );
        assert_eq!(IndicatorKey::from_frame_type("unknown"), None);
        assert_eq!(IndicatorKey::Chats.element_key(), "nav-chats");
    }
}
