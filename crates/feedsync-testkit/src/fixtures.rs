//! Entry, page and frame builders

use feedsync_core::{IncomingEntry, Page, Payload};
use serde_json::json;
use url::Url;

/// Keyed entry with id `id` and a small payload
pub fn incoming(id: &str, key: i64) -> IncomingEntry {
    IncomingEntry::new(id, Payload::new(format!("<li>{id}</li>"))).with_sort_key(key)
}

/// Id used by [`numbered_page`] for key `key`
pub fn message_id(key: i64) -> String {
    format!("m{key}")
}

/// Page holding keys `from..to`, newest first, ids from [`message_id`]
pub fn numbered_page(from: i64, to: i64, has_more: bool) -> Page {
    let entries = (from..to)
        .rev()
        .map(|key| incoming(&message_id(key), key))
        .collect();
    Page::new(entries, has_more)
}

/// History response body in wire format, newest first
pub fn page_body(keys: &[i64], has_next: bool) -> String {
    let list: Vec<_> = keys
        .iter()
        .map(|key| {
            json!({
                "id": message_id(*key),
                "sort_key": key,
                "template": format!("<li>{key}</li>"),
            })
        })
        .collect();
    json!({ "message_list": list, "has_next": has_next }).to_string()
}

/// Chat `create` frame
pub fn chat_create(id: &str, sort_key: Option<i64>) -> serde_json::Value {
    let mut frame = json!({
        "type": "create",
        "chat_id": "42",
        "chat_message_id": id,
        "chat_message_type": "T",
        "chat_message_is_author": false,
        "template": format!("<li>{id}</li>"),
    });
    if let Some(key) = sort_key {
        frame["sort_key"] = json!(key);
    }
    frame
}

/// Chat-list `update` frame carrying a new unread count and preview
pub fn chat_list_update(chat_id: &str, unread: u32, preview: &str) -> serde_json::Value {
    json!({
        "type": "update",
        "chat_id": chat_id,
        "template": null,
        "chat_message_content": preview,
        "chat_message_date": "12:00",
        "chat_unviewed_messages_count": unread,
        "chat_message_author": "sam",
    })
}

/// Notification `new` frame
pub fn notification_new(id: u64, group_id: Option<u64>, is_sent: bool) -> serde_json::Value {
    json!({
        "type": "new",
        "notification": { "id": id, "group": group_id },
        "group_id": group_id,
        "is_group": group_id.is_some(),
        "is_sent": is_sent,
        "template": format!("<div>{id}</div>"),
    })
}

/// Notification `update` frame
pub fn notification_update(id: u64, group_id: Option<u64>, status: &str) -> serde_json::Value {
    json!({
        "type": "update",
        "id": id,
        "group_id": group_id,
        "status": status,
        "finished": true,
    })
}

/// Navbar indicator frame
pub fn navbar(frame_type: &str, value: bool) -> serde_json::Value {
    json!({ "type": frame_type, "value": value })
}

/// Channel URL used by tests
pub fn test_endpoint(path: &str) -> Url {
    let base = Url::parse("ws://feeds.test/").unwrap_or_else(|e| panic!("static url: {e}"));
    base.join(path)
        .unwrap_or_else(|e| panic!("invalid test path {path}: {e}"))
}
