#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]
//! Merge scenarios driven through frame decoding, without any I/O

use feedsync_core::{
    decode_frame, EntryId, FeedKind, FeedModel, FeedViewState, LoadPhase, MergeEngine,
    NotificationSection, Page, ScrollDirective, StickPolicy, ViewOp, Viewport,
};
use feedsync_testkit::fixtures::{
    chat_create, chat_list_update, incoming, navbar, notification_new, notification_update,
    numbered_page, page_body,
};

fn live(engine: &MergeEngine, model: &mut FeedModel, kind: FeedKind, frame: serde_json::Value) -> Vec<ViewOp> {
    let event = decode_frame(kind, &frame.to_string()).unwrap().unwrap();
    engine.merge_event(model, event, Viewport::at_bottom()).ops
}

#[test]
fn empty_feed_reports_empty_state() {
    let engine = MergeEngine::for_kind(FeedKind::Chat);
    let mut model = FeedModel::new();
    model.begin_fetch();

    let page = Page::from_json(r#"{"has_next": false}"#).unwrap();
    let outcome = engine.merge_page(&mut model, page);

    assert!(model.is_empty());
    assert!(!model.has_more());
    assert_eq!(model.phase(), LoadPhase::Empty);
    assert!(outcome.ops.contains(&ViewOp::SetFeedState(FeedViewState::Empty)));
    assert_eq!(model.begin_fetch(), None);
}

#[test]
fn page_then_live_append() {
    let engine = MergeEngine::for_kind(FeedKind::Chat);
    let mut model = FeedModel::new();
    model.begin_fetch();

    let body = page_body(&(100..120).rev().collect::<Vec<_>>(), true);
    let outcome = engine.merge_page(&mut model, Page::from_json(&body).unwrap());
    assert_eq!(model.len(), 20);
    assert_eq!(model.cursor().page(), 2);
    assert!(model.has_more());
    assert_eq!(outcome.scroll, ScrollDirective::ToBottom);

    let ops = live(&engine, &mut model, FeedKind::Chat, chat_create("fresh", None));
    assert_eq!(model.len(), 21);
    assert_eq!(model.newest().unwrap().id.as_str(), "fresh");
    assert!(model.is_consistent());
    assert!(matches!(
        ops[0],
        ViewOp::AppendEntry {
            stick_to_bottom: true,
            ..
        }
    ));
    assert_eq!(model.cursor().page(), 2);
}

#[test]
fn live_then_page_with_same_id_keeps_one_copy() {
    let engine = MergeEngine::new(StickPolicy::Never);
    let mut model = FeedModel::new();
    model.begin_fetch();
    engine.merge_page(&mut model, numbered_page(10, 20, true));

    live(&engine, &mut model, FeedKind::Chat, chat_create("X", Some(25)));

    model.begin_fetch();
    let page = Page::new(vec![incoming("X", 25), incoming("m9", 9)], false);
    let outcome = engine.merge_page(&mut model, page);

    let copies = model
        .entries()
        .iter()
        .filter(|e| e.id.as_str() == "X")
        .count();
    assert_eq!(copies, 1);
    assert_eq!(model.len(), 12);
    assert_eq!(outcome.placed_ids(), vec![&EntryId::new("m9")]);
    assert_eq!(outcome.scroll, ScrollDirective::PreserveAnchor);
}

#[test]
fn page_overlapping_live_entries_is_placed_in_order() {
    let engine = MergeEngine::new(StickPolicy::Never);
    let mut model = FeedModel::new();
    live(&engine, &mut model, FeedKind::Chat, chat_create("m5", Some(5)));
    live(&engine, &mut model, FeedKind::Chat, chat_create("m9", Some(9)));

    model.begin_fetch();
    let outcome = engine.merge_page(&mut model, numbered_page(4, 11, false));

    let ids: Vec<_> = model.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["m4", "m5", "m6", "m7", "m8", "m9", "m10"]);
    assert!(outcome
        .ops
        .iter()
        .any(|op| matches!(op, ViewOp::InsertEntry { before, .. } if before.as_str() == "m9")));
    assert!(outcome
        .ops
        .iter()
        .any(|op| matches!(op, ViewOp::AppendEntry { entry, stick_to_bottom: false } if entry.id.as_str() == "m10")));
}

#[test]
fn chat_list_update_changes_fields_in_place() {
    let engine = MergeEngine::for_kind(FeedKind::ChatList);
    let mut model = FeedModel::new();
    model.begin_fetch();
    engine.merge_page(
        &mut model,
        Page::new(vec![incoming("c2", 2), incoming("c1", 1)], false),
    );

    let ops = live(&engine, &mut model, FeedKind::ChatList, chat_list_update("c1", 3, "hey"));
    assert_eq!(ops.len(), 1);
    let c1 = model.get(&EntryId::new("c1")).unwrap();
    assert_eq!(c1.fields.unread_count, Some(3));
    assert_eq!(c1.fields.preview.as_deref(), Some("hey"));
    assert_eq!(model.oldest().unwrap().id.as_str(), "c1");

    let ops = live(&engine, &mut model, FeedKind::ChatList, chat_list_update("c1", 3, "hey"));
    assert!(ops.is_empty());

    let ops = live(&engine, &mut model, FeedKind::ChatList, chat_list_update("c9", 1, "x"));
    assert!(ops.is_empty());
    assert_eq!(model.len(), 2);
}

#[test]
fn notification_new_and_update_share_an_id() {
    let engine = MergeEngine::for_kind(FeedKind::Notifications);
    let mut model = FeedModel::new();
    model.mark_loaded_without_history();

    live(&engine, &mut model, FeedKind::Notifications, notification_new(7, Some(3), false));
    live(&engine, &mut model, FeedKind::Notifications, notification_new(7, None, true));
    assert_eq!(model.len(), 2);

    let ops = live(
        &engine,
        &mut model,
        FeedKind::Notifications,
        notification_update(7, Some(3), "Accepted"),
    );
    assert_eq!(ops.len(), 1);
    let group = model.get(&EntryId::new("group-3-7")).unwrap();
    assert_eq!(group.fields.status.as_deref(), Some("Accepted"));
    assert_eq!(group.fields.finished, Some(true));
    let friend = model.get(&EntryId::new("friend-7")).unwrap();
    assert_eq!(friend.fields.status, None);
}

#[test]
fn first_notification_in_a_section_replaces_its_placeholder() {
    let engine = MergeEngine::for_kind(FeedKind::Notifications);
    let mut model = FeedModel::new();
    model.mark_loaded_without_history();
    let opened = |ops: &[ViewOp]| -> Vec<NotificationSection> {
        ops.iter()
            .filter_map(|op| match op {
                ViewOp::SetSectionState {
                    section,
                    state: FeedViewState::Populated,
                } => Some(*section),
                _ => None,
            })
            .collect()
    };

    let ops = live(&engine, &mut model, FeedKind::Notifications, notification_new(1, Some(3), false));
    assert_eq!(opened(&ops), [NotificationSection::GroupReceived]);

    let ops = live(&engine, &mut model, FeedKind::Notifications, notification_new(2, Some(4), false));
    assert!(opened(&ops).is_empty());

    let ops = live(&engine, &mut model, FeedKind::Notifications, notification_new(5, None, true));
    assert_eq!(opened(&ops), [NotificationSection::FriendSent]);
    assert!(model.has_section(NotificationSection::FriendSent));
    assert!(!model.has_section(NotificationSection::GroupSent));
}

#[test]
fn navbar_indicators_do_not_touch_entries() {
    let engine = MergeEngine::for_kind(FeedKind::Navbar);
    let mut model = FeedModel::new();
    let ops = live(
        &engine,
        &mut model,
        FeedKind::Navbar,
        navbar("navbar_groupchat_unviewed_messages", true),
    );
    assert_eq!(ops.len(), 1);
    assert!(model.is_empty());
    assert_eq!(model.view_state(), None);
}
