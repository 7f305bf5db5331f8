//! Unit tests for derivation, the bus, and the subscription gate.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use herald_types::{
    AuthContext, Change, CommentSnapshot, EntitySnapshot, EventKind, LifecycleEvent,
    PostSnapshot, Topic,
};

use crate::{derive_comment, derive_post, open_subscription, Bus, GateError, ParentLookup};

fn post(title: &str, published: bool) -> PostSnapshot {
    PostSnapshot {
        id: 1,
        title: title.to_string(),
        body: format!("{title} body"),
        published,
        author_id: 10,
        created_at: "2024-01-01 00:00:00".to_string(),
        updated_at: "2024-01-01 00:00:00".to_string(),
    }
}

fn comment(text: &str) -> CommentSnapshot {
    CommentSnapshot {
        id: 5,
        text: text.to_string(),
        author_id: 10,
        post_id: 1,
        created_at: "2024-01-01 00:00:00".to_string(),
    }
}

fn post_event(seq: usize) -> LifecycleEvent {
    LifecycleEvent::new(Topic::Posts, EventKind::Updated, post(&format!("v{seq}"), true))
}

fn title_of(event: &LifecycleEvent) -> &str {
    match event.snapshot() {
        EntitySnapshot::Post(p) => &p.title,
        EntitySnapshot::Comment(c) => &c.text,
    }
}

// ── derivation ───────────────────────────────────────────────────────

#[test]
fn hidden_creation_is_silent() {
    assert_eq!(derive_post(Change::created(post("draft", false))), None);
}

#[test]
fn visible_creation_is_created_with_after() {
    let event = derive_post(Change::created(post("live", true))).expect("event");
    assert_eq!(event.kind(), EventKind::Created);
    assert_eq!(event.topic(), Topic::Posts);
    assert_eq!(event.snapshot(), &EntitySnapshot::Post(post("live", true)));
}

#[test]
fn hidden_to_hidden_is_silent() {
    let change = Change::updated(post("a", false), post("b", false));
    assert_eq!(derive_post(change), None);
}

#[test]
fn first_reveal_is_created_with_after() {
    let change = Change::updated(post("draft", false), post("final", true));
    let event = derive_post(change).expect("event");
    assert_eq!(event.kind(), EventKind::Created);
    assert_eq!(title_of(&event), "final");
}

#[test]
fn visible_to_visible_is_updated_with_after() {
    let change = Change::updated(post("old", true), post("new", true));
    let event = derive_post(change).expect("event");
    assert_eq!(event.kind(), EventKind::Updated);
    assert_eq!(title_of(&event), "new");
}

#[test]
fn hiding_is_deleted_with_before() {
    let change = Change::updated(post("seen", true), post("hidden edit", false));
    let event = derive_post(change).expect("event");
    assert_eq!(event.kind(), EventKind::Deleted);
    assert_eq!(event.snapshot(), &EntitySnapshot::Post(post("seen", true)));
}

#[test]
fn hidden_deletion_is_silent() {
    assert_eq!(derive_post(Change::deleted(post("draft", false))), None);
}

#[test]
fn visible_deletion_is_deleted_with_before() {
    let event = derive_post(Change::deleted(post("gone", true))).expect("event");
    assert_eq!(event.kind(), EventKind::Deleted);
    assert_eq!(title_of(&event), "gone");
}

#[test]
fn empty_change_is_silent() {
    let change: Change<PostSnapshot> = Change {
        before: None,
        after: None,
    };
    assert_eq!(derive_post(change), None);
    let change: Change<CommentSnapshot> = Change {
        before: None,
        after: None,
    };
    assert_eq!(derive_comment(change, true), None);
}

#[test]
fn comment_events_follow_parent_visibility() {
    let created = derive_comment(Change::created(comment("hi")), true).expect("event");
    assert_eq!(created.kind(), EventKind::Created);
    assert_eq!(created.topic(), Topic::Comments(1));

    let updated =
        derive_comment(Change::updated(comment("hi"), comment("hello")), true).expect("event");
    assert_eq!(updated.kind(), EventKind::Updated);
    assert_eq!(title_of(&updated), "hello");

    let deleted = derive_comment(Change::deleted(comment("bye")), true).expect("event");
    assert_eq!(deleted.kind(), EventKind::Deleted);
    assert_eq!(title_of(&deleted), "bye");

    assert_eq!(derive_comment(Change::created(comment("x")), false), None);
    assert_eq!(
        derive_comment(Change::updated(comment("x"), comment("y")), false),
        None
    );
    assert_eq!(derive_comment(Change::deleted(comment("x")), false), None);
}

// ── bus ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscriber_sees_events_in_publish_order() {
    let bus = Bus::new();
    let mut sub = bus.subscribe(Topic::Posts);

    for seq in 0..50 {
        assert_eq!(bus.publish(post_event(seq)), 1);
    }

    for seq in 0..50 {
        let event = sub.recv().await.expect("event");
        assert_eq!(title_of(&event), format!("v{seq}"));
    }
    assert!(sub.try_recv().is_none(), "no duplicates");
}

#[tokio::test]
async fn late_subscriber_gets_no_backlog() {
    let bus = Bus::new();
    let _early = bus.subscribe(Topic::Posts);
    bus.publish(post_event(0));

    let mut late = bus.subscribe(Topic::Posts);
    assert!(late.try_recv().is_none());

    bus.publish(post_event(1));
    let event = late.recv().await.expect("event");
    assert_eq!(title_of(&event), "v1");
}

#[test]
fn publish_without_subscribers_is_a_no_op() {
    let bus = Bus::new();
    assert_eq!(bus.publish(post_event(0)), 0);
    assert_eq!(bus.topic_count(), 0);
    assert_eq!(bus.events_published(), 1);
}

#[test]
fn topics_are_isolated() {
    let bus = Bus::new();
    let mut posts = bus.subscribe(Topic::Posts);
    let mut comments = bus.subscribe(Topic::Comments(1));

    bus.publish(LifecycleEvent::new(
        Topic::Comments(1),
        EventKind::Created,
        comment("c"),
    ));

    assert!(posts.try_recv().is_none());
    assert_eq!(comments.try_recv().map(|e| e.kind()), Some(EventKind::Created));
}

#[test]
fn unsubscribe_decrements_count_and_stops_delivery() {
    let bus = Bus::new();
    let mut a = bus.subscribe(Topic::Posts);
    let mut b = bus.subscribe(Topic::Posts);
    assert_eq!(bus.subscriber_count(Topic::Posts), 2);

    bus.unsubscribe(&mut a);
    assert_eq!(bus.subscriber_count(Topic::Posts), 1);
    assert!(a.is_closed());

    assert_eq!(bus.publish(post_event(0)), 1);
    assert!(a.try_recv().is_none());
    assert!(b.try_recv().is_some());
}

#[test]
fn close_is_idempotent() {
    let bus = Bus::new();
    let mut a = bus.subscribe(Topic::Posts);
    let _b = bus.subscribe(Topic::Posts);

    a.close();
    a.close();
    bus.unsubscribe(&mut a);

    assert_eq!(bus.subscriber_count(Topic::Posts), 1);
}

#[test]
fn close_discards_queued_events() {
    let bus = Bus::new();
    let mut sub = bus.subscribe(Topic::Posts);
    bus.publish(post_event(0));

    sub.close();
    assert!(sub.try_recv().is_none());
}

#[test]
fn dropping_a_subscription_unregisters_it() {
    let bus = Bus::new();
    {
        let _sub = bus.subscribe(Topic::Comments(3));
        assert_eq!(bus.subscriber_count(Topic::Comments(3)), 1);
        assert_eq!(bus.topic_count(), 1);
    }
    assert_eq!(bus.subscriber_count(Topic::Comments(3)), 0);
    assert_eq!(bus.topic_count(), 0, "empty topics disappear");
}

#[tokio::test]
async fn stream_ends_after_close() {
    let bus = Bus::new();
    let mut sub = bus.subscribe(Topic::Posts);
    bus.publish(post_event(0));

    let first = sub.next().await.expect("event");
    assert_eq!(title_of(&first), "v0");

    sub.close();
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn every_event_is_shared_not_copied_per_subscriber() {
    let bus = Bus::new();
    let mut a = bus.subscribe(Topic::Posts);
    let mut b = bus.subscribe(Topic::Posts);
    bus.publish(post_event(0));

    let ea = a.recv().await.expect("event");
    let eb = b.recv().await.expect("event");
    assert!(Arc::ptr_eq(&ea, &eb));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_are_seen_in_one_order() {
    let bus = Bus::new();
    let mut a = bus.subscribe(Topic::Posts);
    let mut b = bus.subscribe(Topic::Posts);

    let mut handles = Vec::new();
    for worker in 0..4 {
        let bus = bus.clone();
        handles.push(tokio::spawn(async move {
            for seq in 0..100 {
                bus.publish(post_event(worker * 1000 + seq));
            }
        }));
    }
    for handle in handles {
        handle.await.expect("publisher task");
    }

    let mut seen_a = Vec::new();
    while let Some(event) = a.try_recv() {
        seen_a.push(title_of(&event).to_string());
    }
    let mut seen_b = Vec::new();
    while let Some(event) = b.try_recv() {
        seen_b.push(title_of(&event).to_string());
    }

    assert_eq!(seen_a.len(), 400);
    assert_eq!(seen_a, seen_b, "subscribers agree on relative order");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn churn_during_publish_never_leaks_channels() {
    let bus = Bus::new();
    let _anchor = bus.subscribe(Topic::Posts);

    let publisher = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for seq in 0..500 {
                bus.publish(post_event(seq));
                tokio::task::yield_now().await;
            }
        })
    };

    let churner = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                let mut sub = bus.subscribe(Topic::Posts);
                tokio::task::yield_now().await;
                sub.close();
                assert!(sub.try_recv().is_none());
            }
        })
    };

    publisher.await.expect("publisher");
    churner.await.expect("churner");
    assert_eq!(bus.subscriber_count(Topic::Posts), 1);
}

// ── gate ─────────────────────────────────────────────────────────────

struct FakeStore {
    posts: HashMap<i64, PostSnapshot>,
}

impl ParentLookup for FakeStore {
    type Parent = PostSnapshot;
    type Error = String;

    fn resolve(&self, parent_id: i64) -> Result<Option<PostSnapshot>, String> {
        if parent_id < 0 {
            return Err("store offline".to_string());
        }
        Ok(self.posts.get(&parent_id).cloned())
    }
}

fn store() -> FakeStore {
    let mut posts = HashMap::new();
    posts.insert(1, post("visible", true));
    posts.insert(2, PostSnapshot {
        id: 2,
        ..post("hidden", false)
    });
    FakeStore { posts }
}

#[test]
fn gate_refuses_missing_parent_without_allocating() {
    let bus = Bus::new();
    let err = open_subscription(&bus, &store(), Topic::Comments(99), AuthContext::User(1))
        .expect_err("missing parent");
    assert!(matches!(err, GateError::NotFound));
    assert_eq!(bus.subscriber_count(Topic::Comments(99)), 0);
    assert_eq!(bus.topic_count(), 0);
}

#[test]
fn gate_treats_hidden_parent_as_missing() {
    let bus = Bus::new();
    let err = open_subscription(&bus, &store(), Topic::Comments(2), AuthContext::Anonymous)
        .expect_err("hidden parent");
    assert!(matches!(err, GateError::NotFound));
    assert_eq!(err.to_string(), "subscription target not found");
    assert_eq!(bus.subscriber_count(Topic::Comments(2)), 0);
}

#[test]
fn gate_admits_visible_parent_and_unscoped_topic() {
    let bus = Bus::new();
    let scoped = open_subscription(&bus, &store(), Topic::Comments(1), AuthContext::Anonymous)
        .expect("visible parent");
    assert_eq!(scoped.topic(), Topic::Comments(1));
    assert_eq!(bus.subscriber_count(Topic::Comments(1)), 1);

    let _all = open_subscription(&bus, &store(), Topic::Posts, AuthContext::Anonymous)
        .expect("unscoped topic");
    assert_eq!(bus.subscriber_count(Topic::Posts), 1);
}

#[test]
fn gate_surfaces_lookup_failures() {
    let bus = Bus::new();
    let err = open_subscription(&bus, &store(), Topic::Comments(-1), AuthContext::Anonymous)
        .expect_err("lookup error");
    match err {
        GateError::Lookup(msg) => assert_eq!(msg, "store offline"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(bus.topic_count(), 0);
}
