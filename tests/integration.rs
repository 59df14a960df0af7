//! Integration tests for the broadcast hub.

use newscast::{Hub, HubConfig, Item, ItemId, ItemInput, ItemStream, SessionState, StreamEvent};
use std::time::Duration;

const WAIT: Duration = Duration::from_millis(500);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn news(title: &str) -> ItemInput {
    ItemInput::new(title, format!("{} body", title), "World", "Newsdesk")
}

/// Receive `n` items, failing the test if any does not arrive in time.
fn take(stream: &mut ItemStream, n: usize) -> Vec<Item> {
    (0..n)
        .map(|_| {
            stream
                .recv_timeout(WAIT)
                .unwrap()
                .expect("item did not arrive in time")
        })
        .collect()
}

fn ids(items: &[Item]) -> Vec<u64> {
    items.iter().map(|i| i.id.0).collect()
}

// --- Realistic Workflow Tests ---

#[test]
fn test_breaking_news_scenario() {
    init_tracing();
    let hub = Hub::with_config(HubConfig::default().with_welcome_items()).unwrap();

    // A joins and gets the two seed items
    let mut a = hub.subscribe_to_items().unwrap();
    assert_eq!(ids(&take(&mut a, 2)), vec![1, 2]);
    assert_eq!(a.state(), SessionState::Live);

    // Breaking news reaches A live
    let breaking = hub.publish(news("Breaking News")).unwrap();
    assert_eq!(breaking.id, ItemId(3));
    assert_eq!(take(&mut a, 1)[0], breaking);

    // B joins and gets the full backlog immediately
    let mut b = hub.subscribe_to_items().unwrap();
    let backlog = take(&mut b, 3);
    assert_eq!(ids(&backlog), vec![1, 2, 3]);
    assert_eq!(backlog[2].title, "Breaking News");

    // Later publishes reach both, once
    hub.publish(news("Follow-up")).unwrap();
    assert_eq!(ids(&take(&mut a, 1)), vec![4]);
    assert_eq!(ids(&take(&mut b, 1)), vec![4]);
    assert_eq!(a.try_recv().unwrap(), None);
    assert_eq!(b.try_recv().unwrap(), None);

    assert_eq!(hub.current_subscriber_count(), 2);
}

#[test]
fn test_backlog_matches_publish_order() {
    init_tracing();
    let hub = Hub::new();

    let published: Vec<Item> = (0..20)
        .map(|i| hub.publish(news(&format!("story {}", i))).unwrap())
        .collect();

    let mut stream = hub.subscribe_to_items().unwrap();
    assert_eq!(stream.replay_remaining(), 20);
    assert_eq!(take(&mut stream, 20), published);
    assert_eq!(ids(&published), (1..=20).collect::<Vec<_>>());
}

#[test]
fn test_simultaneous_subscribers_get_independent_backlogs() {
    init_tracing();
    let hub = Hub::new();
    hub.publish(news("one")).unwrap();
    hub.publish(news("two")).unwrap();

    let mut a = hub.subscribe_to_items().unwrap();
    let mut b = hub.subscribe_to_items().unwrap();

    // A draining its backlog does not consume B's
    let from_a = take(&mut a, 2);
    let from_b = take(&mut b, 2);
    assert_eq!(from_a, from_b);

    hub.publish(news("three")).unwrap();
    assert_eq!(ids(&take(&mut a, 1)), vec![3]);
    assert_eq!(ids(&take(&mut b, 1)), vec![3]);
}

#[test]
fn test_count_stream_scenario() {
    init_tracing();
    let hub = Hub::new();

    let mut counts = hub.subscribe_to_count().unwrap();
    assert_eq!(counts.recv_timeout(WAIT).unwrap(), Some(0));

    let mut a = hub.subscribe_to_items().unwrap();
    assert_eq!(counts.recv_timeout(WAIT).unwrap(), Some(1));

    assert!(a.cancel());
    assert_eq!(counts.recv_timeout(WAIT).unwrap(), Some(0));

    assert_eq!(counts.try_recv().unwrap(), None);
}

#[test]
fn test_count_after_attach_and_cancel() {
    init_tracing();
    let hub = Hub::new();
    let mut counts = hub.subscribe_to_count().unwrap();

    let mut streams: Vec<_> = (0..5).map(|_| hub.subscribe_to_items().unwrap()).collect();
    assert_eq!(hub.current_subscriber_count(), 5);

    for stream in streams.iter_mut().take(3) {
        stream.cancel();
    }
    assert_eq!(hub.current_subscriber_count(), 2);

    let observed: Vec<u64> = std::iter::from_fn(|| counts.try_recv().unwrap()).collect();
    assert_eq!(observed, vec![0, 1, 2, 3, 4, 5, 4, 3, 2]);
}

#[test]
fn test_count_watcher_gets_fresh_initial_value() {
    init_tracing();
    let hub = Hub::new();
    let _a = hub.subscribe_to_items().unwrap();
    let _b = hub.subscribe_to_items().unwrap();

    let mut counts = hub.subscribe_to_count().unwrap();
    assert_eq!(counts.recv_timeout(WAIT).unwrap(), Some(2));
    assert_eq!(counts.try_recv().unwrap(), None);
}

#[test]
fn test_list_all_is_a_snapshot() {
    init_tracing();
    let hub = Hub::new();
    hub.publish(news("one")).unwrap();

    let listed = hub.list_all();
    hub.publish(news("two")).unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(hub.list_all().len(), 2);
}

#[test]
fn test_drive_into_event_envelopes() {
    init_tracing();
    let hub = Hub::with_config(HubConfig::default().with_welcome_items()).unwrap();
    let stream = hub.subscribe_to_items().unwrap();
    let handle = stream.cancel_handle();

    let mut events = Vec::new();
    let reason = stream.drive(|item| {
        events.push(StreamEvent::news(item).to_json()?);
        if events.len() == 2 {
            // Transport noticed the client went away
            handle.cancel();
        }
        Ok::<(), newscast::HubError>(())
    });

    assert_eq!(reason, newscast::TerminationReason::Cancelled);
    assert_eq!(events.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&events[0]).unwrap();
    assert_eq!(first["id"], "1");
    assert_eq!(first["event"], "news");
    assert_eq!(first["data"]["category"], "Technology");
    assert_eq!(hub.current_subscriber_count(), 0);
}
