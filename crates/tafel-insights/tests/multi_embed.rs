use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use smol_str::SmolStr;
use time::macros::datetime;

use tafel_core::ManualClock;
use tafel_insights::MultiEmbedAnalytics;
use tafel_remote::test_support::{memory_pair, MemoryServer};
use tafel_remote::{ConnectConfig, RemoteDispatcher};

fn aggregate() -> (MultiEmbedAnalytics, RemoteDispatcher, MemoryServer) {
    let clock = Arc::new(ManualClock::with_epoch(datetime!(2016-06-03 09:00 UTC)));
    let dispatcher = RemoteDispatcher::new(
        ConnectConfig::new("ws://localhost:9000/events", "jwt-test"),
        clock.clone(),
    );
    let (transport, server) = memory_pair();
    dispatcher.connect_with(Box::new(transport));
    let multi = MultiEmbedAnalytics::new(
        vec![SmolStr::new("E1"), SmolStr::new("E2")],
        dispatcher.clone(),
        clock,
    );
    (multi, dispatcher, server)
}

#[test]
fn init_creates_one_session_per_embed_and_kicks_both_off() {
    let (multi, _dispatcher, server) = aggregate();
    multi.init();

    let entries = multi.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "E1");
    assert_eq!(entries[1].0, "E2");

    let frames = server.sent_json();
    let mut get_events = 0;
    let mut subscribes = 0;
    for frame in &frames {
        match frame["action"].as_str() {
            Some("get-events") => get_events += 1,
            Some("subscribe") => subscribes += 1,
            _ => {}
        }
    }
    assert_eq!(get_events, 2);
    assert_eq!(subscribes, 2);
}

#[test]
fn child_changes_bubble_into_one_aggregate_change() {
    let (multi, dispatcher, server) = aggregate();
    multi.init();
    server.sent();

    let changes = Arc::new(AtomicUsize::new(0));
    let changes_cb = changes.clone();
    let _sub = multi.on_change(move || {
        changes_cb.fetch_add(1, Ordering::SeqCst);
    });

    server.push_event(
        "ide-event",
        json!({
            "name": "run",
            "embedId": "E2",
            "timeStamp": "2016-06-01T10:00:00Z",
        }),
    );
    dispatcher.pump();

    assert_eq!(changes.load(Ordering::SeqCst), 2, "both sessions apply the batch");
    assert_eq!(multi.entry("E2").unwrap().event_count(), 1);
    assert_eq!(multi.entry("E1").unwrap().event_count(), 0);
}

#[test]
fn dispose_cascades_and_closes_the_connection() {
    let (multi, dispatcher, server) = aggregate();
    multi.init();

    // Confirm both subscriptions so dispose must unsubscribe them.
    let frames = server.sent_json();
    let ids: Vec<u64> = frames
        .iter()
        .filter(|frame| frame["action"] == "subscribe")
        .filter_map(|frame| frame.get("id").and_then(Value::as_u64))
        .collect();
    for id in ids {
        server.respond(id, json!({}));
    }
    dispatcher.pump();

    multi.dispose();
    let frames = server.sent_json();
    let unsubscribed: Vec<&Value> = frames
        .iter()
        .filter(|frame| frame["action"] == "unsubscribe")
        .collect();
    assert_eq!(unsubscribed.len(), 2);
    assert!(!dispatcher.is_connected());
    assert!(multi.entries().is_empty());
}
