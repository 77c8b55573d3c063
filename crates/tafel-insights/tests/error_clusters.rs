use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Map};
use time::macros::datetime;
use time::OffsetDateTime;

use tafel_insights::ErrorClusters;
use tafel_remote::EventLog;

fn error_event(kind: Option<&str>, time_stamp: OffsetDateTime) -> EventLog {
    let mut data = Map::new();
    if let Some(kind) = kind {
        data.insert("error".to_string(), json!(kind));
    }
    EventLog::error(data, time_stamp)
}

fn run_event(time_stamp: OffsetDateTime) -> EventLog {
    EventLog::run(Map::new(), time_stamp)
}

#[test]
fn series_total_matches_number_of_error_events_clustered() {
    let mut clusters = ErrorClusters::new();
    let t = datetime!(2016-06-01 10:00 UTC);

    clusters.cluster(&[
        error_event(Some("TypeError"), t),
        run_event(t),
        error_event(Some("NameError"), t),
    ]);
    clusters.cluster(&[error_event(Some("TypeError"), t)]);

    let series = clusters.to_series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name, "Fehlertypen");
    assert_eq!(series[0].total(), 3);
}

#[test]
fn change_fires_once_per_batch_with_errors_and_never_otherwise() {
    let mut clusters = ErrorClusters::new();
    let t = datetime!(2016-06-01 10:00 UTC);
    let changes = Arc::new(AtomicUsize::new(0));
    let changes_cb = changes.clone();
    let _sub = clusters.on_change(move || {
        changes_cb.fetch_add(1, Ordering::SeqCst);
    });

    clusters.cluster(&[
        error_event(Some("TypeError"), t),
        error_event(Some("NameError"), t),
        error_event(Some("TypeError"), t),
    ]);
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    clusters.cluster(&[run_event(t), run_event(t)]);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_error_type_counts_as_unknown() {
    let mut clusters = ErrorClusters::new();
    let t = datetime!(2016-06-01 10:00 UTC);
    clusters.cluster(&[error_event(None, t)]);
    assert_eq!(clusters.clusters().get("unknown"), Some(&1));
}

#[test]
fn series_keys_enumerate_in_first_seen_order() {
    let mut clusters = ErrorClusters::new();
    let t = datetime!(2016-06-01 10:00 UTC);
    clusters.cluster(&[
        error_event(Some("ZeroDivisionError"), t),
        error_event(Some("TypeError"), t),
        error_event(Some("ZeroDivisionError"), t),
        error_event(Some("AttributeError"), t),
    ]);

    let series = clusters.to_series();
    let keys: Vec<&str> = series[0].values.iter().map(|p| p.x.as_str()).collect();
    assert_eq!(keys, ["ZeroDivisionError", "TypeError", "AttributeError"]);
}

#[test]
fn to_series_is_cached_until_the_next_mutation() {
    let mut clusters = ErrorClusters::new();
    let t = datetime!(2016-06-01 10:00 UTC);
    clusters.cluster(&[error_event(Some("TypeError"), t)]);

    let first = clusters.to_series();
    let second = clusters.to_series();
    assert_eq!(first, second);

    clusters.cluster(&[error_event(Some("TypeError"), t)]);
    let third = clusters.to_series();
    assert_eq!(third[0].total(), 2);
}

#[test]
fn reset_clears_counts_and_notifies_unconditionally() {
    let mut clusters = ErrorClusters::new();
    let changes = Arc::new(AtomicUsize::new(0));
    let changes_cb = changes.clone();
    let _sub = clusters.on_change(move || {
        changes_cb.fetch_add(1, Ordering::SeqCst);
    });

    clusters.reset();
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    assert!(clusters.clusters().is_empty());
    assert_eq!(clusters.to_series()[0].values.len(), 0);
}

#[test]
fn empty_kind_on_wire_counts_as_unknown() {
    let mut clusters = ErrorClusters::new();
    let event: EventLog = serde_json::from_value(json!({
        "name": "error",
        "type": "",
        "embedId": "embed-1",
        "timeStamp": "2016-06-01T10:00:00Z",
    }))
    .unwrap();
    clusters.cluster(&[event]);
    assert_eq!(clusters.clusters().get("unknown"), Some(&1));
}
