//! Per-embed analytics session.
//!
//! One [`EmbedAnalytics`] observes a single embed: it fetches the stored
//! event history, subscribes to live `ide-event` pushes, and keeps the
//! derived error/date clusters current. The full event history is retained
//! in memory for the life of the session so that changing the cluster
//! bounds or resolution can rebucket everything.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use smol_str::SmolStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use tafel_core::{ChangeNotifier, Clock, Subscription};
use tafel_remote::{
    ActionContext, EventLog, RemoteAction, RemoteActionKind, RemoteDispatcher, RemoteEventType,
};

use crate::date_clusters::{ClusterResolution, DateClass, DateClusterMaps};
use crate::error_clusters::ErrorClusters;
use crate::series::{Series, SeriesPoint};

/// Fixed display order of the date-cluster series: German display name
/// plus the event class it renders.
pub const DATE_SERIES: [(&str, DateClass); 5] = [
    ("Ausführungen", DateClass::Run),
    ("Fehler", DateClass::Error),
    ("Probleme", DateClass::Failure),
    ("Testversuche", DateClass::Test),
    ("Sonstige", DateClass::Rest),
];

/// Lifecycle of the live-event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum SubscriptionState {
    #[default]
    Unsubscribed,
    Subscribing,
    Subscribed,
}

struct EmbedInner {
    id: SmolStr,
    dispatcher: RemoteDispatcher,
    clock: Arc<dyn Clock>,
    errors: Vec<EventLog>,
    events: Vec<EventLog>,
    date_maps: DateClusterMaps,
    error_clusters: ErrorClusters,
    resolution: ClusterResolution,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
    subscription: SubscriptionState,
    socket_listener: Option<Subscription>,
    changed: ChangeNotifier,
}

/// Analytics session for one embed.
#[derive(Clone)]
pub struct EmbedAnalytics {
    inner: Arc<Mutex<EmbedInner>>,
}

impl EmbedAnalytics {
    /// Create the session for `embed_id` on the given connection.
    #[must_use]
    pub fn new(
        embed_id: impl Into<SmolStr>,
        dispatcher: RemoteDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmbedInner {
                id: embed_id.into(),
                dispatcher,
                clock,
                errors: Vec::new(),
                events: Vec::new(),
                date_maps: DateClusterMaps::new(),
                error_clusters: ErrorClusters::new(),
                resolution: ClusterResolution::Day,
                start: None,
                end: None,
                subscription: SubscriptionState::default(),
                socket_listener: None,
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// The observed embed id.
    #[must_use]
    pub fn id(&self) -> SmolStr {
        self.lock().id.clone()
    }

    /// Register a change listener for any derived-data update.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Current subscription lifecycle state.
    #[must_use]
    pub fn subscription_state(&self) -> SubscriptionState {
        self.lock().subscription
    }

    /// Whether the live subscription is established.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.lock().subscription == SubscriptionState::Subscribed
    }

    /// Fetch the stored event history for this embed.
    pub fn get_events(&self) {
        let (dispatcher, embed_id) = {
            let inner = self.lock();
            (inner.dispatcher.clone(), inner.id.clone())
        };
        let session = self.clone();
        let mut action = RemoteAction::new(RemoteActionKind::GetEvents, Map::new()).on_response(
            move |response| {
                if let Some(error) = response_error(response) {
                    warn!(error = %error, "get-events rejected");
                    return;
                }
                let events = parse_events(response.get("events"));
                session.on_events(&events, false);
            },
        );
        action.set_context(ActionContext::for_embed(embed_id));
        if let Err(err) = dispatcher.send_action(action, true) {
            warn!(error = %err, "get-events skipped");
        }
    }

    /// Subscribe to live events for this embed. Idempotent: re-entry while
    /// subscribing or subscribed does nothing.
    pub fn subscribe_to_events(&self) {
        let (dispatcher, embed_id) = {
            let mut inner = self.lock();
            if inner.subscription != SubscriptionState::Unsubscribed {
                return;
            }
            inner.subscription = SubscriptionState::Subscribing;
            (inner.dispatcher.clone(), inner.id.clone())
        };

        let session = self.clone();
        let listener = dispatcher.add_socket_event_listener(RemoteEventType::IdeEvent, {
            let session = session.clone();
            move |payload| {
                let events = parse_events(Some(payload));
                debug!(count = events.len(), "received ide-event");
                session.on_events(&events, false);
            }
        });
        self.lock().socket_listener = Some(listener);

        let confirm = self.clone();
        let mut action = RemoteAction::new(RemoteActionKind::Subscribe, Map::new()).on_response(
            move |response| {
                let mut inner = confirm.lock();
                if let Some(error) = response_error(response) {
                    warn!(error = %error, "subscribe rejected");
                    inner.subscription = SubscriptionState::Unsubscribed;
                    inner.socket_listener = None;
                } else {
                    inner.subscription = SubscriptionState::Subscribed;
                }
            },
        );
        action.set_context(ActionContext::for_embed(embed_id));
        if let Err(err) = dispatcher.send_action(action, true) {
            warn!(error = %err, "subscribe skipped");
            let mut inner = self.lock();
            inner.subscription = SubscriptionState::Unsubscribed;
            inner.socket_listener = None;
        }
    }

    /// Apply a batch of delivered events. Events for other embeds are
    /// dropped (the transport may deliver events for multiple embeds over
    /// a shared channel). With `reset`, all prior state is discarded
    /// before the batch is applied. Emits exactly one change.
    pub fn on_events(&self, events: &[EventLog], reset: bool) {
        {
            let mut inner = self.lock();
            if reset {
                inner.errors.clear();
                inner.events.clear();
                inner.date_maps = DateClusterMaps::new();
                inner.error_clusters.reset();
            }

            let matching: Vec<EventLog> = events
                .iter()
                .filter(|event| event.embed_id == inner.id)
                .cloned()
                .collect();

            let new_errors: Vec<EventLog> = matching
                .iter()
                .filter(|event| event.is_error())
                .cloned()
                .collect();
            if !new_errors.is_empty() {
                inner.error_clusters.cluster(&new_errors);
            }

            let (resolution, start, end) = (inner.resolution, inner.start, inner.end);
            for event in &matching {
                inner
                    .date_maps
                    .cluster_event(event, resolution, start, end);
                if event.is_error() {
                    inner.errors.push(event.clone());
                } else {
                    inner.events.push(event.clone());
                }
            }
        }
        self.notify();
    }

    /// Change the date-cluster bounds or resolution. A call that changes
    /// nothing emits no change and rebuckets nothing; otherwise all
    /// buckets are rebuilt from the retained history.
    pub fn change_dates_cluster_settings(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
        resolution: ClusterResolution,
    ) {
        {
            let mut inner = self.lock();
            let is_change =
                start != inner.start || end != inner.end || resolution != inner.resolution;
            if !is_change {
                return;
            }
            inner.start = start;
            inner.end = end;
            inner.resolution = resolution;

            inner.date_maps = DateClusterMaps::new();
            let history: Vec<EventLog> = inner
                .events
                .iter()
                .chain(inner.errors.iter())
                .cloned()
                .collect();
            for event in &history {
                inner
                    .date_maps
                    .cluster_event(event, resolution, start, end);
            }
        }
        self.notify();
    }

    /// Export the five date-cluster series in fixed display order. A
    /// series with exactly one real point gets a synthetic `{now, 0}`
    /// point so the charting layer draws a line instead of a dot.
    #[must_use]
    pub fn date_clusters_to_series(&self) -> Vec<Series<i64>> {
        let inner = self.lock();
        let now_ms = unix_ms(inner.clock.timestamp());
        DATE_SERIES
            .iter()
            .map(|(name, class)| {
                let mut values: Vec<SeriesPoint<i64>> = inner
                    .date_maps
                    .class(*class)
                    .iter()
                    .map(|(bucket, count)| SeriesPoint {
                        x: bucket_ms(bucket),
                        y: *count,
                    })
                    .collect();
                if values.len() == 1 {
                    values.push(SeriesPoint { x: now_ms, y: 0 });
                }
                Series::new(*name, values)
            })
            .collect()
    }

    /// Export the error-type clusters.
    #[must_use]
    pub fn error_clusters_to_series(&self) -> Vec<Series<SmolStr>> {
        self.lock().error_clusters.to_series()
    }

    /// Number of retained error events.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.lock().errors.len()
    }

    /// Number of retained non-error events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Total number of bucketed points across all date clusters.
    #[must_use]
    pub fn bucketed_total(&self) -> u64 {
        self.lock().date_maps.total()
    }

    /// Drop all retained events and derived clusters.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.errors.clear();
            inner.events.clear();
            inner.date_maps = DateClusterMaps::new();
            inner.error_clusters.reset();
        }
        self.notify();
    }

    /// End the session: unsubscribe from live events and detach the
    /// socket listener.
    pub fn dispose(&self) {
        let (dispatcher, embed_id, was_subscribed, listener) = {
            let mut inner = self.lock();
            let was_subscribed = inner.subscription != SubscriptionState::Unsubscribed;
            inner.subscription = SubscriptionState::Unsubscribed;
            (
                inner.dispatcher.clone(),
                inner.id.clone(),
                was_subscribed,
                inner.socket_listener.take(),
            )
        };
        if let Some(listener) = listener {
            listener.dispose();
        }
        if was_subscribed {
            let mut action = RemoteAction::new(RemoteActionKind::Unsubscribe, Map::new());
            action.set_context(ActionContext::for_embed(embed_id));
            if let Err(err) = dispatcher.send_action(action, false) {
                warn!(error = %err, "unsubscribe skipped");
            }
        }
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, EmbedInner> {
        self.inner.lock().expect("embed analytics state poisoned")
    }
}

impl std::fmt::Debug for EmbedAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EmbedAnalytics")
            .field("id", &inner.id)
            .field("subscription", &inner.subscription)
            .field("errors", &inner.errors.len())
            .field("events", &inner.events.len())
            .finish()
    }
}

fn response_error(response: &Value) -> Option<String> {
    response
        .get("error")
        .filter(|error| !error.is_null())
        .map(ToString::to_string)
}

/// Parse an `events` payload: a single event object or an array of them.
fn parse_events(value: Option<&Value>) -> Vec<EventLog> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(error = %err, "dropping malformed event");
                    None
                }
            })
            .collect(),
        Some(item @ Value::Object(_)) => match serde_json::from_value(item.clone()) {
            Ok(event) => vec![event],
            Err(err) => {
                warn!(error = %err, "dropping malformed event");
                Vec::new()
            }
        },
        _ => Vec::new(),
    }
}

fn unix_ms(timestamp: OffsetDateTime) -> i64 {
    i64::try_from(timestamp.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn bucket_ms(bucket: &SmolStr) -> i64 {
    OffsetDateTime::parse(bucket.as_str(), &Rfc3339)
        .map(unix_ms)
        .unwrap_or_default()
}
