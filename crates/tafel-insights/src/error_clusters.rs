//! Count-by-error-type aggregation.

use indexmap::IndexMap;
use smol_str::SmolStr;

use tafel_core::{ChangeNotifier, Subscription};
use tafel_remote::EventLog;

use crate::series::{Series, SeriesPoint};

const DEFAULT_SERIES_NAME: &str = "Fehlertypen";

/// Streaming counter of `error` events keyed by error type.
///
/// Counters only ever increase; the exported series is cached until the
/// next mutation. Key enumeration order is first-seen insertion order.
#[derive(Debug, Default)]
pub struct ErrorClusters {
    clusters: IndexMap<SmolStr, u64>,
    is_dirty: bool,
    cached: Vec<Series<SmolStr>>,
    changed: ChangeNotifier,
}

impl ErrorClusters {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.changed.subscribe(callback)
    }

    /// Scan a batch and count every `error` event by its type (defaulting
    /// to `unknown`). Emits one change notification per batch if at least
    /// one counter moved.
    pub fn cluster(&mut self, events: &[EventLog]) {
        let mut has_changed = false;
        for event in events {
            if !event.is_error() {
                continue;
            }
            let key = if event.kind.is_empty() {
                SmolStr::new("unknown")
            } else {
                event.kind.clone()
            };
            *self.clusters.entry(key).or_insert(0) += 1;
            has_changed = true;
        }
        if has_changed {
            self.is_dirty = true;
            self.changed.notify();
        }
    }

    /// Clear all counters and notify unconditionally.
    pub fn reset(&mut self) {
        self.clusters.clear();
        self.is_dirty = true;
        self.changed.notify();
    }

    /// Current counters in first-seen order.
    #[must_use]
    pub fn clusters(&self) -> &IndexMap<SmolStr, u64> {
        &self.clusters
    }

    /// Export the counters as one named series. Idempotent and cached
    /// until the next mutation.
    pub fn to_series(&mut self) -> Vec<Series<SmolStr>> {
        self.to_series_named(DEFAULT_SERIES_NAME)
    }

    /// Like [`ErrorClusters::to_series`] with an explicit series name.
    pub fn to_series_named(&mut self, name: &str) -> Vec<Series<SmolStr>> {
        if !self.is_dirty {
            return self.cached.clone();
        }
        let values = self
            .clusters
            .iter()
            .map(|(key, count)| SeriesPoint {
                x: key.clone(),
                y: *count,
            })
            .collect();
        self.cached = vec![Series::new(name, values)];
        self.is_dirty = false;
        self.cached.clone()
    }
}
