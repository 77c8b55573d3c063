//! Aggregation over a set of observed embeds.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use smol_str::SmolStr;

use tafel_core::{ChangeNotifier, Clock, Subscription};
use tafel_remote::RemoteDispatcher;

use crate::embed::EmbedAnalytics;

struct MultiInner {
    embed_ids: Vec<SmolStr>,
    dispatcher: RemoteDispatcher,
    clock: Arc<dyn Clock>,
    entries: IndexMap<SmolStr, EmbedAnalytics>,
    child_subscriptions: Vec<Subscription>,
    changed: ChangeNotifier,
}

/// Owns one [`EmbedAnalytics`] per tracked embed and funnels their change
/// notifications into a single aggregate change.
#[derive(Clone)]
pub struct MultiEmbedAnalytics {
    inner: Arc<Mutex<MultiInner>>,
}

impl MultiEmbedAnalytics {
    /// Create the aggregate over the given embeds. The dispatcher is
    /// injected, already configured for the session; this aggregate owns
    /// its lifecycle from here on.
    #[must_use]
    pub fn new(
        embed_ids: Vec<SmolStr>,
        dispatcher: RemoteDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MultiInner {
                embed_ids,
                dispatcher,
                clock,
                entries: IndexMap::new(),
                child_subscriptions: Vec::new(),
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Create one child session per embed, wire its change notification
    /// into the aggregate, and kick off `get_events` plus
    /// `subscribe_to_events` for each — fire-and-forget, no sequencing
    /// between embeds.
    pub fn init(&self) {
        let (embed_ids, dispatcher, clock, changed) = {
            let inner = self.lock();
            if !inner.entries.is_empty() {
                return;
            }
            (
                inner.embed_ids.clone(),
                inner.dispatcher.clone(),
                inner.clock.clone(),
                inner.changed.clone(),
            )
        };

        let mut created: Vec<(SmolStr, EmbedAnalytics, Subscription)> = Vec::new();
        for embed_id in embed_ids {
            let session = EmbedAnalytics::new(embed_id.clone(), dispatcher.clone(), clock.clone());
            let aggregate = changed.clone();
            let subscription = session.on_change(move || aggregate.notify());
            created.push((embed_id, session, subscription));
        }

        {
            let mut inner = self.lock();
            for (embed_id, session, subscription) in created {
                inner.entries.insert(embed_id, session);
                inner.child_subscriptions.push(subscription);
            }
        }

        for (_, session) in self.entries() {
            session.get_events();
            session.subscribe_to_events();
        }
    }

    /// The tracked sessions in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(SmolStr, EmbedAnalytics)> {
        self.lock()
            .entries
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect()
    }

    /// The session for one embed, if tracked.
    #[must_use]
    pub fn entry(&self, embed_id: &str) -> Option<EmbedAnalytics> {
        self.lock().entries.get(embed_id).cloned()
    }

    /// The shared dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> RemoteDispatcher {
        self.lock().dispatcher.clone()
    }

    /// Drain delivered frames on the shared connection.
    pub fn pump(&self) -> usize {
        self.dispatcher().pump()
    }

    /// Register an aggregate change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Cascade-dispose every child session, then close the connection.
    pub fn dispose(&self) {
        let (sessions, subscriptions, dispatcher) = {
            let mut inner = self.lock();
            let sessions: Vec<EmbedAnalytics> = inner.entries.values().cloned().collect();
            inner.entries.clear();
            let subscriptions = std::mem::take(&mut inner.child_subscriptions);
            (sessions, subscriptions, inner.dispatcher.clone())
        };
        for subscription in subscriptions {
            subscription.dispose();
        }
        for session in sessions {
            session.dispose();
        }
        dispatcher.close();
    }

    fn lock(&self) -> MutexGuard<'_, MultiInner> {
        self.inner.lock().expect("multi analytics state poisoned")
    }
}

impl std::fmt::Debug for MultiEmbedAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MultiEmbedAnalytics")
            .field("embeds", &inner.embed_ids)
            .field("entries", &inner.entries.len())
            .finish()
    }
}
