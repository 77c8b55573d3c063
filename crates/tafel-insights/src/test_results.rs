//! Student test results keyed by user.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use serde_json::{Map, Value};
use smol_str::SmolStr;
use time::OffsetDateTime;
use tracing::warn;

use tafel_core::{ChangeNotifier, Subscription};
use tafel_remote::{
    ActionContext, RemoteAction, RemoteActionKind, RemoteDispatcher, RemoteEventType,
};

/// One student's latest test outcome for an embed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct TestResult {
    pub user_id: SmolStr,
    #[serde(default)]
    pub embed_id: SmolStr,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_percentage: f64,
    #[serde(default)]
    pub data: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub time_stamp: OffsetDateTime,
}

struct TestResultsInner {
    dispatcher: RemoteDispatcher,
    embed_id: SmolStr,
    results: Vec<TestResult>,
    listener: Option<Subscription>,
    changed: ChangeNotifier,
}

/// Overview of test results for one embed, fed by the `get-testresults`
/// action and the `user-testresult` push event. Keyed by user id:
/// repeated results update in place.
#[derive(Clone)]
pub struct TestResults {
    inner: Arc<Mutex<TestResultsInner>>,
}

impl TestResults {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(embed_id: impl Into<SmolStr>, dispatcher: RemoteDispatcher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TestResultsInner {
                dispatcher,
                embed_id: embed_id.into(),
                results: Vec::new(),
                listener: None,
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Fetch the stored results for this embed.
    pub fn fetch(&self) {
        let (dispatcher, embed_id) = {
            let inner = self.lock();
            (inner.dispatcher.clone(), inner.embed_id.clone())
        };
        let overview = self.clone();
        let mut action = RemoteAction::new(RemoteActionKind::GetTestResults, Map::new())
            .on_response(move |response| {
                if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
                    warn!(error = %error, "get-testresults rejected");
                    return;
                }
                let results = response
                    .get("testResults")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for result in &results {
                    overview.apply(result);
                }
            });
        action.set_context(ActionContext::for_embed(embed_id));
        if let Err(err) = dispatcher.send_action(action, true) {
            warn!(error = %err, "get-testresults skipped");
        }
    }

    /// Start listening for live `user-testresult` pushes. Idempotent.
    pub fn subscribe(&self) {
        let dispatcher = {
            let inner = self.lock();
            if inner.listener.is_some() {
                return;
            }
            inner.dispatcher.clone()
        };
        let overview = self.clone();
        let listener = dispatcher
            .add_socket_event_listener(RemoteEventType::UserTestResult, move |payload| {
                overview.apply(payload);
            });
        self.lock().listener = Some(listener);
    }

    /// Stop listening for live results.
    pub fn unsubscribe(&self) {
        let listener = self.lock().listener.take();
        if let Some(listener) = listener {
            listener.dispose();
        }
    }

    /// The current results, one per user.
    #[must_use]
    pub fn list(&self) -> Vec<TestResult> {
        self.lock().results.clone()
    }

    fn apply(&self, payload: &Value) {
        let result: TestResult = match serde_json::from_value(payload.clone()) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "dropping malformed test result");
                return;
            }
        };
        {
            let mut inner = self.lock();
            if !result.embed_id.is_empty() && result.embed_id != inner.embed_id {
                return;
            }
            if let Some(existing) = inner
                .results
                .iter_mut()
                .find(|entry| entry.user_id == result.user_id)
            {
                *existing = result;
            } else {
                inner.results.push(result);
            }
        }
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, TestResultsInner> {
        self.inner.lock().expect("test results state poisoned")
    }
}

impl std::fmt::Debug for TestResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("TestResults")
            .field("embed", &inner.embed_id)
            .field("count", &inner.results.len())
            .finish()
    }
}
