//! Student submissions keyed by user.
//!
//! A submission is a student-sent pointer to their code (a shareable
//! link) plus context. The collection is keyed by user id: a repeat
//! submission from the same user replaces the stored entry in place and
//! bumps its revision, so the teacher sees how often the student
//! submitted without the list growing.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use smol_str::SmolStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use tafel_core::{ChangeNotifier, Subscription};
use tafel_remote::{RemoteDispatcher, RemoteError, RemoteEventType};

/// One student submission.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Submission {
    pub shareable_link: String,
    pub username: SmolStr,
    pub user_id: SmolStr,
    pub time_stamp: OffsetDateTime,
    pub message: String,
    pub id: u64,
    pub revision: u32,
}

impl Submission {
    /// Parse a submission from the `submission` push payload:
    /// `{actionData: {shareableLink, message}, actionUser: {username, id},
    /// timeStamp}`.
    pub fn from_payload(payload: &Value) -> Result<Self, RemoteError> {
        let data = payload
            .get("actionData")
            .ok_or_else(|| RemoteError::Validation("submission without actionData".into()))?;
        let user = payload
            .get("actionUser")
            .ok_or_else(|| RemoteError::Validation("submission without actionUser".into()))?;
        let shareable_link = data
            .get("shareableLink")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Validation("submission without shareableLink".into()))?
            .to_string();
        let time_stamp = payload
            .get("timeStamp")
            .and_then(Value::as_str)
            .and_then(|text| OffsetDateTime::parse(text, &Rfc3339).ok())
            .ok_or_else(|| RemoteError::Validation("submission without timeStamp".into()))?;
        Ok(Self {
            shareable_link,
            username: user
                .get("username")
                .and_then(Value::as_str)
                .map(SmolStr::new)
                .unwrap_or_default(),
            user_id: user
                .get("id")
                .and_then(Value::as_str)
                .map(SmolStr::new)
                .unwrap_or_default(),
            time_stamp,
            message: data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: 0,
            revision: 1,
        })
    }
}

struct SubmissionsInner {
    dispatcher: RemoteDispatcher,
    listener: Option<Subscription>,
    is_activated: bool,
    submissions: Vec<Submission>,
    next_id: u64,
    changed: ChangeNotifier,
}

/// Receives and stores submissions for the teacher session.
#[derive(Clone)]
pub struct Submissions {
    inner: Arc<Mutex<SubmissionsInner>>,
}

impl Submissions {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(dispatcher: RemoteDispatcher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubmissionsInner {
                dispatcher,
                listener: None,
                is_activated: false,
                submissions: Vec::new(),
                next_id: 1,
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Whether submissions are currently accepted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_activated
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Toggle acceptance of submissions and emit one change.
    pub fn toggle(&self) {
        if self.is_active() {
            self.unsubscribe();
        } else {
            self.subscribe();
        }
        self.notify();
    }

    /// Start listening for `submission` push events. Idempotent.
    pub fn subscribe(&self) {
        let dispatcher = {
            let inner = self.lock();
            if inner.is_activated {
                return;
            }
            inner.dispatcher.clone()
        };
        let collection = self.clone();
        let listener =
            dispatcher.add_socket_event_listener(RemoteEventType::Submission, move |payload| {
                collection.on_submission(payload);
            });
        let mut inner = self.lock();
        inner.listener = Some(listener);
        inner.is_activated = true;
    }

    /// Stop listening for submissions. Idempotent.
    pub fn unsubscribe(&self) {
        let listener = {
            let mut inner = self.lock();
            if !inner.is_activated {
                return;
            }
            inner.is_activated = false;
            inner.listener.take()
        };
        if let Some(listener) = listener {
            listener.dispose();
        }
    }

    /// Apply one submission payload and emit one change.
    pub fn on_submission(&self, payload: &Value) {
        let submission = match Submission::from_payload(payload) {
            Ok(submission) => submission,
            Err(err) => {
                warn!(error = %err, "dropping malformed submission");
                return;
            }
        };
        {
            let mut inner = self.lock();
            inner.update_or_add(submission);
        }
        self.notify();
    }

    /// The current submissions, one per user.
    #[must_use]
    pub fn list(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionsInner> {
        self.inner.lock().expect("submissions state poisoned")
    }
}

impl SubmissionsInner {
    fn update_or_add(&mut self, mut submission: Submission) {
        if let Some(existing) = self
            .submissions
            .iter_mut()
            .find(|entry| entry.user_id == submission.user_id)
        {
            submission.id = existing.id;
            submission.revision = existing.revision + 1;
            *existing = submission;
        } else {
            submission.id = self.next_id;
            self.next_id += 1;
            self.submissions.push(submission);
        }
    }
}

impl std::fmt::Debug for Submissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Submissions")
            .field("active", &inner.is_activated)
            .field("count", &inner.submissions.len())
            .finish()
    }
}
