//! Status bar model.

use std::sync::{Arc, Mutex, MutexGuard};

use smol_str::SmolStr;

use tafel_core::{ChangeNotifier, Severity, Subscription};

/// The current status line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct StatusMessage {
    pub text: String,
    pub detail: String,
    pub severity: Severity,
}

#[derive(Default)]
struct StatusInner {
    username: SmolStr,
    message: Option<StatusMessage>,
    changed: ChangeNotifier,
}

/// Session status shown in the status bar: the signed-in user and a
/// transient status line.
#[derive(Clone, Default)]
pub struct Status {
    inner: Arc<Mutex<StatusInner>>,
}

impl Status {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn username(&self) -> SmolStr {
        self.lock().username.clone()
    }

    /// Set the displayed username and emit one change.
    pub fn set_username(&self, username: impl Into<SmolStr>) {
        self.lock().username = username.into();
        self.notify();
    }

    /// The current status line, if any.
    #[must_use]
    pub fn message(&self) -> Option<StatusMessage> {
        self.lock().message.clone()
    }

    /// Replace the status line and emit one change.
    pub fn set_status_message(
        &self,
        text: impl Into<String>,
        detail: impl Into<String>,
        severity: Severity,
    ) {
        self.lock().message = Some(StatusMessage {
            text: text.into(),
            detail: detail.into(),
            severity,
        });
        self.notify();
    }

    /// Clear the status line and emit one change.
    pub fn clear_status_message(&self) {
        self.lock().message = None;
        self.notify();
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, StatusInner> {
        self.inner.lock().expect("status state poisoned")
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Status")
            .field("username", &inner.username)
            .field("message", &inner.message)
            .finish()
    }
}
