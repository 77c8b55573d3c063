//! Notification list with dedup, purge, and auto-dismiss.
//!
//! Messages are kept newest-first. The exported view deduplicates by
//! exact text (bumping a count on the first-seen entry), caps the list at
//! the most recent `max_messages`, and injects a default close action
//! where none is attached. A delayed purge removes undismissed
//! informational messages; this is deliberate spam suppression, not
//! guaranteed delivery.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use time::OffsetDateTime;

use tafel_core::{ChangeNotifier, Clock, MessageAction, Severity, Subscription};

/// Default delay after which undismissed informational messages are purged.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(10);
/// Default cap on the number of displayed messages.
pub const DEFAULT_MAX_MESSAGES: usize = 5;
/// Default auto-dismiss delay for `Ignore` messages.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(3);

/// Tuning knobs for a [`MessageList`].
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct MessageListOptions {
    pub purge_interval: Duration,
    pub max_messages: usize,
    pub dismiss_after: Duration,
}

impl Default for MessageListOptions {
    fn default() -> Self {
        Self {
            purge_interval: DEFAULT_PURGE_INTERVAL,
            max_messages: DEFAULT_MAX_MESSAGES,
            dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }
}

/// What to show: plain text, text with actions, or a batch.
#[derive(Debug, Clone)]
pub enum MessageContent {
    /// A plain text message.
    Text(String),
    /// A message offering actions (confirm/cancel flows).
    WithActions {
        #[allow(missing_docs)]
        text: String,
        #[allow(missing_docs)]
        actions: Vec<MessageAction>,
    },
    /// A batch, shown element-wise.
    Many(Vec<MessageContent>),
}

impl MessageContent {
    /// Message text for any displayable error.
    #[must_use]
    pub fn error(error: &dyn std::fmt::Display) -> Self {
        Self::Text(error.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One aggregated entry of the displayed message list.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct MessageEntry {
    pub key: u64,
    pub text: String,
    pub severity: Severity,
    pub time: OffsetDateTime,
    pub count: u32,
    pub actions: Vec<MessageAction>,
}

struct StoredMessage {
    key: u64,
    text: String,
    severity: Severity,
    time: OffsetDateTime,
    actions: Vec<MessageAction>,
    hide_at: Option<Duration>,
}

struct MessageListInner {
    clock: Arc<dyn Clock>,
    options: MessageListOptions,
    messages: Vec<StoredMessage>,
    aggregated: Vec<MessageEntry>,
    purge_at: Option<Duration>,
    next_key: u64,
    changed: ChangeNotifier,
}

/// In-memory notification queue driving the UI status messages.
#[derive(Clone)]
pub struct MessageList {
    inner: Arc<Mutex<MessageListInner>>,
}

/// Handle returned by [`MessageList::show_message`]; dismisses the shown
/// message(s) on demand.
#[derive(Debug)]
pub struct DismissHandle {
    list: MessageList,
    keys: Vec<u64>,
}

impl DismissHandle {
    /// Hide the message(s) this handle refers to.
    pub fn dismiss(self) {
        for key in &self.keys {
            self.list.hide_message_by_key(*key);
        }
    }
}

impl MessageList {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_options(clock, MessageListOptions::default())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_options(clock: Arc<dyn Clock>, options: MessageListOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MessageListInner {
                clock,
                options,
                messages: Vec::new(),
                aggregated: Vec::new(),
                purge_at: None,
                next_key: 1,
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Show a message. Batches recurse element-wise; empty texts are
    /// dropped. Every shown message (re)schedules the purge timer; each
    /// structural change emits exactly one change notification.
    pub fn show_message(&self, severity: Severity, content: impl Into<MessageContent>) -> DismissHandle {
        let content = content.into();
        match content {
            MessageContent::Many(batch) => {
                let mut keys = Vec::new();
                for element in batch {
                    keys.extend(self.show_message(severity, element).keys);
                }
                DismissHandle {
                    list: self.clone(),
                    keys,
                }
            }
            MessageContent::Text(text) => self.show_single(severity, text, Vec::new()),
            MessageContent::WithActions { text, actions } => {
                self.show_single(severity, text, actions)
            }
        }
    }

    fn show_single(
        &self,
        severity: Severity,
        text: String,
        actions: Vec<MessageAction>,
    ) -> DismissHandle {
        if text.is_empty() {
            return DismissHandle {
                list: self.clone(),
                keys: Vec::new(),
            };
        }
        let key = {
            let mut inner = self.lock();
            let now = inner.clock.now();
            inner.purge_at = Some(now + inner.options.purge_interval);

            let key = inner.next_key;
            inner.next_key += 1;
            let hide_at = match severity {
                Severity::Ignore => Some(now + inner.options.dismiss_after),
                _ => None,
            };
            let time = inner.clock.timestamp();
            inner.messages.insert(
                0,
                StoredMessage {
                    key,
                    text,
                    severity,
                    time,
                    actions,
                    hide_at,
                },
            );
            self.prepare_locked(&mut inner);
            key
        };
        self.notify();
        DismissHandle {
            list: self.clone(),
            keys: vec![key],
        }
    }

    /// Advance timers: auto-dismiss expired `Ignore` messages and run the
    /// purge once its deadline passes. Emits at most one change.
    pub fn tick(&self) {
        let updated = {
            let mut inner = self.lock();
            let now = inner.clock.now();
            let mut removed = Vec::new();

            inner.messages.retain(|message| {
                let expired = message.hide_at.is_some_and(|deadline| deadline <= now);
                if expired {
                    removed.push(message.actions.clone());
                }
                !expired
            });

            if inner.purge_at.is_some_and(|deadline| deadline <= now) {
                inner.purge_at = None;
                inner.messages.retain(|message| {
                    let keep = message.severity.is_error() || !message.actions.is_empty();
                    if !keep {
                        removed.push(message.actions.clone());
                    }
                    keep
                });
            }

            if removed.is_empty() {
                false
            } else {
                for actions in removed {
                    dispose_all(&actions);
                }
                self.prepare_locked(&mut inner);
                true
            }
        };
        if updated {
            self.notify();
        }
    }

    /// Hide every message whose text matches exactly.
    pub fn hide_message(&self, text: &str) {
        self.hide_where(|message| message.text == text);
    }

    /// Hide one message by its key.
    pub fn hide_message_by_key(&self, key: u64) {
        self.hide_where(|message| message.key == key);
    }

    /// Clear the whole list.
    pub fn hide_messages(&self) {
        self.hide_where(|_| true);
    }

    fn hide_where(&self, predicate: impl Fn(&StoredMessage) -> bool) {
        let found = {
            let mut inner = self.lock();
            let mut removed = Vec::new();
            inner.messages.retain(|message| {
                let hide = predicate(message);
                if hide {
                    removed.push(message.actions.clone());
                }
                !hide
            });
            if removed.is_empty() {
                false
            } else {
                for actions in removed {
                    dispose_all(&actions);
                }
                self.prepare_locked(&mut inner);
                true
            }
        };
        if found {
            self.notify();
        }
    }

    /// The aggregated, display-ready messages, newest first.
    #[must_use]
    pub fn messages(&self) -> Vec<MessageEntry> {
        self.lock().aggregated.clone()
    }

    /// Re-derive the aggregated view: dedup by exact text (count on the
    /// first-seen entry), cap at the most recent `max_messages`, and
    /// inject a default close action where none is attached.
    fn prepare_locked(&self, inner: &mut MessageListInner) {
        let mut entries: Vec<MessageEntry> = Vec::new();
        for message in &inner.messages {
            if let Some(existing) = entries.iter_mut().find(|entry| entry.text == message.text) {
                existing.count += 1;
                continue;
            }
            entries.push(MessageEntry {
                key: message.key,
                text: message.text.clone(),
                severity: message.severity,
                time: message.time,
                count: 1,
                actions: message.actions.clone(),
            });
        }
        entries.truncate(inner.options.max_messages);

        for entry in &mut entries {
            if entry.actions.is_empty() {
                let list = self.clone();
                let text = entry.text.clone();
                entry.actions.push(MessageAction::new(
                    "close.message.action",
                    "Schließen",
                    move || list.hide_message(&text),
                ));
            }
        }
        inner.aggregated = entries;
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, MessageListInner> {
        self.inner.lock().expect("message list state poisoned")
    }
}

impl std::fmt::Debug for MessageList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MessageList")
            .field("messages", &inner.messages.len())
            .field("aggregated", &inner.aggregated.len())
            .finish()
    }
}

fn dispose_all(actions: &[MessageAction]) {
    for action in actions {
        action.dispose();
    }
}
