//! Request/response correlation and push-event fan-out.
//!
//! The dispatcher manages one transport per session. Outbound actions
//! carry a client-generated correlation id; the matching server response
//! resolves the registered callback exactly once. Push events (frames
//! with an `event` name instead of an `id`) fan out to listeners of that
//! event type. Frames are dispatched strictly in transport arrival order.
//!
//! Failure contract: a lost connection leaves registered callbacks
//! permanently pending. There is no client-side timeout; callers must not
//! assume one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use smol_str::SmolStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use tafel_core::{Clock, ListenerSet, Subscription};

use crate::action::{RemoteAction, ResponseCallback};
use crate::error::RemoteError;
use crate::event_log::EventLog;
use crate::transport::{ConnectConfig, Transport, WebSocketTransport};

/// Push-style events broadcast by the server to a whole embed room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteEventType {
    /// A persisted [`EventLog`] rebroadcast.
    IdeEvent,
    /// A student submission.
    Submission,
    /// A student test result.
    UserTestResult,
}

impl RemoteEventType {
    #[allow(missing_docs)]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdeEvent => "ide-event",
            Self::Submission => "submission",
            Self::UserTestResult => "user-testresult",
        }
    }
}

struct DispatcherInner {
    config: ConnectConfig,
    clock: Arc<dyn Clock>,
    transport: Option<Box<dyn Transport>>,
    next_request_id: u64,
    pending: HashMap<u64, ResponseCallback>,
    listeners: IndexMap<SmolStr, ListenerSet<Value>>,
}

/// Manages the session's persistent bidirectional connection.
#[derive(Clone)]
pub struct RemoteDispatcher {
    inner: Arc<Mutex<DispatcherInner>>,
}

impl RemoteDispatcher {
    /// Create a dispatcher for the given connection configuration. No
    /// connection is opened until [`RemoteDispatcher::connect`].
    #[must_use]
    pub fn new(config: ConnectConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DispatcherInner {
                config,
                clock,
                transport: None,
                next_request_id: 1,
                pending: HashMap::new(),
                listeners: IndexMap::new(),
            })),
        }
    }

    /// Open the websocket connection to the configured endpoint.
    pub fn connect(&self) -> Result<(), RemoteError> {
        let config = {
            let inner = self.lock();
            inner.config.clone()
        };
        let transport = WebSocketTransport::connect(&config)?;
        self.lock().transport = Some(Box::new(transport));
        Ok(())
    }

    /// Attach an already-open transport (tests, alternative transports).
    pub fn connect_with(&self, transport: Box<dyn Transport>) {
        self.lock().transport = Some(transport);
    }

    /// Whether a transport is currently attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().transport.is_some()
    }

    /// Close the connection. Pending response callbacks never fire.
    pub fn close(&self) {
        let mut inner = self.lock();
        if let Some(mut transport) = inner.transport.take() {
            transport.close();
        }
        if !inner.pending.is_empty() {
            warn!(
                pending = inner.pending.len(),
                "connection closed with unresolved action callbacks"
            );
        }
    }

    /// Transmit a [`RemoteAction`]. With `expect_response`, the action's
    /// callback is registered under a fresh correlation id and resolved by
    /// exactly one matching response.
    pub fn send_action(
        &self,
        mut action: RemoteAction,
        expect_response: bool,
    ) -> Result<(), RemoteError> {
        let callback = if expect_response {
            action.take_callback()
        } else {
            None
        };
        let (kind, payload, context) = action.into_parts();

        let mut inner = self.lock();
        let mut frame = Map::new();
        frame.insert("action".to_string(), Value::from(kind.as_str()));
        merge_object(&mut frame, serde_json::to_value(&context).ok());
        for (key, value) in payload {
            frame.insert(key, value);
        }
        frame.insert(
            "timeStamp".to_string(),
            Value::from(rfc3339(inner.clock.timestamp())),
        );

        let id = callback.as_ref().map(|_| {
            let id = inner.next_request_id;
            inner.next_request_id += 1;
            frame.insert("id".to_string(), Value::from(id));
            id
        });

        let text = Value::Object(frame).to_string();
        let Some(transport) = inner.transport.as_mut() else {
            warn!(action = kind.as_str(), "send_action skipped: not connected");
            return Err(RemoteError::NotConnected);
        };
        match transport.send(&text) {
            Ok(()) => {
                if let (Some(id), Some(callback)) = (id, callback) {
                    inner.pending.insert(id, callback);
                }
                debug!(action = kind.as_str(), "action sent");
                Ok(())
            }
            Err(err) => {
                warn!(action = kind.as_str(), error = %err, "send_action failed");
                Err(err)
            }
        }
    }

    /// Validate and transmit an [`EventLog`], fire-and-forget.
    pub fn send_event(&self, event: &EventLog) -> Result<(), RemoteError> {
        event.validate()?;
        let mut frame = Map::new();
        frame.insert("eventName".to_string(), Value::from(event.name.as_str()));
        frame.insert("eventData".to_string(), Value::Object(event.data.clone()));
        frame.insert("embedId".to_string(), Value::from(event.embed_id.as_str()));
        frame.insert(
            "embedName".to_string(),
            Value::from(event.embed_name.as_str()),
        );
        frame.insert(
            "timeStamp".to_string(),
            Value::from(rfc3339(event.time_stamp)),
        );
        let text = Value::Object(frame).to_string();

        let mut inner = self.lock();
        let Some(transport) = inner.transport.as_mut() else {
            warn!(event = event.name.as_str(), "send_event skipped: not connected");
            return Err(RemoteError::NotConnected);
        };
        transport.send(&text)
    }

    /// Subscribe to a push event type. The listener receives the event's
    /// payload. Dispose the returned handle to unsubscribe.
    #[must_use]
    pub fn add_socket_event_listener(
        &self,
        event_type: RemoteEventType,
        listener: impl FnMut(&Value) + Send + 'static,
    ) -> Subscription {
        let set = {
            let mut inner = self.lock();
            inner
                .listeners
                .entry(SmolStr::new(event_type.as_str()))
                .or_default()
                .clone()
        };
        set.subscribe(listener)
    }

    /// Drain delivered frames and dispatch them in arrival order. Returns
    /// the number of frames processed.
    pub fn pump(&self) -> usize {
        let mut processed = 0;
        loop {
            let frame = {
                let mut inner = self.lock();
                let Some(transport) = inner.transport.as_mut() else {
                    break;
                };
                match transport.poll() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(
                            error = %err,
                            pending = inner.pending.len(),
                            "connection lost; pending callbacks will not fire"
                        );
                        inner.transport = None;
                        break;
                    }
                }
            };
            self.dispatch_frame(&frame);
            processed += 1;
        }
        processed
    }

    fn dispatch_frame(&self, frame: &str) {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                return;
            }
        };

        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            let callback = self.lock().pending.remove(&id);
            match callback {
                Some(callback) => callback(&value),
                // A duplicate or unknown response resolves nothing.
                None => debug!(id, "response without pending action"),
            }
            return;
        }

        if let Some(event) = value.get("event").and_then(Value::as_str) {
            let set = self.lock().listeners.get(event).cloned();
            if let Some(set) = set {
                let data = value.get("data").cloned().unwrap_or(Value::Null);
                set.emit(&data);
            } else {
                debug!(event, "push event without listeners");
            }
            return;
        }

        warn!("dropping frame without id or event name");
    }

    /// Current wall-clock timestamp from the injected clock.
    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.lock().clock.timestamp()
    }

    /// Monotonic time from the injected clock.
    #[must_use]
    pub fn clock_now(&self) -> Duration {
        self.lock().clock.now()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DispatcherInner> {
        self.inner.lock().expect("dispatcher state poisoned")
    }
}

impl std::fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("RemoteDispatcher")
            .field("url", &inner.config.url)
            .field("connected", &inner.transport.is_some())
            .field("pending", &inner.pending.len())
            .finish()
    }
}

fn merge_object(target: &mut Map<String, Value>, source: Option<Value>) {
    if let Some(Value::Object(map)) = source {
        for (key, value) in map {
            target.insert(key, value);
        }
    }
}

fn rfc3339(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.to_string())
}
