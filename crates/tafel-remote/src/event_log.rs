//! Append-only event facts.
//!
//! An [`EventLog`] records one thing that happened inside an embed (a
//! run, an error, a failed test, ...). It is immutable once built and
//! validated before transmission; the server persists it and rebroadcasts
//! it to every session subscribed to the embed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;
use time::OffsetDateTime;

use crate::action::ActionContext;
use crate::error::RemoteError;

/// One recorded fact about an embed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EventLog {
    pub name: SmolStr,
    /// Error type for `error` events, empty otherwise.
    #[serde(rename = "type", default)]
    pub kind: SmolStr,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub embed_id: SmolStr,
    #[serde(default)]
    pub embed_name: SmolStr,
    #[serde(default)]
    pub username: SmolStr,
    #[serde(default)]
    pub user_id: SmolStr,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub time_stamp: OffsetDateTime,
}

impl EventLog {
    /// Name of execution events.
    pub const RUN: &'static str = "run";
    /// Name of error events.
    pub const ERROR: &'static str = "error";
    /// Name of test-failure events.
    pub const FAILURE: &'static str = "failure";
    /// Name of test-attempt events.
    pub const TEST: &'static str = "test";

    /// Create an event with the given name and data bag.
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, data: Map<String, Value>, time_stamp: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            kind: SmolStr::default(),
            message: String::new(),
            embed_id: SmolStr::default(),
            embed_name: SmolStr::default(),
            username: SmolStr::default(),
            user_id: SmolStr::default(),
            data,
            time_stamp,
        }
    }

    /// Create a `run` event.
    #[must_use]
    pub fn run(data: Map<String, Value>, time_stamp: OffsetDateTime) -> Self {
        Self::new(Self::RUN, data, time_stamp)
    }

    /// Create an `error` event. The error type is plucked from the data
    /// bag's `error` entry, defaulting to `unknown`.
    #[must_use]
    pub fn error(data: Map<String, Value>, time_stamp: OffsetDateTime) -> Self {
        let kind = data
            .get("error")
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
            .map_or_else(|| SmolStr::new("unknown"), SmolStr::new);
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut event = Self::new(Self::ERROR, data, time_stamp);
        event.kind = kind;
        event.message = message;
        event
    }

    /// Merge session context (embed and user identity) into the event.
    pub fn set_context(&mut self, context: &ActionContext) {
        self.embed_id = context.embed_id.clone();
        if let Some(embed_name) = &context.embed_name {
            self.embed_name = embed_name.clone();
        }
        if let Some(user) = &context.embed_user {
            self.username = user.clone();
        }
    }

    /// Check the event is complete enough to transmit.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.name.is_empty() {
            return Err(RemoteError::Validation("event name is empty".into()));
        }
        if self.embed_id.is_empty() {
            return Err(RemoteError::Validation("event embed id is empty".into()));
        }
        Ok(())
    }

    /// Whether this is an `error` event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.name == Self::ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn data(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn error_event_plucks_kind_and_message() {
        let event = EventLog::error(
            data(&[
                ("error", json!("TypeError")),
                ("message", json!("bad operand")),
            ]),
            datetime!(2016-06-01 10:00 UTC),
        );
        assert_eq!(event.kind, "TypeError");
        assert_eq!(event.message, "bad operand");
        assert!(event.is_error());
    }

    #[test]
    fn error_event_defaults_kind_to_unknown() {
        let event = EventLog::error(Map::new(), datetime!(2016-06-01 10:00 UTC));
        assert_eq!(event.kind, "unknown");
    }

    #[test]
    fn validate_requires_name_and_embed() {
        let mut event = EventLog::run(Map::new(), datetime!(2016-06-01 10:00 UTC));
        assert!(event.validate().is_err());
        event.embed_id = SmolStr::new("embed-1");
        assert!(event.validate().is_ok());
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let mut event = EventLog::run(Map::new(), datetime!(2016-06-01 10:00 UTC));
        event.embed_id = SmolStr::new("embed-1");
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("embedId").is_some());
        assert!(value.get("timeStamp").is_some());
        assert!(value.get("type").is_some());
    }
}
