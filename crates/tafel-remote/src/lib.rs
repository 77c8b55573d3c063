//! `tafel-remote` - realtime message models and websocket dispatch.
//!
//! One persistent bidirectional connection per session: outbound
//! [`RemoteAction`] requests are correlated to server responses by id,
//! outbound [`EventLog`] facts are fire-and-forget, and server-pushed
//! events fan out to registered listeners.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Remote action envelopes and the action-name set.
pub mod action;
/// Request/response correlation and push-event fan-out.
pub mod dispatcher;
/// Remote layer errors.
pub mod error;
/// Append-only event facts.
pub mod event_log;
/// In-memory transport for tests.
pub mod test_support;
/// Connection configuration and the transport seam.
pub mod transport;

pub use action::{ActionContext, RemoteAction, RemoteActionKind};
pub use dispatcher::{RemoteDispatcher, RemoteEventType};
pub use error::RemoteError;
pub use event_log::EventLog;
pub use transport::{ConnectConfig, Transport, WebSocketTransport};
