//! `tafel-ide` - project model, notifications, and the interpreter
//! execution bridge.
//!
//! A [`Project`] is the central mutable model of one IDE session: the
//! open file tabs, the status bar, the notification list, and the wiring
//! to the realtime connection. The [`runner::Runner`] executes the
//! project's code through an embedded interpreter, bridging stdin/stdout
//! and translating interpreter exceptions into annotations and event
//! logs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// IDE model errors.
pub mod error;
/// Project files with annotations and rename tracking.
pub mod file;
/// Notification list with dedup, purge, and auto-dismiss.
pub mod messages;
/// The tab/file orchestrator.
pub mod project;
/// Interpreter execution bridge.
pub mod runner;
/// Status bar model.
pub mod status;
/// Tabs and tab kinds.
pub mod tabs;

pub use error::IdeError;
pub use file::{Annotation, AnnotationKind, File, RenameEvent};
pub use messages::{DismissHandle, MessageContent, MessageEntry, MessageList, MessageListOptions};
pub use project::{
    CodeEntry, DocumentMeta, DocumentSnapshot, EmbedStorage, Project, ProjectMode, SaveRequest,
    UserData,
};
pub use status::{Status, StatusMessage};
pub use tabs::{Tab, TabKind};
