//! The tab/file orchestrator.
//!
//! A [`Project`] is constructed from a server-supplied document snapshot,
//! mutated by the UI and the runner, and torn down on navigation. Every
//! tab operation ends by emitting exactly one change notification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;
use tracing::{debug, warn};

use tafel_core::{ChangeNotifier, Clock, MessageAction, Severity, Subscription};
use tafel_remote::{ActionContext, EventLog, RemoteAction, RemoteDispatcher};

use crate::file::{File, RenameEvent};
use crate::messages::{DismissHandle, MessageContent, MessageList};
use crate::status::Status;
use crate::tabs::{Tab, TabKind};

/// Throttle window for embed saves.
pub const SAVE_THROTTLE: Duration = Duration::from_millis(800);

const CONFIRM_DELETE_TEXT: &str = "Wollen Sie diese Datei wirklich löschen?";
const DUPLICATE_NAME_TEXT: &str =
    "Es existiert bereits eine Datei mit diesem Namen. Was möchten Sie machen?";
const INCONSISTENT_TEXT: &str = "Inkonsistentes Projekt. Bitte Seite neu laden!";
const SAVE_FORBIDDEN_TEXT: &str =
    "Sie können dieses Beispiel nicht speichern, da es in der Leseansicht geöffnet wurde.";
const SAVE_FAILED_TEXT: &str = "Speichern fehlgeschlagen!";

/// Project modes limit the operations a session permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectMode {
    /// All operations allowed.
    #[default]
    Default,
    /// Prevents editing the embed.
    Readonly,
    /// Allows running and editing but not saving.
    NoSave,
    /// Viewing a different user's document for this embed.
    ViewDocument,
    /// Transient quick-execution session; saving disabled.
    RunMode,
    /// Unrecognized mode; most restrictive handling.
    Unknown,
}

impl ProjectMode {
    #[allow(missing_docs)]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Readonly => "Readonly",
            Self::NoSave => "NoSave",
            Self::ViewDocument => "ViewDocument",
            Self::RunMode => "RunMode",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a mode name; anything unrecognized is `Unknown`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "Default" => Self::Default,
            "Readonly" => Self::Readonly,
            "NoSave" => Self::NoSave,
            "ViewDocument" => Self::ViewDocument,
            "RunMode" => Self::RunMode,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for ProjectMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

/// Document metadata from the persisted snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct DocumentMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub main_file: SmolStr,
    #[serde(default)]
    pub language: SmolStr,
}

/// One file entry of the snapshot's code map: either the plain content or
/// a wrapper object carrying it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CodeEntry {
    /// Plain file content.
    Text(String),
    /// Wrapped file content.
    Rich {
        #[allow(missing_docs)]
        content: String,
    },
}

impl CodeEntry {
    #[allow(missing_docs)]
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text(content) | Self::Rich { content } => content,
        }
    }
}

/// Reference to an associated user document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRef {
    #[allow(missing_docs)]
    pub id: SmolStr,
}

/// The persisted document shape consumed at session init.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSnapshot {
    #[allow(missing_docs)]
    #[serde(default)]
    pub id: SmolStr,
    #[allow(missing_docs)]
    pub meta: DocumentMeta,
    #[allow(missing_docs)]
    #[serde(default)]
    pub code: IndexMap<SmolStr, CodeEntry>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub mode: ProjectMode,
    #[allow(missing_docs)]
    #[serde(default)]
    pub document: Option<DocumentRef>,
}

/// User data associated with the session.
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(missing_docs)]
pub struct UserData {
    #[serde(default)]
    pub email: Option<SmolStr>,
    #[serde(default)]
    pub username: Option<SmolStr>,
    #[serde(default)]
    pub mode: ProjectMode,
}

/// Save payload submitted to the external save endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct SaveRequest {
    pub id: SmolStr,
    pub code: IndexMap<SmolStr, String>,
}

/// The external save endpoint. Completion is reported through the
/// callback; the project shows success or failure to the user.
pub trait EmbedStorage: Send + Sync {
    /// Persist the request and invoke `done` exactly once.
    fn save_embed(&self, request: SaveRequest, done: Box<dyn FnOnce(Result<(), SmolStr>) + Send>);
}

struct ProjectInner {
    name: String,
    document_id: SmolStr,
    document: Option<SmolStr>,
    mode: ProjectMode,
    main_file: SmolStr,
    language: SmolStr,
    unnamed_counter: u32,
    tabs: Vec<Tab>,
    close_callbacks: HashMap<u64, Box<dyn FnOnce() + Send>>,
    rename_subscriptions: HashMap<u64, Subscription>,
    status: Status,
    message_list: MessageList,
    dispatcher: Option<RemoteDispatcher>,
    storage: Option<Arc<dyn EmbedStorage>>,
    user: Option<UserData>,
    is_consistent: bool,
    collision_pending: bool,
    pending_save: bool,
    last_save_at: Option<Duration>,
    clock: Arc<dyn Clock>,
    changed: ChangeNotifier,
}

/// Central mutable model for one IDE session.
#[derive(Clone)]
pub struct Project {
    inner: Arc<Mutex<ProjectInner>>,
}

impl Project {
    /// Build the project from a persisted document snapshot. Files are
    /// opened in snapshot order; the tab of `meta.main_file` (or the
    /// first tab) starts active.
    #[must_use]
    pub fn from_snapshot(
        snapshot: DocumentSnapshot,
        clock: Arc<dyn Clock>,
        message_list: MessageList,
    ) -> Self {
        let project = Self {
            inner: Arc::new(Mutex::new(ProjectInner {
                name: snapshot.meta.name.clone(),
                document_id: snapshot.id.clone(),
                document: snapshot.document.as_ref().map(|doc| doc.id.clone()),
                mode: snapshot.mode,
                main_file: snapshot.meta.main_file.clone(),
                language: snapshot.meta.language.clone(),
                unnamed_counter: 0,
                tabs: Vec::new(),
                close_callbacks: HashMap::new(),
                rename_subscriptions: HashMap::new(),
                status: Status::new(),
                message_list,
                dispatcher: None,
                storage: None,
                user: None,
                is_consistent: true,
                collision_pending: false,
                pending_save: false,
                last_save_at: None,
                clock,
                changed: ChangeNotifier::new(),
            })),
        };

        for (name, entry) in &snapshot.code {
            project.add_file(Some(name.as_str()), entry.content(), false);
        }
        let index = {
            let main_file = project.lock().main_file.clone();
            let found = project.index_for_filename(&main_file);
            found.unwrap_or(0)
        };
        if project.tab_count() > 0 {
            project.switch_tab(index);
        }
        project
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    /// Emit one change notification.
    pub fn notify_change(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    // ---- messaging -------------------------------------------------------

    /// Show a message through the session's message list.
    pub fn show_message(&self, severity: Severity, content: impl Into<MessageContent>) {
        let message_list = self.lock().message_list.clone();
        let _ = message_list.show_message(severity, content);
    }

    /// Hide messages with the given text.
    pub fn hide_message(&self, text: &str) {
        let message_list = self.lock().message_list.clone();
        message_list.hide_message(text);
    }

    /// The session message list.
    #[must_use]
    pub fn message_list(&self) -> MessageList {
        self.lock().message_list.clone()
    }

    /// The session status model.
    #[must_use]
    pub fn status(&self) -> Status {
        self.lock().status.clone()
    }

    // ---- tabs ------------------------------------------------------------

    /// All tabs in display order.
    #[must_use]
    pub fn tabs(&self) -> Vec<Tab> {
        self.lock().tabs.clone()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.lock().tabs.len()
    }

    /// Index of the active tab, if any.
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.lock().tabs.iter().position(|tab| tab.active)
    }

    /// Add a tab (or focus the existing one showing the same item).
    /// Returns its index and emits exactly one change.
    pub fn add_tab(&self, kind: TabKind, active: bool) -> usize {
        self.add_tab_inner(kind, active, None)
    }

    /// Like [`Project::add_tab`] with a callback invoked when the tab is
    /// removed.
    pub fn add_tab_with_close(
        &self,
        kind: TabKind,
        active: bool,
        on_close: impl FnOnce() + Send + 'static,
    ) -> usize {
        self.add_tab_inner(kind, active, Some(Box::new(on_close)))
    }

    fn add_tab_inner(
        &self,
        kind: TabKind,
        active: bool,
        on_close: Option<Box<dyn FnOnce() + Send>>,
    ) -> usize {
        let index = {
            let mut inner = self.lock();
            match inner.tabs.iter().position(|tab| tab.kind.same_item(&kind)) {
                Some(index) => index,
                None => {
                    let tab = Tab::new(kind);
                    if let Some(on_close) = on_close {
                        inner.close_callbacks.insert(tab.unique_id(), on_close);
                    }
                    inner.tabs.push(tab);
                    inner.tabs.len() - 1
                }
            }
        };
        if active {
            self.switch_tab(index);
        } else {
            self.notify_change();
        }
        index
    }

    /// Make the tab at `index` the single active tab.
    pub fn switch_tab(&self, index: usize) {
        let valid = {
            let mut inner = self.lock();
            if index < inner.tabs.len() {
                for tab in &mut inner.tabs {
                    tab.active = false;
                }
                inner.tabs[index].active = true;
                true
            } else {
                false
            }
        };
        if valid {
            self.notify_change();
        }
    }

    /// Toggle the active flag of one tab (split view).
    pub fn toggle_tab(&self, index: usize) {
        let valid = {
            let mut inner = self.lock();
            if let Some(tab) = inner.tabs.get_mut(index) {
                tab.active = !tab.active;
                true
            } else {
                false
            }
        };
        if valid {
            self.notify_change();
        }
    }

    /// Close the tab at `index`. A file tab is not removed immediately:
    /// the user confirms deletion through a message with actions. Other
    /// tab kinds close right away.
    pub fn close_tab(&self, index: usize) {
        let tab = {
            let inner = self.lock();
            inner.tabs.get(index).cloned()
        };
        let Some(tab) = tab else {
            return;
        };

        let Some(file) = tab.kind.as_file().cloned() else {
            self.remove_tab(index);
            return;
        };

        let uid = tab.unique_id();
        let handle_slot: Arc<Mutex<Option<DismissHandle>>> = Arc::new(Mutex::new(None));

        let delete = {
            let project = self.clone();
            let slot = handle_slot.clone();
            let file = file.clone();
            MessageAction::new("delete.message.action", "Löschen", move || {
                if let Some(index) = project.index_of_tab(uid) {
                    project.remove_tab(index);
                    file.dispose();
                }
                dismiss(&slot);
            })
        };
        let cancel = {
            let slot = handle_slot.clone();
            MessageAction::new("cancel.message.action", "Abbrechen", move || {
                dismiss(&slot);
            })
        };

        let message_list = self.message_list();
        let handle = message_list.show_message(
            Severity::Warning,
            MessageContent::WithActions {
                text: CONFIRM_DELETE_TEXT.to_string(),
                actions: vec![delete, cancel],
            },
        );
        *handle_slot.lock().expect("confirm handle poisoned") = Some(handle);
    }

    /// Remove the tab at `index` outright. Runs the tab's close callback
    /// and re-activates the nearest remaining tab when the active one was
    /// removed. Emits exactly one change.
    pub fn remove_tab(&self, index: usize) {
        let (callback, needs_switch, switch_to) = {
            let mut inner = self.lock();
            if index >= inner.tabs.len() {
                return;
            }
            let tab = inner.tabs.remove(index);
            let uid = tab.unique_id();
            inner.rename_subscriptions.remove(&uid);
            let callback = inner.close_callbacks.remove(&uid);
            let needs_switch = tab.active
                && !inner.tabs.is_empty()
                && !inner.tabs.iter().any(|tab| tab.active);
            let switch_to = index.min(inner.tabs.len().saturating_sub(1));
            (callback, needs_switch, switch_to)
        };
        if let Some(callback) = callback {
            callback();
        }
        if needs_switch {
            self.switch_tab(switch_to);
        } else {
            self.notify_change();
        }
    }

    /// Index of the tab with the given unique id.
    #[must_use]
    pub fn index_of_tab(&self, unique_id: u64) -> Option<usize> {
        self.lock()
            .tabs
            .iter()
            .position(|tab| tab.unique_id() == unique_id)
    }

    // ---- files -----------------------------------------------------------

    /// Add a file tab. Unnamed files get a fresh `Unbenannt{N}.txt` name
    /// and start in rename mode. Renames are watched for duplicate names.
    pub fn add_file(&self, name: Option<&str>, contents: &str, active: bool) -> File {
        let file = match name {
            Some(name) => File::new(name, contents),
            None => {
                let name = {
                    let mut inner = self.lock();
                    let name = format!("Unbenannt{}.txt", inner.unnamed_counter);
                    inner.unnamed_counter += 1;
                    name
                };
                let file = File::new(name, contents);
                file.set_name_editable(true);
                file
            }
        };

        let subscription = {
            let project = self.clone();
            let watched = file.clone();
            file.on_rename(move |event| project.on_changed_file_name(&watched, event))
        };

        let index = self.add_tab(TabKind::File(file.clone()), active);
        let uid = self.lock().tabs.get(index).map(Tab::unique_id);
        if let Some(uid) = uid {
            self.lock().rename_subscriptions.insert(uid, subscription);
        }
        file
    }

    /// All files in tab order.
    #[must_use]
    pub fn files(&self) -> Vec<File> {
        self.lock()
            .tabs
            .iter()
            .filter_map(|tab| tab.kind.as_file().cloned())
            .collect()
    }

    /// The file with the given name, if present.
    #[must_use]
    pub fn file_for_name(&self, name: &str) -> Option<File> {
        self.files().into_iter().find(|file| file.name() == name)
    }

    /// Whether a file with the given name exists.
    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        self.file_for_name(name).is_some()
    }

    /// Tab index of the file with the given name.
    #[must_use]
    pub fn index_for_filename(&self, name: &str) -> Option<usize> {
        self.lock().tabs.iter().position(|tab| {
            tab.kind
                .as_file()
                .is_some_and(|file| file.name() == name)
        })
    }

    /// The tab showing the given file, or `None`. More than one match is
    /// an inconsistent project and surfaces an error message.
    #[must_use]
    pub fn tab_for_file(&self, file: &File) -> Option<Tab> {
        let matches: Vec<Tab> = self
            .lock()
            .tabs
            .iter()
            .filter(|tab| {
                tab.kind
                    .as_file()
                    .is_some_and(|candidate| candidate.same_file(file))
            })
            .cloned()
            .collect();
        match matches.len() {
            1 => matches.into_iter().next(),
            0 => None,
            _ => {
                self.show_message(Severity::Error, INCONSISTENT_TEXT);
                None
            }
        }
    }

    /// Rename watcher: enforces file-name uniqueness. On collision the
    /// project becomes inconsistent and the user chooses between
    /// replacing every file that already bears the name or renaming
    /// again. Only one collision message is in flight at a time.
    pub fn on_changed_file_name(&self, file: &File, event: &RenameEvent) {
        debug!(from = %event.from, to = %event.to, "file renamed");
        let duplicates: Vec<File> = self
            .files()
            .into_iter()
            .filter(|candidate| candidate.name() == event.to && !candidate.same_file(file))
            .collect();
        if duplicates.is_empty() {
            return;
        }

        self.set_consistency(false);
        {
            let mut inner = self.lock();
            if inner.collision_pending {
                return;
            }
            inner.collision_pending = true;
        }

        let handle_slot: Arc<Mutex<Option<DismissHandle>>> = Arc::new(Mutex::new(None));
        let replace = {
            let project = self.clone();
            let slot = handle_slot.clone();
            let duplicates = duplicates.clone();
            MessageAction::new("replace.message.action", "Ersetzen", move || {
                for duplicate in &duplicates {
                    if let Some(index) = project
                        .tab_for_file(duplicate)
                        .and_then(|tab| project.index_of_tab(tab.unique_id()))
                    {
                        project.remove_tab(index);
                    }
                    duplicate.dispose();
                }
                project.lock().collision_pending = false;
                project.set_consistency(true);
                dismiss(&slot);
            })
        };
        let rename = {
            let project = self.clone();
            let slot = handle_slot.clone();
            let file = file.clone();
            MessageAction::new("rename.message.action", "Umbenennen", move || {
                file.set_name_editable(true);
                project.lock().collision_pending = false;
                project.set_consistency(true);
                dismiss(&slot);
            })
        };

        let message_list = self.message_list();
        let handle = message_list.show_message(
            Severity::Warning,
            MessageContent::WithActions {
                text: DUPLICATE_NAME_TEXT.to_string(),
                actions: vec![replace, rename],
            },
        );
        *handle_slot.lock().expect("collision handle poisoned") = Some(handle);
    }

    /// Set the project consistency flag and emit one change.
    pub fn set_consistency(&self, consistent: bool) {
        self.lock().is_consistent = consistent;
        self.notify_change();
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.lock().is_consistent
    }

    // ---- saving ----------------------------------------------------------

    /// Configure the external save endpoint.
    pub fn set_storage(&self, storage: Arc<dyn EmbedStorage>) {
        self.lock().storage = Some(storage);
    }

    /// Save the file changes. Throttled: at most one invocation per
    /// [`SAVE_THROTTLE`]; calls inside the window are dropped.
    pub fn save_embed(&self) {
        {
            let mut inner = self.lock();
            let now = inner.clock.now();
            if inner
                .last_save_at
                .is_some_and(|last| now.saturating_sub(last) < SAVE_THROTTLE)
            {
                debug!("save throttled");
                return;
            }
            inner.last_save_at = Some(now);
        }
        self.save_embed_now();
    }

    /// Unthrottled save. A save already in flight drops the call; a mode
    /// that forbids saving shows a warning instead.
    fn save_embed_now(&self) {
        enum Plan {
            Skip,
            Forbidden,
            Save(Arc<dyn EmbedStorage>, SaveRequest, Status),
        }

        let plan = {
            let mut inner = self.lock();
            if inner.pending_save {
                Plan::Skip
            } else if inner.mode != ProjectMode::Default {
                Plan::Forbidden
            } else if let Some(storage) = inner.storage.clone() {
                inner.pending_save = true;
                let request = SaveRequest {
                    id: inner.document_id.clone(),
                    code: IndexMap::new(),
                };
                Plan::Save(storage, request, inner.status.clone())
            } else {
                warn!("save skipped: no storage configured");
                Plan::Skip
            }
        };

        match plan {
            Plan::Skip => {}
            Plan::Forbidden => {
                self.show_message(Severity::Warning, SAVE_FORBIDDEN_TEXT);
            }
            Plan::Save(storage, mut request, status) => {
                request.code = self.to_code_document();
                status.set_status_message("Speichere...", "", Severity::Ignore);
                let project = self.clone();
                storage.save_embed(
                    request,
                    Box::new(move |result| {
                        match result {
                            Ok(()) => {
                                project.status().set_status_message(
                                    "Gespeichert.",
                                    "",
                                    Severity::Info,
                                );
                            }
                            Err(err) => {
                                warn!(error = %err, "save failed");
                                project.show_message(Severity::Error, SAVE_FAILED_TEXT);
                            }
                        }
                        project.lock().pending_save = false;
                    }),
                );
            }
        }
    }

    /// All files as a `{name: content}` code document.
    #[must_use]
    pub fn to_code_document(&self) -> IndexMap<SmolStr, String> {
        self.files()
            .iter()
            .map(|file| (file.name(), file.contents()))
            .collect()
    }

    /// Whether the current user may save this embed.
    #[must_use]
    pub fn can_user_save(&self) -> bool {
        let inner = self.lock();
        match &inner.user {
            None => false,
            Some(user) => !matches!(
                user.mode,
                ProjectMode::RunMode
                    | ProjectMode::Readonly
                    | ProjectMode::NoSave
                    | ProjectMode::Unknown
            ),
        }
    }

    // ---- realtime --------------------------------------------------------

    /// Wire the realtime connection for events and actions.
    pub fn set_communication(&self, dispatcher: RemoteDispatcher) {
        self.lock().dispatcher = Some(dispatcher);
    }

    /// Send an event log, merged with the project context. Without a
    /// configured connection the event is skipped with a warning.
    pub fn send_event(&self, mut event: EventLog) {
        let dispatcher = self.lock().dispatcher.clone();
        let Some(dispatcher) = dispatcher else {
            warn!("communication not configured, cannot send events");
            return;
        };
        event.set_context(&self.context_data());
        if let Err(err) = dispatcher.send_event(&event) {
            warn!(error = %err, "send_event degraded to no-op");
        }
    }

    /// Send a remote action, merged with the project context.
    pub fn send_action(&self, mut action: RemoteAction, expect_response: bool) {
        let dispatcher = self.lock().dispatcher.clone();
        let Some(dispatcher) = dispatcher else {
            warn!("communication not configured, cannot send actions");
            return;
        };
        action.set_context(self.context_data());
        if let Err(err) = dispatcher.send_action(action, expect_response) {
            warn!(error = %err, "send_action degraded to no-op");
        }
    }

    /// The session context attached to outbound traffic.
    #[must_use]
    pub fn context_data(&self) -> ActionContext {
        let inner = self.lock();
        ActionContext {
            embed_id: inner.document_id.clone(),
            embed_name: Some(SmolStr::new(&inner.name)),
            embed_document: inner.document.clone(),
            embed_user: Some(
                inner
                    .user
                    .as_ref()
                    .and_then(|user| user.email.clone())
                    .unwrap_or_else(|| SmolStr::new("anonymous")),
            ),
        }
    }

    // ---- session data ----------------------------------------------------

    /// Set the user data and show the username in the status bar.
    pub fn set_user_data(&self, user: UserData) {
        let display = user
            .email
            .clone()
            .or_else(|| user.username.clone())
            .unwrap_or_default();
        let status = {
            let mut inner = self.lock();
            inner.user = Some(user);
            inner.status.clone()
        };
        status.set_username(display);
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn mode(&self) -> ProjectMode {
        self.lock().mode
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn main_file_name(&self) -> SmolStr {
        self.lock().main_file.clone()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn language(&self) -> SmolStr {
        self.lock().language.clone()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn document_id(&self) -> SmolStr {
        self.lock().document_id.clone()
    }

    /// The session clock.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.lock().clock.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ProjectInner> {
        self.inner.lock().expect("project state poisoned")
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Project")
            .field("name", &inner.name)
            .field("mode", &inner.mode)
            .field("tabs", &inner.tabs.len())
            .field("consistent", &inner.is_consistent)
            .finish()
    }
}

fn dismiss(slot: &Arc<Mutex<Option<DismissHandle>>>) {
    if let Some(handle) = slot.lock().expect("dismiss handle poisoned").take() {
        handle.dismiss();
    }
}
