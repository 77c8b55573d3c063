use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use smol_str::SmolStr;

use tafel_core::{ManualClock, Severity};
use tafel_ide::{
    DocumentSnapshot, EmbedStorage, MessageList, Project, ProjectMode, SaveRequest, UserData,
};

struct RecordingStorage {
    calls: AtomicUsize,
    requests: Mutex<Vec<SaveRequest>>,
    result: Mutex<Result<(), SmolStr>>,
}

impl RecordingStorage {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            result: Mutex::new(Ok(())),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        let storage = Self::new();
        *storage.result.lock().unwrap() = Err(SmolStr::new(message));
        storage
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbedStorage for RecordingStorage {
    fn save_embed(
        &self,
        request: SaveRequest,
        done: Box<dyn FnOnce(Result<(), SmolStr>) + Send>,
    ) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        done(self.result.lock().unwrap().clone());
    }
}

fn snapshot(mode: &str) -> DocumentSnapshot {
    serde_json::from_value(json!({
        "id": "embed-1",
        "meta": { "name": "Sortieren", "mainFile": "main.py", "language": "python3" },
        "code": { "main.py": "print('hi')\n" },
        "mode": mode,
    }))
    .unwrap()
}

fn project(mode: &str) -> (Project, MessageList, ManualClock) {
    let clock = ManualClock::new();
    let messages = MessageList::new(Arc::new(clock.clone()));
    let project = Project::from_snapshot(snapshot(mode), Arc::new(clock.clone()), messages.clone());
    (project, messages, clock)
}

#[test]
fn two_saves_within_the_throttle_window_send_one_request() {
    let (project, _messages, clock) = project("Default");
    let storage = RecordingStorage::new();
    project.set_storage(storage.clone());

    project.save_embed();
    clock.advance(Duration::from_millis(400));
    project.save_embed();
    assert_eq!(storage.calls(), 1);

    clock.advance(Duration::from_millis(500));
    project.save_embed();
    assert_eq!(storage.calls(), 2);
}

#[test]
fn save_request_carries_the_code_document() {
    let (project, _messages, _clock) = project("Default");
    let storage = RecordingStorage::new();
    project.set_storage(storage.clone());

    project.file_for_name("main.py").unwrap().set_contents("x = 1\n");
    project.save_embed();

    let requests = storage.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, "embed-1");
    assert_eq!(requests[0].code.get("main.py").unwrap(), "x = 1\n");
}

#[test]
fn successful_save_lands_in_the_status_bar() {
    let (project, _messages, _clock) = project("Default");
    let storage = RecordingStorage::new();
    project.set_storage(storage);

    project.save_embed();
    let status = project.status().message().unwrap();
    assert_eq!(status.text, "Gespeichert.");
    assert_eq!(status.severity, Severity::Info);
}

#[test]
fn failed_save_shows_an_error_message() {
    let (project, messages, _clock) = project("Default");
    let storage = RecordingStorage::failing("boom");
    project.set_storage(storage);

    project.save_embed();
    let shown = messages.messages();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].text, "Speichern fehlgeschlagen!");
    assert_eq!(shown[0].severity, Severity::Error);
}

#[test]
fn non_default_mode_refuses_to_save_with_a_warning() {
    let (project, messages, _clock) = project("RunMode");
    let storage = RecordingStorage::new();
    project.set_storage(storage.clone());

    project.save_embed();
    assert_eq!(storage.calls(), 0);
    let shown = messages.messages();
    assert_eq!(shown.len(), 1);
    assert_eq!(
        shown[0].text,
        "Sie können dieses Beispiel nicht speichern, da es in der Leseansicht geöffnet wurde."
    );
}

#[test]
fn pending_save_drops_reentrant_saves() {
    struct BlockedStorage {
        calls: AtomicUsize,
        pending: Mutex<Vec<Box<dyn FnOnce(Result<(), SmolStr>) + Send>>>,
    }
    impl EmbedStorage for BlockedStorage {
        fn save_embed(
            &self,
            _request: SaveRequest,
            done: Box<dyn FnOnce(Result<(), SmolStr>) + Send>,
        ) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pending.lock().unwrap().push(done);
        }
    }

    let (project, _messages, clock) = project("Default");
    let storage = Arc::new(BlockedStorage {
        calls: AtomicUsize::new(0),
        pending: Mutex::new(Vec::new()),
    });
    project.set_storage(storage.clone());

    project.save_embed();
    clock.advance(Duration::from_secs(1));
    // The first save is still in flight; this one is dropped, not queued.
    project.save_embed();
    assert_eq!(storage.calls.load(Ordering::SeqCst), 1);

    let done = storage.pending.lock().unwrap().pop().unwrap();
    done(Ok(()));
    clock.advance(Duration::from_secs(1));
    project.save_embed();
    assert_eq!(storage.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_mode_deserializes_to_unknown_and_user_rights_gate_saving() {
    let (project, _messages, _clock) = project("SomethingNew");
    assert_eq!(project.mode(), ProjectMode::Unknown);

    assert!(!project.can_user_save(), "no user data means no saving");
    project.set_user_data(UserData {
        email: Some(SmolStr::new("teacher@example.org")),
        username: None,
        mode: ProjectMode::Default,
    });
    assert!(project.can_user_save());
    assert_eq!(project.status().username(), "teacher@example.org");

    project.set_user_data(UserData {
        email: None,
        username: Some(SmolStr::new("student")),
        mode: ProjectMode::Readonly,
    });
    assert!(!project.can_user_save());
}
