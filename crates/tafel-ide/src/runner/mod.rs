//! Interpreter execution bridge.
//!
//! The runner drives an embedded [`ScriptEngine`] against the project's
//! files on a worker thread. Interpreter stdout flows through a terminal
//! transform into the public output stream; stdin is a line queue fed by
//! the UI. Interpreter exceptions are normalized, annotated onto the
//! originating file, and reported as `error` event logs — except for the
//! user-initiated `KeyboardInterrupt`, which is treated as a normal stop.

/// The engine seam and cancellation token.
pub mod engine;
/// The virtual filesystem boundary.
pub mod files;
/// Output/input streams.
pub mod stream;

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use smol_str::SmolStr;
use tracing::debug;

use tafel_core::{ChangeNotifier, Subscription};
use tafel_remote::EventLog;

use crate::file::{Annotation, AnnotationKind};
use crate::project::Project;

pub use engine::{
    CancelToken, EngineError, ExceptionInfo, ExecContext, MainFile, ScriptEngine, TracebackFrame,
};
pub use files::{FileAccess, FileMode, VirtualFs};
pub use stream::{InputQueue, OutputStream, TerminalTransform};

/// Execution state of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Errored,
    Interrupted,
}

impl RunState {
    #[allow(missing_docs)]
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

struct RunnerInner {
    project: Project,
    builtins: IndexMap<SmolStr, String>,
    state: RunState,
    stdout: OutputStream,
    transform: TerminalTransform,
    stdin: Option<InputQueue>,
    cancel: Option<CancelToken>,
    worker: Option<JoinHandle<()>>,
    changed: ChangeNotifier,
}

/// Drives one embedded interpreter for a project.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<Mutex<RunnerInner>>,
}

impl Runner {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(project: Project) -> Self {
        Self::with_builtins(project, IndexMap::new())
    }

    /// Create a runner with a built-in file set the virtual filesystem
    /// falls back to.
    #[must_use]
    pub fn with_builtins(project: Project, builtins: IndexMap<SmolStr, String>) -> Self {
        let stdout = OutputStream::new();
        let transform = TerminalTransform::new(stdout.clone());
        Self {
            inner: Arc::new(Mutex::new(RunnerInner {
                project,
                builtins,
                state: RunState::Idle,
                stdout,
                transform,
                stdin: None,
                cancel: None,
                worker: None,
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Register a state-change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().state.is_running()
    }

    /// The public output stream of the current (and past) runs.
    #[must_use]
    pub fn output(&self) -> OutputStream {
        self.lock().stdout.clone()
    }

    /// Feed typed input to a running interpreter. Ignored while idle.
    pub fn write_input(&self, chunk: &str) {
        let stdin = self.lock().stdin.clone();
        if let Some(stdin) = stdin {
            stdin.push(chunk);
        }
    }

    /// Start an execution. A no-op while one is already running.
    pub fn run(&self, engine: impl ScriptEngine + 'static) {
        let (project, transform, stdin, cancel, builtins) = {
            let mut inner = self.lock();
            if inner.state.is_running() {
                debug!("run ignored: already running");
                return;
            }
            inner.state = RunState::Running;
            let stdin = InputQueue::new(inner.stdout.clone());
            let cancel = CancelToken::new();
            inner.stdin = Some(stdin.clone());
            inner.cancel = Some(cancel.clone());
            (
                inner.project.clone(),
                inner.transform.clone(),
                stdin,
                cancel,
                inner.builtins.clone(),
            )
        };
        self.notify();

        // Reset annotations before the fresh run.
        for file in project.files() {
            file.set_annotations(Vec::new());
        }
        project.notify_change();

        let main_name = project.main_file_name();
        let main = MainFile {
            name: main_name.clone(),
            code: project
                .file_for_name(&main_name)
                .map(|file| file.contents())
                .unwrap_or_default(),
        };

        let command = exec_command(&project.language(), &main_name);
        let mut data = Map::new();
        data.insert("execCommand".to_string(), Value::from(command.clone()));
        project.send_event(EventLog::run(data, project.clock().timestamp()));
        transform.write_status(&command);

        let runner = self.clone();
        let mut engine = engine;
        let mut ctx = ExecContext::new(
            VirtualFs::new(project.clone(), builtins),
            transform.clone(),
            stdin,
            cancel,
        );
        let worker = std::thread::spawn(move || {
            let result = engine.execute(&main, &mut ctx);
            runner.finish(&project, &transform, result);
        });
        self.lock().worker = Some(worker);
    }

    /// Request a cooperative stop: sets the interrupt flag and releases a
    /// pending input read. Interpreter code between suspension points
    /// still runs to completion.
    pub fn stop(&self) {
        let (cancel, stdin) = {
            let inner = self.lock();
            if !inner.state.is_running() {
                return;
            }
            (inner.cancel.clone(), inner.stdin.clone())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(stdin) = stdin {
            stdin.interrupt();
        }
    }

    /// Wait for the worker of the current run to finish (tests and
    /// teardown).
    pub fn join(&self) {
        let worker = self.lock().worker.take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }

    fn finish(
        &self,
        project: &Project,
        transform: &TerminalTransform,
        result: Result<(), EngineError>,
    ) {
        let state = match result {
            Ok(()) => {
                transform.write_status("Ausführung Beendet");
                RunState::Completed
            }
            Err(EngineError::Interrupted) => {
                transform.write_error("Ausführung abgebrochen");
                RunState::Interrupted
            }
            Err(EngineError::Exception(info)) if info.is_keyboard_interrupt() => {
                // User-initiated stop: no logging, no error reporting.
                transform.write_error("Ausführung abgebrochen");
                RunState::Interrupted
            }
            Err(EngineError::Exception(info)) => {
                self.report_exception(project, transform, &info);
                RunState::Errored
            }
        };
        {
            let mut inner = self.lock();
            inner.state = state;
            inner.stdin = None;
            inner.cancel = None;
        }
        project.notify_change();
        self.notify();
    }

    /// Normal error handling: colorized output, an `error` event log with
    /// the offending file's content attached, and an annotation on the
    /// originating file.
    fn report_exception(
        &self,
        project: &Project,
        transform: &TerminalTransform,
        info: &ExceptionInfo,
    ) {
        let raw = info.raw();
        transform.write_error(&raw);

        let file_name: SmolStr = info
            .file
            .strip_prefix("./")
            .map_or_else(|| info.file.clone(), SmolStr::new);
        let file = project.file_for_name(&file_name);
        let file_content = file.as_ref().map(|file| file.contents()).unwrap_or_default();

        let mut data = Map::new();
        data.insert("file".to_string(), Value::from(file_name.as_str()));
        data.insert("line".to_string(), Value::from(info.line));
        data.insert("column".to_string(), Value::from(info.column));
        data.insert("error".to_string(), Value::from(info.kind.as_str()));
        data.insert("message".to_string(), Value::from(info.message.clone()));
        data.insert("errorHint".to_string(), Value::from(raw.clone()));
        data.insert("raw".to_string(), Value::from(raw));
        data.insert("fileContent".to_string(), Value::from(file_content));
        project.send_event(EventLog::error(data, project.clock().timestamp()));

        if let Some(file) = file {
            file.set_annotations(vec![Annotation {
                row: info.line.saturating_sub(1),
                column: info.column,
                text: info.message.clone(),
                kind: AnnotationKind::Error,
            }]);
        }
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, RunnerInner> {
        self.inner.lock().expect("runner state poisoned")
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Runner")
            .field("state", &inner.state)
            .finish()
    }
}

fn exec_command(language: &str, main_file: &str) -> String {
    let interpreter = match language {
        "" => "run",
        language => language,
    };
    format!("{interpreter} {main_file}")
}
