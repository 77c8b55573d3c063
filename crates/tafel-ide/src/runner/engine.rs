//! The seam to the embedded interpreter.
//!
//! The real script engine is an external collaborator; the bridge hands
//! it the main file and an [`ExecContext`] that routes file access,
//! output, and blocking line input through the project. Cancellation is
//! an explicit token the engine must consult at its suspension points
//! (loop iterations, input waits).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

use crate::error::IdeError;
use crate::runner::files::{FileAccess, FileMode, VirtualFs};
use crate::runner::stream::{InputQueue, TerminalTransform};

/// Error kind the bridge treats as a user-initiated stop.
pub const KEYBOARD_INTERRUPT: &str = "KeyboardInterrupt";

/// Cooperative cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`EngineError::Interrupted`] when cancellation was
    /// requested. Engines call this at their suspension points.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// One frame of an interpreter traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TracebackFrame {
    pub file: SmolStr,
    pub line: u32,
    pub column: Option<u32>,
}

/// Normalized interpreter exception.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ExceptionInfo {
    pub file: SmolStr,
    pub line: u32,
    pub column: u32,
    pub kind: SmolStr,
    pub message: String,
    pub traceback: Vec<TracebackFrame>,
}

impl ExceptionInfo {
    /// The full message with a rendered traceback.
    #[must_use]
    pub fn raw(&self) -> String {
        let mut rendered = self.message.clone();
        for frame in &self.traceback {
            rendered.push_str(&format!("\n  at {} line {}", frame.file, frame.line));
            if let Some(column) = frame.column {
                rendered.push_str(&format!(" column {column}"));
            }
        }
        rendered
    }

    /// Whether this exception is a user-initiated stop.
    #[must_use]
    pub fn is_keyboard_interrupt(&self) -> bool {
        self.kind == KEYBOARD_INTERRUPT
    }
}

/// Failure modes of an engine execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Execution was stopped cooperatively.
    #[error("execution interrupted")]
    Interrupted,

    /// User code raised an exception.
    #[error("{}", .0.message)]
    Exception(ExceptionInfo),
}

/// The snapshot of the file the engine starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MainFile {
    pub name: SmolStr,
    pub code: String,
}

/// An embedded interpreter driven by the runner.
pub trait ScriptEngine: Send {
    /// Execute the main file to completion, consulting the context's
    /// cancellation token at every suspension point.
    fn execute(&mut self, main: &MainFile, ctx: &mut ExecContext) -> Result<(), EngineError>;
}

/// Everything an engine may touch during one execution.
pub struct ExecContext {
    files: VirtualFs,
    stdout: TerminalTransform,
    stdin: InputQueue,
    cancel: CancelToken,
}

impl ExecContext {
    pub(crate) fn new(
        files: VirtualFs,
        stdout: TerminalTransform,
        stdin: InputQueue,
        cancel: CancelToken,
    ) -> Self {
        Self {
            files,
            stdout,
            stdin,
            cancel,
        }
    }

    /// The cancellation token for this execution.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fail fast when cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), EngineError> {
        self.cancel.check()
    }

    /// Write to the process stdout (through the terminal transform).
    pub fn print(&self, text: &str) {
        self.stdout.write(text);
    }

    /// Block until one input line is available. Interrupted by `stop()`.
    pub fn read_line(&self) -> Result<String, EngineError> {
        self.cancel.check()?;
        self.stdin.read_line()
    }

    /// Resolve a module/file read: the project's files first, then the
    /// built-in file set.
    pub fn read_source(&self, path: &str) -> Result<String, IdeError> {
        self.files.import_read(path)
    }

    /// Open a file through the project, creating it for write modes.
    pub fn open_file(&self, path: &str, mode: FileMode) -> Result<FileAccess, IdeError> {
        self.files.open(path, mode)
    }

    /// Current contents behind an open handle.
    pub fn read_file(&self, access: &FileAccess) -> Result<String, IdeError> {
        self.files.read(access)
    }

    /// Append through an open handle. Fails on read-mode handles and on
    /// files deleted since opening.
    pub fn write_file(&self, access: &FileAccess, chunk: &str) -> Result<(), IdeError> {
        self.files.write(access, chunk)
    }
}
