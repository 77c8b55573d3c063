//! Output and input streams of the execution bridge.
//!
//! Interpreter output flows through a [`TerminalTransform`] (which
//! normalizes bare line feeds to CRLF for the terminal widget and
//! renders error/status lines with ANSI colors) into an [`OutputStream`]
//! the UI subscribes to. Input is a line queue: typed characters are
//! echoed back to the output, a carriage return completes the pending
//! line, and a blocked read is released by input or interruption.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use tafel_core::{ListenerSet, Subscription};

use crate::runner::engine::EngineError;

struct OutputInner {
    buffer: String,
    chunks: ListenerSet<String>,
}

/// The public stdout/stderr stream of a run. Retains everything written
/// and notifies chunk listeners as output arrives.
#[derive(Clone)]
pub struct OutputStream {
    inner: Arc<Mutex<OutputInner>>,
}

impl Default for OutputStream {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputStream {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(OutputInner {
                buffer: String::new(),
                chunks: ListenerSet::new(),
            })),
        }
    }

    /// Append a chunk and notify listeners.
    pub fn write(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let chunks = {
            let mut inner = self.inner.lock().expect("output stream poisoned");
            inner.buffer.push_str(chunk);
            inner.chunks.clone()
        };
        chunks.emit(&chunk.to_string());
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.inner
            .lock()
            .expect("output stream poisoned")
            .buffer
            .clone()
    }

    /// Drop the retained buffer (listeners stay).
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("output stream poisoned")
            .buffer
            .clear();
    }

    /// Subscribe to output chunks.
    #[must_use]
    pub fn on_chunk(&self, callback: impl FnMut(&String) + Send + 'static) -> Subscription {
        self.inner
            .lock()
            .expect("output stream poisoned")
            .chunks
            .subscribe(callback)
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("output stream poisoned");
        f.debug_struct("OutputStream")
            .field("len", &inner.buffer.len())
            .finish()
    }
}

/// Terminal-control-sequence transform in front of an [`OutputStream`].
#[derive(Debug, Clone)]
pub struct TerminalTransform {
    out: OutputStream,
}

impl TerminalTransform {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(out: OutputStream) -> Self {
        Self { out }
    }

    /// Write text, normalizing bare `\n` to `\r\n`.
    pub fn write(&self, text: &str) {
        self.out.write(&crlf(text));
    }

    /// Write a red error line.
    pub fn write_error(&self, message: &str) {
        self.out.write(&format!("\x1b[31m{message}\x1b[m\r\n"));
    }

    /// Write a blue status line.
    pub fn write_status(&self, message: &str) {
        self.out
            .write(&format!("\x1b[34m ---- {message} ---- \x1b[m\r\n"));
    }

    /// The stream behind the transform.
    #[must_use]
    pub fn stream(&self) -> OutputStream {
        self.out.clone()
    }
}

fn crlf(text: &str) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut previous = '\0';
    for current in text.chars() {
        if current == '\n' && previous != '\r' {
            rendered.push('\r');
        }
        rendered.push(current);
        previous = current;
    }
    rendered
}

struct InputState {
    pending: String,
    lines: VecDeque<String>,
    interrupted: bool,
}

/// Line-oriented stdin queue with echo.
#[derive(Clone)]
pub struct InputQueue {
    state: Arc<(Mutex<InputState>, Condvar)>,
    echo: OutputStream,
}

impl InputQueue {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(echo: OutputStream) -> Self {
        Self {
            state: Arc::new((
                Mutex::new(InputState {
                    pending: String::new(),
                    lines: VecDeque::new(),
                    interrupted: false,
                }),
                Condvar::new(),
            )),
            echo,
        }
    }

    /// Feed typed characters. Characters are echoed to the output; a
    /// carriage return completes the pending line and releases a blocked
    /// reader.
    pub fn push(&self, chunk: &str) {
        let mut echoed = String::new();
        {
            let (lock, cvar) = &*self.state;
            let mut state = lock.lock().expect("input queue poisoned");
            for current in chunk.chars() {
                if current == '\r' {
                    let line = std::mem::take(&mut state.pending);
                    state.lines.push_back(line);
                    echoed.push_str("\n\r");
                    cvar.notify_all();
                } else {
                    state.pending.push(current);
                    echoed.push(current);
                }
            }
        }
        self.echo.write(&echoed);
    }

    /// Block until a full line is available, or until interrupted.
    pub fn read_line(&self) -> Result<String, EngineError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("input queue poisoned");
        loop {
            if let Some(line) = state.lines.pop_front() {
                return Ok(line);
            }
            if state.interrupted {
                return Err(EngineError::Interrupted);
            }
            state = cvar.wait(state).expect("input queue wait poisoned");
        }
    }

    /// Release blocked readers with an interruption.
    pub fn interrupt(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().expect("input queue poisoned").interrupted = true;
        cvar.notify_all();
    }
}

impl std::fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("input queue poisoned");
        f.debug_struct("InputQueue")
            .field("queued", &state.lines.len())
            .field("interrupted", &state.interrupted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_normalizes_bare_newlines_only() {
        assert_eq!(crlf("a\nb"), "a\r\nb");
        assert_eq!(crlf("a\r\nb"), "a\r\nb");
        assert_eq!(crlf("\n\n"), "\r\n\r\n");
    }

    #[test]
    fn carriage_return_completes_a_line_and_echoes() {
        let out = OutputStream::new();
        let queue = InputQueue::new(out.clone());
        queue.push("4");
        queue.push("2\r");
        assert_eq!(queue.read_line().unwrap(), "42");
        assert_eq!(out.contents(), "42\n\r");
    }

    #[test]
    fn interrupt_releases_a_blocked_reader() {
        let out = OutputStream::new();
        let queue = InputQueue::new(out);
        let reader = queue.clone();
        let handle = std::thread::spawn(move || reader.read_line());
        queue.interrupt();
        assert_eq!(handle.join().unwrap(), Err(EngineError::Interrupted));
    }
}
