//! Project files with annotations and rename tracking.

use std::sync::{Arc, Mutex, MutexGuard};

use smol_str::SmolStr;

use tafel_core::{ChangeNotifier, ListenerSet, Subscription};

/// Annotation severity in the editor gutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AnnotationKind {
    Error,
    Warning,
    Info,
}

impl AnnotationKind {
    #[allow(missing_docs)]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// One editor annotation, anchored to a position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Annotation {
    pub row: u32,
    pub column: u32,
    pub text: String,
    pub kind: AnnotationKind,
}

/// Payload of a file rename notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct RenameEvent {
    pub from: SmolStr,
    pub to: SmolStr,
}

struct FileInner {
    name: SmolStr,
    contents: String,
    dirty: bool,
    annotations: Vec<Annotation>,
    name_editable: bool,
    disposed: bool,
    renamed: ListenerSet<RenameEvent>,
    changed: ChangeNotifier,
}

/// A file open in the project. Owned by its tab; disposed when the tab
/// is removed.
#[derive(Clone)]
pub struct File {
    inner: Arc<Mutex<FileInner>>,
}

impl File {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, contents: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FileInner {
                name: name.into(),
                contents: contents.into(),
                dirty: false,
                annotations: Vec::new(),
                name_editable: false,
                disposed: false,
                renamed: ListenerSet::new(),
                changed: ChangeNotifier::new(),
            })),
        }
    }

    /// Whether two handles refer to the same file.
    #[must_use]
    pub fn same_file(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> SmolStr {
        self.lock().name.clone()
    }

    /// Rename the file. Emits a rename notification (carrying old and new
    /// name) followed by one change; a rename to the current name is a
    /// no-op.
    pub fn set_name(&self, name: impl Into<SmolStr>) {
        let name = name.into();
        let event = {
            let mut inner = self.lock();
            if inner.name == name {
                return;
            }
            let event = RenameEvent {
                from: inner.name.clone(),
                to: name.clone(),
            };
            inner.name = name;
            event
        };
        let (renamed, changed) = {
            let inner = self.lock();
            (inner.renamed.clone(), inner.changed.clone())
        };
        renamed.emit(&event);
        changed.notify();
    }

    /// Register a rename listener.
    #[must_use]
    pub fn on_rename(&self, callback: impl FnMut(&RenameEvent) + Send + 'static) -> Subscription {
        self.lock().renamed.subscribe(callback)
    }

    /// Register a change listener.
    #[must_use]
    pub fn on_change(&self, callback: impl FnMut() + Send + 'static) -> Subscription {
        self.lock().changed.subscribe(callback)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().contents.clone()
    }

    /// Replace the buffer, marking the file dirty.
    pub fn set_contents(&self, contents: impl Into<String>) {
        {
            let mut inner = self.lock();
            inner.contents = contents.into();
            inner.dirty = true;
        }
        self.notify();
    }

    /// Append to the buffer, marking the file dirty.
    pub fn append(&self, chunk: &str) {
        {
            let mut inner = self.lock();
            inner.contents.push_str(chunk);
            inner.dirty = true;
        }
        self.notify();
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Clear the dirty flag (after a successful save).
    pub fn mark_clean(&self) {
        self.lock().dirty = false;
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn annotations(&self) -> Vec<Annotation> {
        self.lock().annotations.clone()
    }

    /// Replace the annotation list and emit one change.
    pub fn set_annotations(&self, annotations: Vec<Annotation>) {
        self.lock().annotations = annotations;
        self.notify();
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_name_editable(&self) -> bool {
        self.lock().name_editable
    }

    /// Toggle inline rename mode and emit one change.
    pub fn set_name_editable(&self, editable: bool) {
        self.lock().name_editable = editable;
        self.notify();
    }

    /// Whether the file was disposed (its tab removed).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Detach all listeners and mark the file disposed.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        inner.disposed = true;
        inner.renamed.clear();
        inner.changed.clear();
    }

    fn notify(&self) {
        let changed = self.lock().changed.clone();
        changed.notify();
    }

    fn lock(&self) -> MutexGuard<'_, FileInner> {
        self.inner.lock().expect("file state poisoned")
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("File")
            .field("name", &inner.name)
            .field("dirty", &inner.dirty)
            .field("annotations", &inner.annotations.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rename_fires_listeners_with_old_and_new_name() {
        let file = File::new("main.py", "print(1)\n");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let _sub = file.on_rename(move |event| {
            seen_cb.lock().unwrap().push(event.clone());
        });

        file.set_name("start.py");
        file.set_name("start.py");

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1, "same-name rename is a no-op");
        assert_eq!(events[0].from, "main.py");
        assert_eq!(events[0].to, "start.py");
    }

    #[test]
    fn editing_marks_dirty_until_cleaned() {
        let file = File::new("main.py", "");
        assert!(!file.is_dirty());
        file.append("x = 1\n");
        assert!(file.is_dirty());
        file.mark_clean();
        assert!(!file.is_dirty());
    }

    #[test]
    fn dispose_detaches_listeners() {
        let file = File::new("main.py", "");
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        file.on_change(move || {
            count_cb.fetch_add(1, Ordering::SeqCst);
        })
        .forget();

        file.dispose();
        file.set_contents("x");
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(file.is_disposed());
    }
}
