//! Tabs and tab kinds.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::file::File;

static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

/// What a tab displays.
#[derive(Debug, Clone)]
pub enum TabKind {
    /// An editable project file.
    File(File),
    /// The process/terminal output panel.
    Process,
    /// The analytics/insights panel.
    Insights,
}

impl TabKind {
    /// Whether this tab holds a file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// The file behind the tab, if any.
    #[must_use]
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Whether two kinds show the same item (same file handle, or the
    /// same singleton panel).
    #[must_use]
    pub fn same_item(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::File(a), Self::File(b)) => a.same_file(b),
            (Self::Process, Self::Process) | (Self::Insights, Self::Insights) => true,
            _ => false,
        }
    }
}

/// One tab in the project's ordered tab list.
///
/// The `unique_id` is immutable once created; list position is the
/// display order.
#[derive(Debug, Clone)]
pub struct Tab {
    #[allow(missing_docs)]
    pub kind: TabKind,
    #[allow(missing_docs)]
    pub active: bool,
    unique_id: u64,
}

impl Tab {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(kind: TabKind) -> Self {
        Self {
            kind,
            active: false,
            unique_id: NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }
}
