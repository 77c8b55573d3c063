//! IDE model errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the project model and the runner's file bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdeError {
    /// No file with the given name exists, locally or in the builtins.
    #[error("file not found: '{0}'")]
    FileNotFound(SmolStr),

    /// The file was deleted while the interpreter held a handle to it.
    #[error("file has been deleted, cannot write: '{0}'")]
    FileDeleted(SmolStr),

    /// Write attempted through a read-mode handle.
    #[error("file is in readonly mode, cannot write: '{0}'")]
    ReadOnlyHandle(SmolStr),

    /// Binary file modes are not supported by the bridge.
    #[error("binary mode is not supported")]
    BinaryMode,

    /// The project mode does not permit saving.
    #[error("saving is not permitted in mode '{0}'")]
    SaveNotPermitted(SmolStr),

    /// No save backend is configured for this session.
    #[error("no save backend configured")]
    NoStorage,
}
