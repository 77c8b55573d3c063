//! Virtual filesystem bridging the interpreter onto project files.
//!
//! Reads resolve against the project's open files, falling back to the
//! configured built-in file set (the interpreter's bundled modules).
//! Write modes create missing files as new (inactive) tabs; writing to a
//! file that was deleted mid-run is an error the interpreter surfaces to
//! the user's code.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::IdeError;
use crate::project::Project;

/// Open mode of a file handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Read-only handle.
    Read,
    /// Truncate or create.
    Write,
    /// Create if absent.
    Create,
    /// Binary modes are not supported.
    Binary,
}

impl FileMode {
    /// Parse a Python-style mode string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.contains('b') {
            Self::Binary
        } else if text.contains('w') {
            Self::Write
        } else if text.contains('x') {
            Self::Create
        } else {
            Self::Read
        }
    }

    /// Whether this mode may create a missing file.
    #[must_use]
    pub fn creates(self) -> bool {
        matches!(self, Self::Write | Self::Create)
    }
}

/// An open handle into the virtual filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAccess {
    name: SmolStr,
    mode: FileMode,
}

impl FileAccess {
    #[allow(missing_docs)]
    #[must_use]
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.mode
    }
}

/// Read/write boundary between an engine and the project.
#[derive(Debug, Clone)]
pub struct VirtualFs {
    project: Project,
    builtins: IndexMap<SmolStr, String>,
}

impl VirtualFs {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(project: Project, builtins: IndexMap<SmolStr, String>) -> Self {
        Self { project, builtins }
    }

    /// Module/source read: project files first, then builtins.
    pub fn import_read(&self, path: &str) -> Result<String, IdeError> {
        let name = normalize(path);
        if let Some(file) = self.project.file_for_name(name) {
            return Ok(file.contents());
        }
        if let Some(content) = self.builtins.get(path).or_else(|| self.builtins.get(name)) {
            return Ok(content.clone());
        }
        Err(IdeError::FileNotFound(SmolStr::new(path)))
    }

    /// Open a handle, applying the mode's create/truncate semantics.
    pub fn open(&self, path: &str, mode: FileMode) -> Result<FileAccess, IdeError> {
        let name = normalize(path);
        match mode {
            FileMode::Binary => return Err(IdeError::BinaryMode),
            FileMode::Write => match self.project.file_for_name(name) {
                Some(file) => file.set_contents(""),
                None => {
                    self.project.add_file(Some(name), "", false);
                }
            },
            FileMode::Create => {
                if !self.project.has_file(name) {
                    self.project.add_file(Some(name), "", false);
                }
            }
            FileMode::Read => {}
        }
        Ok(FileAccess {
            name: SmolStr::new(name),
            mode,
        })
    }

    /// Current contents behind a handle.
    pub fn read(&self, access: &FileAccess) -> Result<String, IdeError> {
        self.project
            .file_for_name(access.name())
            .map(|file| file.contents())
            .ok_or_else(|| IdeError::FileNotFound(access.name().clone()))
    }

    /// Append through a handle.
    pub fn write(&self, access: &FileAccess, chunk: &str) -> Result<(), IdeError> {
        if access.mode() == FileMode::Read {
            return Err(IdeError::ReadOnlyHandle(access.name().clone()));
        }
        match self.project.file_for_name(access.name()) {
            Some(file) => {
                file.append(chunk);
                Ok(())
            }
            None => Err(IdeError::FileDeleted(access.name().clone())),
        }
    }
}

/// Strip a leading `./` from interpreter-supplied paths.
fn normalize(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_mode_strings() {
        assert_eq!(FileMode::parse("r"), FileMode::Read);
        assert_eq!(FileMode::parse("w"), FileMode::Write);
        assert_eq!(FileMode::parse("x"), FileMode::Create);
        assert_eq!(FileMode::parse("rb"), FileMode::Binary);
        assert_eq!(FileMode::parse(""), FileMode::Read);
    }
}
