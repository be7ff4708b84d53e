//! Change events and the entry types they describe.

use std::fmt;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use strum::Display;

/// Type of filesystem entry an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (never followed).
    Symlink,
    /// Sockets, devices, fifos and anything else.
    Unsupported,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Unsupported
        }
    }
}

/// What happened to an entry since the previous pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventKind {
    /// Entry appeared (or was seen for the first time after a flush).
    Create,
    /// Modification time changed.
    Modify,
    /// Entry vanished.
    Delete,
    /// Permission bits changed.
    Perm,
    /// Entry could not be read.
    Error,
    /// Entry was seen and nothing changed.
    NoChange,
}

/// A single change notification.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Resolved entry type.
    #[serde(rename = "type")]
    pub entry: EntryKind,
    /// Kind of change.
    pub kind: EventKind,
    /// Underlying failure for [`EventKind::Error`] events.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<std::io::Error>>,
}

impl Event {
    /// Create an event without an error.
    pub fn new(path: impl Into<PathBuf>, entry: EntryKind, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            entry,
            kind,
            error: None,
        }
    }

    /// Create an [`EventKind::Error`] event.
    pub fn error(path: impl Into<PathBuf>, entry: EntryKind, error: std::io::Error) -> Self {
        Self {
            path: path.into(),
            entry,
            kind: EventKind::Error,
            error: Some(Arc::new(error)),
        }
    }

    /// Path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.entry, self.path.display())?;
        if let Some(err) = &self.error {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<std::io::Error>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}
