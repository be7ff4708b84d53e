//! Error types for notifier construction and lifecycle operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned synchronously by the notifier.
///
/// Failures tied to a single filesystem entry are not represented here;
/// they are delivered as [`EventKind::Error`](crate::EventKind::Error)
/// events on the notifier queue.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// Root path could not be inspected.
    #[error("invalid root directory path {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path exists but is not a directory.
    #[error("invalid root directory path {path}: not a directory")]
    NotADirectory { path: PathBuf },

    /// The seeding walk of the root directory failed.
    #[error("error parsing root directory {path}: {source}")]
    Initialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called on a running notifier.
    #[error("scan notifier has already started")]
    AlreadyStarted,

    /// The operation requires a running notifier.
    #[error("scan notifier is not running")]
    NotRunning,

    /// The notifier is shutting down.
    #[error("scan notifier is stopping")]
    Stopping,

    /// The notifier was never initialized or has been torn down.
    #[error("scan notifier is not (re)initialized")]
    NotReady,

    /// A path pattern failed to compile.
    #[error("invalid path pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Broken internal invariant.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl NotifierError {
    /// Create a root path error from an I/O failure.
    pub fn invalid_root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error reports a violated lifecycle precondition.
    ///
    /// No state change happens when one of these is returned.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted | Self::NotRunning | Self::Stopping | Self::NotReady
        )
    }

    /// Whether this error prevented a notifier from being constructed.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoot { .. } | Self::NotADirectory { .. } | Self::Initialization { .. }
        )
    }
}
