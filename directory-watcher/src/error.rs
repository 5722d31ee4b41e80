//! Error types for the directory watcher.

use codex_glob::GlobError;
use codex_virtual_fs::DirectoryError;
use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatcherError {
    /// A filter pattern failed to compile.
    #[error("invalid filter: {0}")]
    Pattern(#[from] GlobError),

    /// The tree rejected an operation made on the watcher's behalf.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
