//! Error types for the virtual file system.

use codex_glob::GlobError;
use thiserror::Error;

use crate::item::ItemKind;

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors raised by structural operations on the tree.
///
/// Every variant is detected before the tree is touched, so a failed call
/// leaves the tree as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Non-recursive delete of a folder that still has children.
    #[error("folder is not empty: {0}")]
    NotEmpty(String),

    /// A sibling with the same name already exists.
    #[error("an item named {name} already exists in {parent:?}")]
    DuplicateName { parent: String, name: String },

    /// A file was used where a folder was needed, or the reverse.
    #[error("{path} is not a {expected}")]
    TypeConflict { path: String, expected: ItemKind },

    /// Empty names, names containing a separator, `.` and `..`.
    #[error("invalid item name: {0:?}")]
    InvalidName(String),

    /// Moving a folder into itself or one of its descendants.
    #[error("cannot move {from} into {to}")]
    InvalidMove { from: String, to: String },

    /// The item has already been deleted.
    #[error("item has been deleted: {0}")]
    Deleted(String),

    /// Search pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] GlobError),
}
