//! Path helpers shared by the tree and its callers.

use crate::error::{DirectoryError, Result};

/// Path separator.
pub const SEPARATOR: char = codex_glob::SEPARATOR;

/// Current-folder navigation segment.
pub const CURRENT: &str = ".";

/// Parent-folder navigation segment.
pub const PARENT: &str = "..";

/// Split a path into its non-empty segments.
///
/// Leading, trailing and repeated separators are ignored.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    format!("{parent}{SEPARATOR}{name}")
}

/// Check that `name` can be used as a single item name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == CURRENT || name == PARENT || name.contains(SEPARATOR) {
        return Err(DirectoryError::InvalidName(name.to_string()));
    }
    Ok(())
}
