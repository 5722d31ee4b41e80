//! Structural change events raised by tree items.

use crate::content::ContentRef;
use crate::item::{DirectoryItem, ItemKind};

/// Immutable copy of an item's state, detached from the tree.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    /// Name at the time of the snapshot.
    pub name: String,

    /// Full path at the time of the snapshot.
    pub path: String,

    /// Folder or file.
    pub kind: ItemKind,

    /// Content handle at the time of the snapshot.
    pub content: ContentRef,
}

impl ItemSnapshot {
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    pub fn exists(&self) -> bool {
        self.content.exists()
    }
}

/// A child was inserted into a folder.
#[derive(Debug, Clone)]
pub struct ItemAdded {
    /// The new child.
    pub item: DirectoryItem,
}

/// An item's content, name or path changed.
#[derive(Debug, Clone)]
pub struct ItemUpdated {
    /// State before the change.
    pub old: ItemSnapshot,

    /// The live item, after the change.
    pub new: DirectoryItem,
}

impl ItemUpdated {
    /// Path before the change.
    pub fn old_path(&self) -> &str {
        &self.old.path
    }

    /// Whether the item's path differs from the snapshot's.
    pub fn path_changed(&self) -> bool {
        self.old.path != self.new.path()
    }
}

/// An item was unlinked from the tree.
#[derive(Debug, Clone)]
pub struct ItemDeleted {
    /// The detached item. Its content no longer exists.
    pub item: DirectoryItem,

    /// The last path the item had while attached.
    pub path: String,
}
