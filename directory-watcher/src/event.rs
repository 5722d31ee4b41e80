//! Notifications raised by the directory watcher.

use chrono::{DateTime, Utc};
use codex_virtual_fs::{ItemAdded, ItemDeleted, ItemUpdated};
use serde::{Deserialize, Serialize};

/// A tree event together with the filters its path matched.
#[derive(Debug, Clone)]
pub struct WatchEvent<E> {
    /// The underlying tree event.
    pub event: E,

    /// Every registered filter that matched, in registration order.
    pub matched_filters: Vec<String>,
}

/// Any watcher notification, as delivered through
/// [`DirectoryWatcher::subscribe`](crate::DirectoryWatcher::subscribe).
#[derive(Debug, Clone)]
pub enum WatchNotification {
    ItemAdded(WatchEvent<ItemAdded>),
    ItemUpdated(WatchEvent<ItemUpdated>),
    ItemDeleted(WatchEvent<ItemDeleted>),
}

impl WatchNotification {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::ItemAdded(_) => ChangeKind::Added,
            Self::ItemUpdated(_) => ChangeKind::Updated,
            Self::ItemDeleted(_) => ChangeKind::Deleted,
        }
    }

    /// Path the notification is about. Deleted items report their last path.
    pub fn path(&self) -> String {
        match self {
            Self::ItemAdded(e) => e.event.item.path(),
            Self::ItemUpdated(e) => e.event.new.path(),
            Self::ItemDeleted(e) => e.event.path.clone(),
        }
    }

    pub fn matched_filters(&self) -> &[String] {
        match self {
            Self::ItemAdded(e) => &e.matched_filters,
            Self::ItemUpdated(e) => &e.matched_filters,
            Self::ItemDeleted(e) => &e.matched_filters,
        }
    }

    pub fn is_folder(&self) -> bool {
        match self {
            Self::ItemAdded(e) => e.event.item.is_folder(),
            Self::ItemUpdated(e) => e.event.new.is_folder(),
            Self::ItemDeleted(e) => e.event.item.is_folder(),
        }
    }

    /// Serializable summary of this notification, stamped with the current
    /// time.
    pub fn to_record(&self) -> ChangeRecord {
        let old_path = match self {
            Self::ItemUpdated(e) if e.event.path_changed() => Some(e.event.old.path.clone()),
            _ => None,
        };

        ChangeRecord {
            kind: self.kind(),
            path: self.path(),
            old_path,
            is_folder: self.is_folder(),
            matched_filters: self.matched_filters().to_vec(),
            timestamp: Utc::now(),
        }
    }
}

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

/// Plain-data form of a [`WatchNotification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Path of the affected item.
    pub path: String,

    /// Previous path, for updates that moved or renamed the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,

    /// Whether the item is a folder.
    pub is_folder: bool,

    /// Filters that matched `path`.
    pub matched_filters: Vec<String>,

    /// When the record was created.
    pub timestamp: DateTime<Utc>,
}
