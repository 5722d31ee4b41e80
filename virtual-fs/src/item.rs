//! Tree nodes and the operations shared by folders and files.
//!
//! A folder owns its children through `Arc`s stored in its children map. A
//! child points back at its folder through a `Weak`, which is only used to
//! compute paths and to follow the folder's `Updated` events. Paths are never
//! stored: renaming a folder changes the path of everything below it without
//! touching the descendants.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::content::{ContentRef, NotFoundContent};
use crate::error::{DirectoryError, Result};
use crate::event::{ItemAdded, ItemDeleted, ItemSnapshot, ItemUpdated};
use crate::folder::Folder;
use crate::observer::{EventHandlers, EventSource, SubscriptionId};
use crate::path::{self, SEPARATOR};

/// The two kinds of tree item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Folder,
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Folder => f.write_str("folder"),
            ItemKind::File => f.write_str("file"),
        }
    }
}

pub(crate) struct Node {
    kind: ItemKind,
    content: RwLock<ContentRef>,
    parent: RwLock<Weak<Node>>,
    /// Subscription on the parent's `updated` list driving cascading updates.
    parent_link: Mutex<Option<SubscriptionId>>,
    pub(crate) children: RwLock<HashMap<String, DirectoryItem>>,
    /// Set by folder deletion while holding the `children` write lock.
    closed: AtomicBool,
    pub(crate) added: EventHandlers<ItemAdded>,
    updated: EventHandlers<ItemUpdated>,
    deleted: EventHandlers<ItemDeleted>,
}

impl Node {
    /// Whether new children may be inserted. Callers hold the `children`
    /// lock so the answer cannot change under them.
    pub(crate) fn accepts_children(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.content.read().exists()
    }

    /// Refuse further insertions. Callers hold the `children` write lock.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Handle to a folder or file in the tree.
///
/// Handles are cheap to clone and all clones refer to the same node.
/// Equality compares full paths at the time of the comparison; use
/// [`DirectoryItem::same_node`] for identity.
#[derive(Clone)]
pub struct DirectoryItem {
    pub(crate) node: Arc<Node>,
}

impl DirectoryItem {
    pub(crate) fn detached(kind: ItemKind, content: ContentRef) -> Self {
        Self {
            node: Arc::new(Node {
                kind,
                content: RwLock::new(content),
                parent: RwLock::new(Weak::new()),
                parent_link: Mutex::new(None),
                children: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
                added: EventHandlers::new(),
                updated: EventHandlers::new(),
                deleted: EventHandlers::new(),
            }),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.node.kind
    }

    pub fn is_folder(&self) -> bool {
        self.node.kind == ItemKind::Folder
    }

    /// Local name.
    pub fn name(&self) -> String {
        self.node.content.read().name().to_string()
    }

    /// Full path, computed from the current parent chain.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut cursor = self.parent_node();
        while let Some(node) = cursor {
            names.push(node.content.read().name().to_string());
            cursor = node.parent.read().upgrade();
        }
        names.reverse();
        names.join(&SEPARATOR.to_string())
    }

    /// Current content handle.
    pub fn content(&self) -> ContentRef {
        self.node.content.read().clone()
    }

    /// `false` once the item has been deleted.
    pub fn exists(&self) -> bool {
        self.node.content.read().exists()
    }

    /// The folder this item lives in.
    pub fn parent(&self) -> Option<Folder> {
        self.parent_node()
            .map(|node| Folder::from_item(DirectoryItem { node }))
    }

    pub fn as_folder(&self) -> Option<Folder> {
        self.is_folder().then(|| Folder::from_item(self.clone()))
    }

    pub fn as_file(&self) -> Option<File> {
        (!self.is_folder()).then(|| File { item: self.clone() })
    }

    /// Whether both handles refer to the same node.
    pub fn same_node(&self, other: &DirectoryItem) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            name: self.name(),
            path: self.path(),
            kind: self.kind(),
            content: self.content(),
        }
    }

    /// Raised after the content, name or path of this item changed.
    pub fn updated(&self) -> EventSource<'_, ItemUpdated> {
        EventSource::new(&self.node.updated)
    }

    /// Raised once this item has been unlinked from the tree.
    pub fn deleted(&self) -> EventSource<'_, ItemDeleted> {
        EventSource::new(&self.node.deleted)
    }

    /// Rename the item in place.
    pub fn rename(&self, new_name: &str) -> Result<()> {
        path::validate_name(new_name)?;
        let content = self.content().with_name(new_name);
        self.update(content)
    }

    /// Replace the content handle.
    ///
    /// A content name different from the current one renames the item. The
    /// sibling check and the re-keying happen under the parent's lock. The
    /// root cannot be renamed.
    pub fn update(&self, content: ContentRef) -> Result<()> {
        let old = self.snapshot();
        if !old.exists() {
            return Err(DirectoryError::Deleted(old.path));
        }
        if content.is_directory() != self.is_folder() {
            return Err(DirectoryError::TypeConflict {
                path: old.path,
                expected: self.kind(),
            });
        }

        let new_name = content.name().to_string();
        if new_name == old.name {
            *self.node.content.write() = content;
        } else {
            path::validate_name(&new_name)?;
            match self.parent_node() {
                Some(parent) => {
                    let mut children = parent.children.write();
                    if children.contains_key(&new_name) {
                        return Err(DirectoryError::DuplicateName {
                            parent: parent_path(&old.path),
                            name: new_name,
                        });
                    }
                    match children.remove(&old.name) {
                        Some(existing) if existing.same_node(self) => {}
                        Some(other) => {
                            children.insert(old.name.clone(), other);
                            return Err(DirectoryError::Deleted(old.path));
                        }
                        None => return Err(DirectoryError::Deleted(old.path)),
                    }
                    children.insert(new_name.clone(), self.clone());
                    *self.node.content.write() = content;
                }
                None => {
                    return Err(DirectoryError::InvalidMove {
                        from: old.path,
                        to: new_name,
                    });
                }
            }
            debug!("Renamed {} to {new_name}", old.path);
        }

        self.node.updated.emit(&ItemUpdated {
            old,
            new: self.clone(),
        });
        Ok(())
    }

    /// Delete the item. Folders must be empty; see [`Folder::delete`] for
    /// recursive deletion.
    pub fn delete(&self) -> Result<()> {
        match self.as_folder() {
            Some(folder) => folder.delete(false),
            None => {
                self.unlink();
                Ok(())
            }
        }
    }

    /// Move the item into another folder, keeping its name.
    pub fn move_to(&self, destination: &Folder) -> Result<()> {
        let old = self.snapshot();
        if !old.exists() {
            return Err(DirectoryError::Deleted(old.path));
        }
        if !destination.exists() {
            return Err(DirectoryError::Deleted(destination.path()));
        }

        let mut cursor = Some(destination.item().clone());
        while let Some(ancestor) = cursor {
            if ancestor.same_node(self) {
                return Err(DirectoryError::InvalidMove {
                    from: old.path,
                    to: destination.path(),
                });
            }
            cursor = ancestor.parent_node().map(|node| DirectoryItem { node });
        }

        let Some(source) = self.parent_node() else {
            return Err(DirectoryError::InvalidMove {
                from: old.path,
                to: destination.path(),
            });
        };
        let target = &destination.item().node;
        if Arc::ptr_eq(&source, target) {
            return Ok(());
        }

        {
            // Lock both maps in address order so concurrent moves cannot deadlock.
            let source_first = Arc::as_ptr(&source) < Arc::as_ptr(target);
            let (mut first, mut second) = if source_first {
                (source.children.write(), target.children.write())
            } else {
                (target.children.write(), source.children.write())
            };
            let (from, to) = if source_first {
                (&mut *first, &mut *second)
            } else {
                (&mut *second, &mut *first)
            };

            if !target.accepts_children() {
                return Err(DirectoryError::Deleted(destination.path()));
            }
            if to.contains_key(&old.name) {
                return Err(DirectoryError::DuplicateName {
                    parent: destination.path(),
                    name: old.name,
                });
            }
            match from.get(&old.name) {
                Some(existing) if existing.same_node(self) => {}
                _ => return Err(DirectoryError::Deleted(old.path)),
            }
            if let Some(moved) = from.remove(&old.name) {
                to.insert(old.name.clone(), moved);
            }
            *self.node.parent.write() = Arc::downgrade(target);
        }

        if let Some(id) = self.node.parent_link.lock().take() {
            source.updated.unsubscribe(id);
        }
        self.follow_parent(target);

        debug!("Moved {} to {}", old.path, destination.path());
        self.node.updated.emit(&ItemUpdated {
            old,
            new: self.clone(),
        });
        Ok(())
    }

    /// Attach this detached item under `parent`. The caller inserts it into
    /// the parent's children map.
    pub(crate) fn attach_to(&self, parent: &Arc<Node>) {
        *self.node.parent.write() = Arc::downgrade(parent);
        self.follow_parent(parent);
    }

    fn follow_parent(&self, parent: &Arc<Node>) {
        let child = Arc::downgrade(&self.node);
        let id = parent.updated.subscribe(move |event: &ItemUpdated| {
            if let Some(node) = child.upgrade() {
                DirectoryItem { node }.on_parent_updated(event);
            }
        });
        *self.node.parent_link.lock() = Some(id);
    }

    /// Re-raise a parent's path change as an update of this item.
    fn on_parent_updated(&self, event: &ItemUpdated) {
        if !event.path_changed() {
            return;
        }

        let name = self.name();
        let old = ItemSnapshot {
            path: path::join(&event.old.path, &name),
            name,
            kind: self.kind(),
            content: self.content(),
        };
        trace!("Cascading path update {} -> {}", old.path, self.path());
        self.node.updated.emit(&ItemUpdated {
            old,
            new: self.clone(),
        });
    }

    /// Remove the item from its parent's map and finish the deletion.
    /// Deleting an item that is already gone does nothing.
    pub(crate) fn unlink(&self) {
        if !self.exists() {
            return;
        }
        match self.parent_node() {
            Some(parent) => {
                let removed = {
                    let mut children = parent.children.write();
                    let name = self.name();
                    match children.get(&name) {
                        Some(existing) if existing.same_node(self) => children.remove(&name),
                        _ => None,
                    }
                };
                if let Some(removed) = removed {
                    removed.on_removed();
                }
            }
            None => self.on_removed(),
        }
    }

    /// Detach from the parent, install the not-found content and raise
    /// `Deleted`.
    fn on_removed(&self) {
        let path = self.path();
        let old_parent = std::mem::take(&mut *self.node.parent.write());
        if let Some(id) = self.node.parent_link.lock().take()
            && let Some(parent) = old_parent.upgrade()
        {
            parent.updated.unsubscribe(id);
        }

        let was_live = {
            let mut content = self.node.content.write();
            let live = content.exists();
            if live {
                *content = Arc::new(NotFoundContent::new(content.name(), self.is_folder()));
            }
            live
        };

        if was_live {
            debug!("Deleted {} {path}", self.kind());
            self.node.deleted.emit(&ItemDeleted {
                item: self.clone(),
                path,
            });
        }
    }

    fn parent_node(&self) -> Option<Arc<Node>> {
        self.node.parent.read().upgrade()
    }
}

fn parent_path(path: &str) -> String {
    match path.rfind(SEPARATOR) {
        Some(index) => path[..index].to_string(),
        None => String::new(),
    }
}

impl PartialEq for DirectoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for DirectoryItem {}

impl fmt::Debug for DirectoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryItem")
            .field("kind", &self.kind())
            .field("path", &self.path())
            .field("exists", &self.exists())
            .finish()
    }
}

/// A file in the tree.
#[derive(Clone, PartialEq, Eq)]
pub struct File {
    item: DirectoryItem,
}

impl File {
    pub(crate) fn detached(content: ContentRef) -> Self {
        Self {
            item: DirectoryItem::detached(ItemKind::File, content),
        }
    }

    pub fn item(&self) -> &DirectoryItem {
        &self.item
    }

    pub fn into_item(self) -> DirectoryItem {
        self.item
    }

    /// Read the whole file as UTF-8.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut text = String::new();
        self.content().open_read()?.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl Deref for File {
    type Target = DirectoryItem;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("File").field(&self.path()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContent;
    use crate::directory::Directory;
    use pretty_assertions::assert_eq;

    fn text(name: &str, body: &str) -> ContentRef {
        MemoryContent::from_string(name, body).into_ref()
    }

    #[test]
    fn test_path_follows_parent_chain() {
        let directory = Directory::new();
        let file = directory.add_file("/a/b", text("c.txt", "")).unwrap();

        assert_eq!(file.path(), "/a/b/c.txt");
        assert_eq!(directory.root().path(), "");
        assert_eq!(file.parent().map(|p| p.path()), Some("/a/b".to_string()));
    }

    #[test]
    fn test_update_replaces_content_and_raises_event() {
        let directory = Directory::new();
        let file = directory.add_file("/docs", text("a.txt", "one")).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        file.updated().subscribe(move |e: &ItemUpdated| {
            sink.lock().push((e.old.content.len(), e.new.content().len()));
        });

        file.update(text("a.txt", "three")).unwrap();

        assert_eq!(*events.lock(), vec![(3, 5)]);
        assert_eq!(file.read_to_string().unwrap(), "three");
    }

    #[test]
    fn test_root_cannot_be_renamed() {
        let directory = Directory::new();
        let file = directory.add_file("/a", text("b.txt", "")).unwrap();

        assert_eq!(
            directory.root().rename("x"),
            Err(DirectoryError::InvalidMove {
                from: String::new(),
                to: "x".to_string(),
            })
        );
        assert_eq!(directory.root().name(), "");
        assert_eq!(file.path(), "/a/b.txt");
        assert_eq!(directory.search("/a/*.txt").unwrap().count(), 1);
    }

    #[test]
    fn test_update_rejects_kind_change() {
        let directory = Directory::new();
        let folder = directory.get_or_add_folder("/docs").unwrap();
        let result = folder.update(text("docs", ""));
        assert!(matches!(
            result,
            Err(DirectoryError::TypeConflict {
                expected: ItemKind::Folder,
                ..
            })
        ));
    }

    #[test]
    fn test_rename_rekeys_parent() {
        let directory = Directory::new();
        let file = directory.add_file("/docs", text("a.txt", "")).unwrap();

        file.rename("b.txt").unwrap();

        assert_eq!(file.path(), "/docs/b.txt");
        assert!(directory.resolve("/docs/a.txt").is_none());
        assert!(
            directory
                .resolve("/docs/b.txt")
                .is_some_and(|found| found.same_node(&file))
        );
    }

    #[test]
    fn test_rename_collision_fails_without_changes() {
        let directory = Directory::new();
        let a = directory.add_file("/docs", text("a.txt", "")).unwrap();
        directory.add_file("/docs", text("b.txt", "")).unwrap();

        let result = a.rename("b.txt");

        assert_eq!(
            result,
            Err(DirectoryError::DuplicateName {
                parent: "/docs".to_string(),
                name: "b.txt".to_string(),
            })
        );
        assert_eq!(a.path(), "/docs/a.txt");
    }

    #[test]
    fn test_delete_file_marks_content_missing() {
        let directory = Directory::new();
        let file = directory.add_file("/docs", text("a.txt", "x")).unwrap();
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        file.deleted()
            .subscribe(move |e: &ItemDeleted| sink.lock().push(e.path.clone()));

        file.delete().unwrap();
        file.delete().unwrap();

        assert!(!file.exists());
        assert!(file.parent().is_none());
        assert_eq!(*deleted.lock(), vec!["/docs/a.txt".to_string()]);
        assert_eq!(
            file.update(text("a.txt", "y")),
            Err(DirectoryError::Deleted("a.txt".to_string()))
        );
    }

    #[test]
    fn test_move_to_other_folder() {
        let directory = Directory::new();
        let file = directory.add_file("/a", text("x.txt", "")).unwrap();
        let target = directory.get_or_add_folder("/b/c").unwrap();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let sink = paths.clone();
        file.updated().subscribe(move |e: &ItemUpdated| {
            sink.lock().push((e.old.path.clone(), e.new.path()));
        });

        file.move_to(&target).unwrap();

        assert_eq!(file.path(), "/b/c/x.txt");
        assert!(directory.resolve("/a/x.txt").is_none());
        assert_eq!(
            *paths.lock(),
            vec![("/a/x.txt".to_string(), "/b/c/x.txt".to_string())]
        );
    }

    #[test]
    fn test_move_folder_into_descendant_fails() {
        let directory = Directory::new();
        let outer = directory.get_or_add_folder("/a").unwrap();
        let inner = directory.get_or_add_folder("/a/b").unwrap();

        assert!(matches!(
            outer.move_to(&inner),
            Err(DirectoryError::InvalidMove { .. })
        ));
        assert!(matches!(
            outer.move_to(&outer),
            Err(DirectoryError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_moved_item_follows_new_parent() {
        let directory = Directory::new();
        let file = directory.add_file("/a", text("x.txt", "")).unwrap();
        let b = directory.get_or_add_folder("/b").unwrap();
        file.move_to(&b).unwrap();

        let paths = Arc::new(Mutex::new(Vec::new()));
        let sink = paths.clone();
        file.updated()
            .subscribe(move |e: &ItemUpdated| sink.lock().push(e.new.path()));

        // The old parent no longer drives updates, the new one does.
        directory.get_folder("/a").unwrap().rename("a2").unwrap();
        b.rename("b2").unwrap();

        assert_eq!(*paths.lock(), vec!["/b2/x.txt".to_string()]);
    }
}
