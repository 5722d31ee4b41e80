//! Folder operations.

use std::fmt;
use std::ops::Deref;

use tracing::debug;

use crate::content::{ContentRef, DirectoryContent};
use crate::error::{DirectoryError, Result};
use crate::event::ItemAdded;
use crate::item::{DirectoryItem, File, ItemKind};
use crate::observer::EventSource;
use crate::path;

/// A folder in the tree.
#[derive(Clone, PartialEq, Eq)]
pub struct Folder {
    item: DirectoryItem,
}

enum Insert {
    Created(File),
    Existing(File),
}

impl Folder {
    /// The root of a new tree.
    pub(crate) fn root() -> Self {
        Self::detached("")
    }

    fn detached(name: &str) -> Self {
        Self {
            item: DirectoryItem::detached(ItemKind::Folder, DirectoryContent::new(name).into_ref()),
        }
    }

    pub(crate) fn from_item(item: DirectoryItem) -> Self {
        debug_assert!(item.is_folder());
        Self { item }
    }

    pub fn item(&self) -> &DirectoryItem {
        &self.item
    }

    pub fn into_item(self) -> DirectoryItem {
        self.item
    }

    /// Raised when a child is inserted.
    pub fn added(&self) -> EventSource<'_, ItemAdded> {
        EventSource::new(&self.item.node.added)
    }

    /// Direct child by name.
    pub fn get(&self, name: &str) -> Option<DirectoryItem> {
        self.item.node.children.read().get(name).cloned()
    }

    /// Snapshot of the direct children.
    pub fn children(&self) -> Vec<DirectoryItem> {
        self.item.node.children.read().values().cloned().collect()
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.children()
            .iter()
            .filter_map(DirectoryItem::as_folder)
            .collect()
    }

    pub fn files(&self) -> Vec<File> {
        self.children()
            .iter()
            .filter_map(DirectoryItem::as_file)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.item.node.children.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.item.node.children.read().is_empty()
    }

    /// Return the child folder `name`, creating it when missing.
    ///
    /// Lookup and insertion happen under one write lock, so concurrent
    /// callers get the same folder and `Added` fires once.
    pub fn get_or_add_folder(&self, name: &str) -> Result<Folder> {
        path::validate_name(name)?;

        let (folder, created) = {
            let mut children = self.item.node.children.write();
            self.ensure_open()?;
            match children.get(name) {
                Some(existing) => match existing.as_folder() {
                    Some(folder) => (folder, false),
                    None => {
                        return Err(DirectoryError::TypeConflict {
                            path: existing.path(),
                            expected: ItemKind::Folder,
                        });
                    }
                },
                None => {
                    let folder = Folder::detached(name);
                    folder.item.attach_to(&self.item.node);
                    children.insert(name.to_string(), folder.item.clone());
                    (folder, true)
                }
            }
        };

        if created {
            debug!("Created folder {}", folder.path());
            self.item.node.added.emit(&ItemAdded {
                item: folder.item.clone(),
            });
        }
        Ok(folder)
    }

    /// Insert a new file. Fails when the name is taken.
    pub fn add_file(&self, content: ContentRef) -> Result<File> {
        check_file_content(&self.path(), &content)?;
        let name = content.name().to_string();

        let file = {
            let mut children = self.item.node.children.write();
            self.ensure_open()?;
            if children.contains_key(&name) {
                return Err(DirectoryError::DuplicateName {
                    parent: self.path(),
                    name,
                });
            }
            let file = File::detached(content);
            file.attach_to(&self.item.node);
            children.insert(name, file.item().clone());
            file
        };

        self.announce(&file);
        Ok(file)
    }

    /// Insert a new file, or update the existing one in place so current
    /// subscribers keep their handle and observe an update.
    pub fn add_or_update_file(&self, content: ContentRef) -> Result<File> {
        check_file_content(&self.path(), &content)?;
        let name = content.name().to_string();

        let outcome = {
            let mut children = self.item.node.children.write();
            self.ensure_open()?;
            match children.get(&name) {
                Some(existing) => match existing.as_file() {
                    Some(file) => Insert::Existing(file),
                    None => {
                        return Err(DirectoryError::TypeConflict {
                            path: existing.path(),
                            expected: ItemKind::File,
                        });
                    }
                },
                None => {
                    let file = File::detached(content.clone());
                    file.attach_to(&self.item.node);
                    children.insert(name, file.item().clone());
                    Insert::Created(file)
                }
            }
        };

        match outcome {
            Insert::Created(file) => {
                self.announce(&file);
                Ok(file)
            }
            Insert::Existing(file) => {
                file.update(content)?;
                Ok(file)
            }
        }
    }

    /// Delete the folder.
    ///
    /// Without `recursive` the folder must be empty. With it, every
    /// descendant is deleted first, innermost first, and the folder last.
    ///
    /// The folder stops accepting children once it is found empty under its
    /// own lock. Inserts after that fail with [`DirectoryError::Deleted`].
    pub fn delete(&self, recursive: bool) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }

        loop {
            let remaining: Vec<DirectoryItem> = {
                let children = self.item.node.children.write();
                if children.is_empty() {
                    self.item.node.close();
                    break;
                }
                if !recursive {
                    return Err(DirectoryError::NotEmpty(self.path()));
                }
                children.values().cloned().collect()
            };

            for child in remaining {
                match child.as_folder() {
                    Some(folder) => folder.delete(true)?,
                    None => child.unlink(),
                }
            }
        }

        self.item.unlink();
        Ok(())
    }

    /// Fails once the folder is deleted or being deleted. Callers hold the
    /// children lock.
    fn ensure_open(&self) -> Result<()> {
        if self.item.node.accepts_children() {
            Ok(())
        } else {
            Err(DirectoryError::Deleted(self.path()))
        }
    }

    fn announce(&self, file: &File) {
        debug!("Added file {}", file.path());
        self.item.node.added.emit(&ItemAdded {
            item: file.item().clone(),
        });
    }
}

/// Check that `content` can be stored as a file below `parent`.
pub(crate) fn check_file_content(parent: &str, content: &ContentRef) -> Result<()> {
    if content.is_directory() {
        return Err(DirectoryError::TypeConflict {
            path: path::join(parent, content.name()),
            expected: ItemKind::File,
        });
    }
    path::validate_name(content.name())
}

impl Deref for Folder {
    type Target = DirectoryItem;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Folder").field(&self.path()).finish()
    }
}
