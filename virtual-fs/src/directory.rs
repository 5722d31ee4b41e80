//! The tree facade: path navigation, file helpers and search.

use std::fmt;
use std::sync::Arc;

use codex_glob::{Glob, GlobCache, GlobOptions, anchor};
use tracing::debug;

use crate::content::ContentRef;
use crate::error::{DirectoryError, Result};
use crate::folder::{self, Folder};
use crate::item::{DirectoryItem, File, ItemKind};
use crate::path::{self, CURRENT, PARENT};
use crate::search::Search;

/// An in-memory directory tree.
///
/// Cloning a `Directory` yields another handle to the same tree.
#[derive(Clone)]
pub struct Directory {
    root: Folder,
    globs: Arc<GlobCache>,
}

impl Directory {
    /// An empty tree with case-insensitive pattern matching.
    pub fn new() -> Self {
        Self::with_options(GlobOptions::default())
    }

    /// An empty tree whose searches compile patterns with `options`.
    pub fn with_options(options: GlobOptions) -> Self {
        Self {
            root: Folder::root(),
            globs: Arc::new(GlobCache::new(options)),
        }
    }

    pub fn root(&self) -> &Folder {
        &self.root
    }

    /// Compiled-pattern cache shared by every clone of this tree.
    pub fn patterns(&self) -> &GlobCache {
        &self.globs
    }

    /// Compile `pattern` through the tree's cache, anchoring it at the root.
    pub fn glob(&self, pattern: &str) -> Result<Arc<Glob>> {
        Ok(self.globs.get(&anchor(pattern))?)
    }

    /// Find the item at `path`.
    ///
    /// Empty segments are ignored, `.` stays in place and `..` moves to the
    /// parent. Returns `None` when a segment is missing, when a file is used
    /// as a folder, or when `..` climbs above the root.
    pub fn resolve(&self, path: &str) -> Option<DirectoryItem> {
        let mut current = self.root.item().clone();
        for segment in path::segments(path) {
            current = match segment {
                CURRENT => current.as_folder()?.into_item(),
                PARENT => current.as_folder()?.parent()?.into_item(),
                name => current.as_folder()?.get(name)?,
            };
        }
        Some(current)
    }

    /// The file at `path`, if there is one.
    pub fn get_file(&self, path: &str) -> Option<File> {
        self.resolve(path)?.as_file()
    }

    /// The folder at `path`, if there is one.
    pub fn get_folder(&self, path: &str) -> Option<Folder> {
        self.resolve(path)?.as_folder()
    }

    /// Walk `path`, creating every missing folder. Blank paths return the
    /// root.
    ///
    /// The whole path is checked against the tree first, so a path that
    /// cannot be created leaves the tree untouched.
    pub fn get_or_add_folder(&self, path: &str) -> Result<Folder> {
        if path.trim().is_empty() {
            return Ok(self.root.clone());
        }
        self.check_folder_path(path)?;
        self.create_folders(path)
    }

    /// Dry run of [`Directory::get_or_add_folder`]. Returns the normalized
    /// path of the folder it would return.
    fn check_folder_path(&self, path: &str) -> Result<String> {
        // `None` marks a folder that would be created.
        let mut walk: Vec<(&str, Option<Folder>)> = Vec::new();
        for segment in path::segments(path) {
            match segment {
                CURRENT => {}
                PARENT => {
                    if walk.pop().is_none() {
                        return Err(DirectoryError::InvalidName(PARENT.to_string()));
                    }
                }
                name => {
                    path::validate_name(name)?;
                    let parent = match walk.last() {
                        Some((_, parent)) => parent.clone(),
                        None => Some(self.root.clone()),
                    };
                    let existing = match parent.and_then(|parent| parent.get(name)) {
                        Some(item) => Some(item.as_folder().ok_or_else(|| {
                            DirectoryError::TypeConflict {
                                path: item.path(),
                                expected: ItemKind::Folder,
                            }
                        })?),
                        None => None,
                    };
                    walk.push((name, existing));
                }
            }
        }

        Ok(walk
            .iter()
            .fold(String::new(), |parent, (name, _)| path::join(&parent, name)))
    }

    fn create_folders(&self, path: &str) -> Result<Folder> {
        let mut current = self.root.clone();
        if path.trim().is_empty() {
            return Ok(current);
        }

        for segment in path::segments(path) {
            current = match segment {
                CURRENT => current,
                PARENT => current
                    .parent()
                    .ok_or_else(|| DirectoryError::InvalidName(PARENT.to_string()))?,
                name => current.get_or_add_folder(name)?,
            };
        }
        Ok(current)
    }

    /// Add a new file under `directory`, creating the folders on the way.
    pub fn add_file(&self, directory: &str, content: ContentRef) -> Result<File> {
        self.folder_for_file(directory, &content)?.add_file(content)
    }

    /// Add a file under `directory`, or update the existing one in place.
    pub fn add_or_update_file(&self, directory: &str, content: ContentRef) -> Result<File> {
        self.folder_for_file(directory, &content)?
            .add_or_update_file(content)
    }

    /// Validate `content` and the folder path, then create the folders.
    fn folder_for_file(&self, directory: &str, content: &ContentRef) -> Result<Folder> {
        let parent = if directory.trim().is_empty() {
            String::new()
        } else {
            self.check_folder_path(directory)?
        };
        folder::check_file_content(&parent, content)?;
        self.create_folders(directory)
    }

    /// Delete the item at `path`. Returns `false` when nothing is there.
    pub fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let Some(item) = self.resolve(path) else {
            return Ok(false);
        };
        debug!("Deleting {} (recursive: {recursive})", item.path());
        match item.as_folder() {
            Some(folder) => folder.delete(recursive)?,
            None => item.delete()?,
        }
        Ok(true)
    }

    /// Items whose path matches `pattern`, walked lazily from the root.
    ///
    /// The pattern is anchored with a leading separator. Each call walks the
    /// tree as it is at that time.
    pub fn search(&self, pattern: &str) -> Result<Search> {
        Ok(self.search_glob(self.glob(pattern)?))
    }

    /// Search with an already compiled pattern.
    pub fn search_glob(&self, glob: Arc<Glob>) -> Search {
        Search::new(glob, self.root.clone())
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("root_children", &self.root.len())
            .field("cached_patterns", &self.globs.len())
            .finish()
    }
}
