//! Lazy glob search over the tree.

use std::sync::Arc;
use std::vec;

use codex_glob::Glob;

use crate::folder::Folder;
use crate::item::DirectoryItem;

/// Iterator over items whose path matches a glob.
///
/// Folders are walked depth first with an explicit stack. All direct
/// children of a folder are tested before any nested folder is entered.
/// Children are snapshotted per folder, so the tree may change while the
/// search is running.
pub struct Search {
    glob: Arc<Glob>,
    pending: Vec<Folder>,
    batch: vec::IntoIter<DirectoryItem>,
}

impl Search {
    pub(crate) fn new(glob: Arc<Glob>, start: Folder) -> Self {
        Self {
            glob,
            pending: vec![start],
            batch: Vec::new().into_iter(),
        }
    }

    /// The pattern being searched for.
    pub fn glob(&self) -> &Glob {
        &self.glob
    }
}

impl Iterator for Search {
    type Item = DirectoryItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for item in self.batch.by_ref() {
                if let Some(folder) = item.as_folder() {
                    self.pending.push(folder);
                }
                if self.glob.is_match(&item.path()) {
                    return Some(item);
                }
            }

            let folder = self.pending.pop()?;
            self.batch = folder.children().into_iter();
        }
    }
}
