//! Directory watcher implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use codex_glob::{Glob, anchor};
use codex_virtual_fs::{
    Directory, DirectoryItem, EventHandlers, EventSource, Folder, ItemAdded, ItemDeleted,
    ItemUpdated, SubscriptionId, path,
};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::config::WatcherConfig;
use crate::error::Result;
use crate::event::{WatchEvent, WatchNotification};

/// Watches items of a [`Directory`] and reports changes whose path matches
/// one of the registered filters.
///
/// Every handler the watcher installs on the tree holds only a weak
/// reference back to it. Dropping the watcher releases all of them.
pub struct DirectoryWatcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    directory: Directory,

    config: WatcherConfig,

    /// Compiled filters keyed by their anchored source, in registration order.
    filters: RwLock<IndexMap<String, Arc<Glob>>>,

    /// Watched items keyed by path.
    watched: Mutex<HashMap<String, Watched>>,

    item_added: EventHandlers<WatchEvent<ItemAdded>>,
    item_updated: EventHandlers<WatchEvent<ItemUpdated>>,
    item_deleted: EventHandlers<WatchEvent<ItemDeleted>>,

    notifications: broadcast::Sender<WatchNotification>,
}

/// A watched item and the handlers installed on it.
struct Watched {
    item: DirectoryItem,
    added: Option<SubscriptionId>,
    updated: SubscriptionId,
    deleted: SubscriptionId,
}

impl Watched {
    /// Remove every handler. Returns `false` if one was already gone.
    fn release(&self) -> bool {
        let added = match (self.added, self.item.as_folder()) {
            (Some(id), Some(folder)) => folder.added().unsubscribe(id),
            (None, _) => true,
            (Some(_), None) => false,
        };
        let updated = self.item.updated().unsubscribe(self.updated);
        let deleted = self.item.deleted().unsubscribe(self.deleted);
        added && updated && deleted
    }
}

impl DirectoryWatcher {
    /// Create a watcher over `directory` and register the configured filters.
    pub fn new(directory: &Directory, config: WatcherConfig) -> Result<Self> {
        let (notifications, _) = broadcast::channel(config.channel_capacity.max(1));
        let filters = config.filters.clone();

        let watcher = Self {
            inner: Arc::new(WatcherInner {
                directory: directory.clone(),
                config,
                filters: RwLock::new(IndexMap::new()),
                watched: Mutex::new(HashMap::new()),
                item_added: EventHandlers::new(),
                item_updated: EventHandlers::new(),
                item_deleted: EventHandlers::new(),
                notifications,
            }),
        };

        for pattern in &filters {
            watcher.add_filter(pattern)?;
        }
        Ok(watcher)
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.inner.config
    }

    /// Register a filter pattern and watch the items it can affect.
    ///
    /// The pattern is anchored with a leading separator. The deepest existing
    /// folder along its literal base directory is watched, along with every
    /// folder below the base when the pattern spans subdirectories, and every
    /// item the pattern already matches. Registering a pattern twice is a
    /// no-op.
    pub fn add_filter(&self, pattern: &str) -> Result<()> {
        let glob = self.inner.directory.patterns().get(&anchor(pattern))?;
        let source = glob.as_str().to_string();
        {
            let mut filters = self.inner.filters.write();
            if filters.contains_key(&source) {
                return Ok(());
            }
            filters.insert(source.clone(), glob.clone());
        }

        info!("Registered watch filter: {source}");
        self.inner.watch_for(&glob);
        Ok(())
    }

    /// Registered filters, in registration order.
    pub fn filters(&self) -> Vec<String> {
        self.inner.filters.read().keys().cloned().collect()
    }

    /// Watch a single item. Returns `false` when it is already watched or no
    /// longer exists.
    pub fn watch(&self, item: &DirectoryItem) -> bool {
        self.inner.watch(item)
    }

    /// Create the folder at `path` if needed and watch it.
    pub fn watch_folder(&self, path: &str) -> Result<Folder> {
        let folder = self.inner.directory.get_or_add_folder(path)?;
        self.inner.watch(folder.item());
        Ok(folder)
    }

    /// Stop watching `item`. Returns `false` when it was not watched or one
    /// of its handlers was already gone.
    pub fn stop_watching(&self, item: &DirectoryItem) -> bool {
        let entry = {
            let mut watched = self.inner.watched.lock();
            key_of(&watched, item).and_then(|key| watched.remove(&key))
        };

        match entry {
            Some(entry) => {
                debug!("Stopped watching {}", item.path());
                entry.release()
            }
            None => {
                warn!("Not watching {}", item.path());
                false
            }
        }
    }

    /// Stop watching everything.
    pub fn stop_watching_all(&self) -> bool {
        let entries: Vec<Watched> = self
            .inner
            .watched
            .lock()
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        let count = entries.len();
        let clean = entries
            .iter()
            .fold(true, |clean, entry| entry.release() && clean);
        if count > 0 {
            info!("Stopped {count} watches");
        }
        clean
    }

    pub fn is_watching(&self, item: &DirectoryItem) -> bool {
        key_of(&self.inner.watched.lock(), item).is_some()
    }

    /// Paths of all watched items, sorted.
    pub fn watched_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.watched.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Matching additions.
    pub fn item_added(&self) -> EventSource<'_, WatchEvent<ItemAdded>> {
        EventSource::new(&self.inner.item_added)
    }

    /// Matching updates.
    pub fn item_updated(&self) -> EventSource<'_, WatchEvent<ItemUpdated>> {
        EventSource::new(&self.inner.item_updated)
    }

    /// Matching deletions.
    pub fn item_deleted(&self) -> EventSource<'_, WatchEvent<ItemDeleted>> {
        EventSource::new(&self.inner.item_deleted)
    }

    /// A receiver for every notification raised from now on.
    ///
    /// Receivers that fall more than `channel_capacity` notifications behind
    /// observe `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchNotification> {
        self.inner.notifications.subscribe()
    }

    /// Get statistics about the watcher.
    pub fn stats(&self) -> WatcherStats {
        let watched = self.inner.watched.lock();
        let watched_folders = watched
            .values()
            .filter(|entry| entry.item.is_folder())
            .count();

        WatcherStats {
            filters: self.inner.filters.read().len(),
            watched_folders,
            watched_files: watched.len() - watched_folders,
            receivers: self.inner.notifications.receiver_count(),
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop_watching_all();
    }
}

impl fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl WatcherInner {
    fn watch(self: &Arc<Self>, item: &DirectoryItem) -> bool {
        if !item.exists() {
            return false;
        }

        let path = item.path();
        let mut watched = self.watched.lock();
        if let Some(key) = key_of(&watched, item) {
            if key != path
                && let Some(entry) = watched.remove(&key)
            {
                self.insert(&mut watched, path, entry);
            }
            return false;
        }

        let entry = self.install(item);
        debug!("Watching {} {path}", item.kind());
        self.insert(&mut watched, path, entry);
        true
    }

    /// Put `entry` at `path`, releasing whatever else held that slot.
    fn insert(&self, watched: &mut HashMap<String, Watched>, path: String, entry: Watched) {
        if let Some(previous) = watched.insert(path, entry) {
            previous.release();
        }
    }

    fn install(self: &Arc<Self>, item: &DirectoryItem) -> Watched {
        let added = item.as_folder().map(|folder| {
            let weak = Arc::downgrade(self);
            folder.added().subscribe(move |event: &ItemAdded| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_added(event);
                }
            })
        });

        let weak = Arc::downgrade(self);
        let updated = item.updated().subscribe(move |event: &ItemUpdated| {
            if let Some(inner) = weak.upgrade() {
                inner.on_updated(event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(self);
        let deleted = item.deleted().subscribe(move |event: &ItemDeleted| {
            if let Some(inner) = weak.upgrade() {
                inner.on_deleted(event);
            }
        });

        Watched {
            item: item.clone(),
            added,
            updated,
            deleted,
        }
    }

    /// Watch what a newly registered filter can affect.
    ///
    /// The base directory is looked up with the filter's own case rules, so
    /// a case-insensitive filter may reach several folders.
    fn watch_for(self: &Arc<Self>, glob: &Arc<Glob>) {
        let base = glob.base_directory();
        let case_sensitive = glob.options().case_sensitive;
        let mut frontier = vec![self.directory.root().clone()];
        for segment in path::segments(&base) {
            let mut next = Vec::new();
            for folder in frontier {
                let found = base_folders(&folder, segment, case_sensitive);
                if found.is_empty() {
                    debug!(
                        "Filter base {base} does not exist yet, watching {}",
                        folder.path()
                    );
                    self.watch(folder.item());
                }
                next.extend(found);
            }
            frontier = next;
        }

        for folder in &frontier {
            self.watch(folder.item());
            if glob.spans_subdirectories() {
                let mut pending = folder.folders();
                while let Some(next) = pending.pop() {
                    self.watch(next.item());
                    pending.extend(next.folders());
                }
            }
        }

        for item in self.directory.search_glob(glob.clone()) {
            self.watch(&item);
        }
    }

    /// Filters matching `path`, in registration order.
    fn matching_filters(&self, path: &str) -> Vec<String> {
        let matched: Vec<String> = self
            .filters
            .read()
            .iter()
            .filter(|(_, glob)| glob.is_match(path))
            .map(|(source, _)| source.clone())
            .collect();
        trace!("{path} matched {} filters", matched.len());
        matched
    }

    fn on_added(self: &Arc<Self>, event: &ItemAdded) {
        let item = &event.item;
        if !item.is_folder() || self.config.auto_watch_new_subfolders {
            self.watch(item);
        }

        let matched_filters = self.matching_filters(&item.path());
        if matched_filters.is_empty() {
            return;
        }

        let event = WatchEvent {
            event: event.clone(),
            matched_filters,
        };
        self.item_added.emit(&event);
        self.publish(WatchNotification::ItemAdded(event));
    }

    fn on_updated(&self, event: &ItemUpdated) {
        let path = event.new.path();
        if event.path_changed() {
            self.rekey(&event.old.path, path.clone(), &event.new);
        }

        let matched_filters = self.matching_filters(&path);
        if matched_filters.is_empty() {
            return;
        }

        let event = WatchEvent {
            event: event.clone(),
            matched_filters,
        };
        self.item_updated.emit(&event);
        self.publish(WatchNotification::ItemUpdated(event));
    }

    fn on_deleted(&self, event: &ItemDeleted) {
        self.release_deleted(event);

        let matched_filters = self.matching_filters(&event.path);
        if matched_filters.is_empty() {
            return;
        }

        let event = WatchEvent {
            event: event.clone(),
            matched_filters,
        };
        self.item_deleted.emit(&event);
        self.publish(WatchNotification::ItemDeleted(event));
    }

    /// Move the slot of `item` from `old` to `new`.
    fn rekey(&self, old: &str, new: String, item: &DirectoryItem) {
        let mut watched = self.watched.lock();
        match watched.remove(old) {
            Some(entry) if entry.item.same_node(item) => {
                trace!("Watch moved from {old} to {new}");
                self.insert(&mut watched, new, entry);
            }
            Some(other) => {
                watched.insert(old.to_string(), other);
            }
            None => {}
        }
    }

    /// Release the deleted item and, for folders, every entry that was below
    /// it or no longer exists.
    fn release_deleted(&self, event: &ItemDeleted) {
        let prefix = format!("{}{}", event.path, path::SEPARATOR);
        let released: Vec<Watched> = {
            let mut watched = self.watched.lock();
            let keys: Vec<String> = watched
                .iter()
                .filter(|(key, entry)| {
                    entry.item.same_node(&event.item)
                        || !entry.item.exists()
                        || (event.item.is_folder() && key.starts_with(&prefix))
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| watched.remove(key)).collect()
        };

        for entry in &released {
            entry.release();
        }
        if !released.is_empty() {
            debug!(
                "Released {} watches after deleting {}",
                released.len(),
                event.path
            );
        }
    }

    fn publish(&self, notification: WatchNotification) {
        if self.notifications.send(notification).is_err() {
            trace!("No notification receivers");
        }
    }
}

/// Child folders of `folder` named `name`.
fn base_folders(folder: &Folder, name: &str, case_sensitive: bool) -> Vec<Folder> {
    if case_sensitive {
        return folder
            .get(name)
            .and_then(|item| item.as_folder())
            .into_iter()
            .collect();
    }
    folder
        .folders()
        .into_iter()
        .filter(|child| child.name().eq_ignore_ascii_case(name))
        .collect()
}

/// Registry key of `item`: its current path, or a stale key still holding
/// the same node.
fn key_of(watched: &HashMap<String, Watched>, item: &DirectoryItem) -> Option<String> {
    let path = item.path();
    if watched
        .get(&path)
        .is_some_and(|entry| entry.item.same_node(item))
    {
        return Some(path);
    }
    watched
        .iter()
        .find(|(_, entry)| entry.item.same_node(item))
        .map(|(key, _)| key.clone())
}

/// Statistics about the directory watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStats {
    /// Registered filters.
    pub filters: usize,

    /// Watched folders.
    pub watched_folders: usize,

    /// Watched files.
    pub watched_files: usize,

    /// Live broadcast receivers.
    pub receivers: usize,
}
