//! Configuration for directory watching.

use serde::{Deserialize, Serialize};

/// Configuration for a [`DirectoryWatcher`](crate::DirectoryWatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Watch folders created below a watched folder as they appear.
    pub auto_watch_new_subfolders: bool,

    /// Filter patterns registered when the watcher is created.
    pub filters: Vec<String>,

    /// Buffer size of the notification broadcast channel.
    pub channel_capacity: usize,
}

impl WatcherConfig {
    /// Default broadcast buffer size.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

    /// Create a config with auto-watch enabled and no filters.
    pub fn new() -> Self {
        Self {
            auto_watch_new_subfolders: true,
            filters: Vec::new(),
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Add a filter pattern.
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filters.push(pattern.into());
        self
    }

    /// Only watch folders that are registered explicitly.
    pub fn without_auto_watch(mut self) -> Self {
        self.auto_watch_new_subfolders = false;
        self
    }

    /// Set the broadcast buffer size. Zero is raised to one.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}
