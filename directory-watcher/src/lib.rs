//! # Directory Watcher
//!
//! Glob-filtered change notifications for a [`codex_virtual_fs::Directory`].
//!
//! ## Features
//!
//! - **Glob filters**: only changes whose path matches a registered pattern
//!   are reported, together with the patterns that matched
//! - **Auto-watch**: folders created below a watched folder are watched as
//!   they appear, so filters can target paths that do not exist yet
//! - **Two delivery styles**: synchronous handler lists, or a broadcast
//!   channel of [`WatchNotification`] values
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatcherConfig ──► DirectoryWatcher ──► WatchEvent              │
//! │       │                  │                  │                   │
//! │       ▼                  ▼                  ▼                   │
//! │  Glob filters     item handlers     handlers / broadcast        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use codex_directory_watcher::{DirectoryWatcher, WatcherConfig};
//! use codex_virtual_fs::{Directory, MemoryContent};
//!
//! let directory = Directory::new();
//! let watcher = DirectoryWatcher::new(
//!     &directory,
//!     WatcherConfig::new().with_filter("/logs/*.txt"),
//! )
//! .unwrap();
//! let mut notifications = watcher.subscribe();
//!
//! directory
//!     .add_file("/logs", MemoryContent::from_string("today.txt", "").into_ref())
//!     .unwrap();
//!
//! let notification = notifications.try_recv().unwrap();
//! assert_eq!(notification.path(), "/logs/today.txt");
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{Result, WatcherError};
pub use event::{ChangeKind, ChangeRecord, WatchEvent, WatchNotification};
pub use watcher::{DirectoryWatcher, WatcherStats};
