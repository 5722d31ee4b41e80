//! # Virtual File System
//!
//! An in-memory tree of folders and files with structural change events and
//! glob search.
//!
//! ## Features
//!
//! - **Live paths**: item paths are computed from the parent chain, so
//!   renaming or moving a folder is constant time
//! - **Change events**: `Added`, `Updated` and `Deleted` are raised
//!   synchronously, and path changes cascade to every descendant
//! - **Glob search**: lazy depth-first search with `*`, `?`, `[...]` and `**`
//! - **Thread safe**: folders can be mutated concurrently without external
//!   locking
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Directory                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  resolve / get_or_add_folder / add_file ──► Folder ──► File     │
//! │       │                                       │          │      │
//! │       ▼                                       ▼          ▼      │
//! │  Search (codex-glob)                   ItemAdded  ItemUpdated   │
//! │                                                   ItemDeleted   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use codex_virtual_fs::{Directory, MemoryContent};
//!
//! let directory = Directory::new();
//! let file = directory
//!     .add_file("/docs", MemoryContent::from_string("readme.md", "# hi").into_ref())
//!     .unwrap();
//! assert_eq!(file.path(), "/docs/readme.md");
//!
//! directory.get_folder("/docs").unwrap().rename("guides").unwrap();
//! assert_eq!(file.path(), "/guides/readme.md");
//! ```

pub mod content;
pub mod directory;
pub mod error;
pub mod event;
pub mod folder;
pub mod item;
pub mod observer;
pub mod path;
pub mod search;

pub use content::{ContentRef, DirectoryContent, FileContent, MemoryContent, NotFoundContent};
pub use directory::Directory;
pub use error::{DirectoryError, Result};
pub use event::{ItemAdded, ItemDeleted, ItemSnapshot, ItemUpdated};
pub use folder::Folder;
pub use item::{DirectoryItem, File, ItemKind};
pub use observer::{EventHandlers, EventSource, SubscriptionId};
pub use search::Search;

// Re-export the pattern types used by `Directory::glob` and `search_glob`.
pub use codex_glob::{Glob, GlobError, GlobOptions};
