//! # Glob
//!
//! Path pattern matching for the virtual file system. Patterns are tokenized
//! once and compiled into an anchored matcher that tests full path strings.
//!
//! ## Syntax
//!
//! | token   | matches                                         |
//! |---------|-------------------------------------------------|
//! | `*`     | any run of characters inside one path segment   |
//! | `?`     | exactly one character other than `/`            |
//! | `[a-z]` | one character from the class (`[!..]` negates)  |
//! | `**`    | any number of segments, separators included     |
//! | `\x`    | the literal character `x`                       |
//!
//! ## Usage
//!
//! ```rust
//! use codex_glob::Glob;
//!
//! let glob = Glob::new("/foo/**/*.txt").unwrap();
//! assert!(glob.is_match("/foo/bar.txt"));
//! assert!(glob.is_match("/foo/sub/bar.txt"));
//! assert!(!glob.is_match("/foo/bar.txt.min"));
//! ```

pub mod cache;
pub mod error;
pub mod pattern;
pub mod token;

pub use cache::GlobCache;
pub use error::{GlobError, Result};
pub use pattern::{Glob, GlobOptions, anchor};
pub use token::{CharClass, ClassItem, Token};

/// Path separator used by every pattern and path in the virtual file system.
pub const SEPARATOR: char = '/';
