//! Memoization of compiled patterns.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::pattern::{Glob, GlobOptions};

/// Cache of compiled globs keyed by pattern source.
///
/// Compilation is deterministic, so a cached matcher is interchangeable with
/// a freshly compiled one.
#[derive(Debug, Default)]
pub struct GlobCache {
    options: GlobOptions,
    globs: RwLock<HashMap<String, Arc<Glob>>>,
}

impl GlobCache {
    /// Create an empty cache that compiles with `options`.
    pub fn new(options: GlobOptions) -> Self {
        Self {
            options,
            globs: RwLock::new(HashMap::new()),
        }
    }

    /// Options every cached pattern is compiled with.
    pub fn options(&self) -> GlobOptions {
        self.options
    }

    /// Return the compiled pattern, compiling it on first use.
    pub fn get(&self, pattern: &str) -> Result<Arc<Glob>> {
        if let Some(glob) = self.globs.read().get(pattern) {
            return Ok(glob.clone());
        }

        let glob = Arc::new(Glob::with_options(pattern, self.options)?);
        let mut globs = self.globs.write();
        let entry = globs
            .entry(pattern.to_string())
            .or_insert_with(|| {
                debug!("Cached glob pattern: {pattern}");
                glob
            })
            .clone();
        Ok(entry)
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.globs.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.globs.read().is_empty()
    }

    /// Drop every cached pattern.
    pub fn clear(&self) {
        self.globs.write().clear();
    }
}
