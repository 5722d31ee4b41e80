//! Content handles stored by tree items.
//!
//! Items never inspect content bytes. They hold an `Arc<dyn FileContent>` and
//! swap it for a new handle on every update.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Shared content handle.
pub type ContentRef = Arc<dyn FileContent>;

/// Metadata and bytes behind a tree item.
pub trait FileContent: Send + Sync + fmt::Debug {
    /// Local name of the item this content belongs to.
    fn name(&self) -> &str;

    /// Whether the content describes something that exists.
    fn exists(&self) -> bool;

    /// Whether this is a folder marker.
    fn is_directory(&self) -> bool;

    /// Length in bytes.
    fn len(&self) -> u64;

    /// Whether the content has no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When this handle was produced.
    fn last_modified(&self) -> DateTime<Utc>;

    /// Open a reader over the bytes.
    fn open_read(&self) -> io::Result<Box<dyn Read + Send>>;

    /// A replacement handle carrying `name` and the same data.
    fn with_name(&self, name: &str) -> ContentRef;
}

type Producer = Arc<dyn Fn() -> Bytes + Send + Sync>;

/// File content held in memory.
///
/// Content built with [`MemoryContent::lazy`] runs its producer on first
/// access and keeps the result for the lifetime of the handle.
#[derive(Clone)]
pub struct MemoryContent {
    name: String,
    modified: DateTime<Utc>,
    producer: Option<Producer>,
    bytes: Arc<OnceLock<Bytes>>,
}

impl MemoryContent {
    /// Content with the given bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(bytes.into());
        Self {
            name: name.into(),
            modified: Utc::now(),
            producer: None,
            bytes: Arc::new(cell),
        }
    }

    /// UTF-8 text content.
    pub fn from_string(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(text.into()))
    }

    /// Content whose bytes are computed on first access.
    pub fn lazy<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Bytes + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            modified: Utc::now(),
            producer: Some(Arc::new(producer)),
            bytes: Arc::new(OnceLock::new()),
        }
    }

    /// Override the modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = modified;
        self
    }

    /// The content bytes.
    pub fn bytes(&self) -> Bytes {
        self.bytes
            .get_or_init(|| match &self.producer {
                Some(producer) => producer(),
                None => Bytes::new(),
            })
            .clone()
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> ContentRef {
        Arc::new(self)
    }
}

impl fmt::Debug for MemoryContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContent")
            .field("name", &self.name)
            .field("modified", &self.modified)
            .field("loaded", &self.bytes.get().is_some())
            .finish()
    }
}

impl FileContent for MemoryContent {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_directory(&self) -> bool {
        false
    }

    fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.bytes())))
    }

    fn with_name(&self, name: &str) -> ContentRef {
        // Renaming is a new handle with a fresh timestamp over the same bytes.
        Arc::new(Self {
            name: name.to_string(),
            modified: Utc::now(),
            producer: self.producer.clone(),
            bytes: self.bytes.clone(),
        })
    }
}

/// Marker content for folders.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    name: String,
    modified: DateTime<Utc>,
}

impl DirectoryContent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: Utc::now(),
        }
    }

    pub fn into_ref(self) -> ContentRef {
        Arc::new(self)
    }
}

impl FileContent for DirectoryContent {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn len(&self) -> u64 {
        0
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is a directory", self.name),
        ))
    }

    fn with_name(&self, name: &str) -> ContentRef {
        Arc::new(Self::new(name))
    }
}

/// Content installed on items once they have been deleted.
#[derive(Debug, Clone)]
pub struct NotFoundContent {
    name: String,
    directory: bool,
}

impl NotFoundContent {
    pub fn new(name: impl Into<String>, directory: bool) -> Self {
        Self {
            name: name.into(),
            directory,
        }
    }
}

impl FileContent for NotFoundContent {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        false
    }

    fn is_directory(&self) -> bool {
        self.directory
    }

    fn len(&self) -> u64 {
        0
    }

    fn last_modified(&self) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", self.name),
        ))
    }

    fn with_name(&self, name: &str) -> ContentRef {
        Arc::new(Self::new(name, self.directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memory_content_reads_bytes() {
        let content = MemoryContent::from_string("a.txt", "hello");
        assert_eq!(content.len(), 5);

        let mut text = String::new();
        content.open_read().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_lazy_content_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let content = MemoryContent::lazy("big.bin", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Bytes::from_static(b"0123456789")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(content.len(), 10);
        assert_eq!(content.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_name_keeps_bytes() {
        let content = MemoryContent::from_string("a.txt", "data");
        let renamed = content.with_name("b.txt");

        assert_eq!(renamed.name(), "b.txt");
        assert_eq!(renamed.len(), 4);
        assert!(renamed.last_modified() >= content.last_modified());
    }

    #[test]
    fn test_markers() {
        let dir = DirectoryContent::new("docs");
        assert!(dir.exists());
        assert!(dir.is_directory());
        assert!(dir.open_read().is_err());

        let gone = NotFoundContent::new("docs", true);
        assert!(!gone.exists());
        assert_eq!(
            gone.open_read().err().map(|e| e.kind()),
            Some(io::ErrorKind::NotFound)
        );
    }
}
