//! Integration tests for the directory tree.
//!
//! These exercise the tree through its public API only: path stability,
//! cascading updates and recursive deletion.

use std::sync::Arc;
use std::thread;

use codex_virtual_fs::{
    ContentRef, Directory, DirectoryItem, ItemAdded, ItemDeleted, ItemUpdated, MemoryContent,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn text(name: &str) -> ContentRef {
    MemoryContent::from_string(name, format!("contents of {name}")).into_ref()
}

/// Record `(old path, new path)` for every update raised by `item`.
fn record_updates(item: &DirectoryItem) -> Arc<Mutex<Vec<(String, String)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    item.updated().subscribe(move |event: &ItemUpdated| {
        sink.lock().push((event.old.path.clone(), event.new.path()));
    });
    log
}

#[test]
fn test_get_or_add_folder_is_idempotent() {
    init_tracing();
    let directory = Directory::new();
    let added = Arc::new(Mutex::new(Vec::new()));

    // Count every Added raised anywhere along the path.
    let sink = added.clone();
    directory.root().added().subscribe(move |event: &ItemAdded| {
        sink.lock().push(event.item.path());
    });

    let first = directory.get_or_add_folder("/a/b/c").unwrap();
    let second = directory.get_or_add_folder("/a/b/c").unwrap();

    assert!(first.same_node(&second));
    // Only the root is observed here, so one event for `/a`.
    assert_eq!(*added.lock(), vec!["/a".to_string()]);

    let b = directory.get_folder("/a/b").unwrap();
    let sink = added.clone();
    b.added().subscribe(move |event: &ItemAdded| {
        sink.lock().push(event.item.path());
    });

    directory.get_or_add_folder("/a/b/c/d").unwrap();
    directory.get_or_add_folder("/a/b/e").unwrap();
    assert_eq!(
        *added.lock(),
        vec!["/a".to_string(), "/a/b/e".to_string()]
    );
}

#[test]
fn test_resolve_tracks_existence() {
    let directory = Directory::new();
    let mut files = Vec::new();
    for (dir, name) in [("/x", "1.txt"), ("/x/y", "2.txt"), ("/z", "3.txt")] {
        files.push(directory.add_file(dir, text(name)).unwrap());
    }

    for file in &files {
        let found = directory.resolve(&file.path()).unwrap();
        assert!(found.same_node(file));
    }

    let removed = files.remove(1);
    let path = removed.path();
    removed.delete().unwrap();

    assert!(directory.resolve(&path).is_none());
    for file in &files {
        assert!(directory.resolve(&file.path()).is_some());
    }
}

#[test]
fn test_rename_round_trip_restores_paths() {
    let directory = Directory::new();
    let a = directory.get_or_add_folder("/A").unwrap();
    let nested = directory.get_or_add_folder("/A/inner/deeper").unwrap();
    let file = directory.add_file("/A/inner", text("f.txt")).unwrap();
    let before = (nested.path(), file.path());

    a.rename("B").unwrap();
    assert_eq!(nested.path(), "/B/inner/deeper");
    assert_eq!(file.path(), "/B/inner/f.txt");
    assert!(directory.resolve("/A").is_none());

    a.rename("A").unwrap();
    assert_eq!((nested.path(), file.path()), before);
}

#[test]
fn test_recursive_delete_fires_every_deleted_event() {
    let directory = Directory::new();
    directory.add_file("/top", text("a.txt")).unwrap();
    directory.add_file("/top/one", text("b.txt")).unwrap();
    directory.add_file("/top/one/two", text("c.txt")).unwrap();
    directory.add_file("/top/one/two", text("d.txt")).unwrap();
    directory.get_or_add_folder("/top/empty").unwrap();

    let descendants: Vec<DirectoryItem> = directory.search("/top/**").unwrap().collect();
    assert_eq!(descendants.len(), 7);

    let top = directory.get_folder("/top").unwrap();
    let deleted = Arc::new(Mutex::new(Vec::new()));
    for item in descendants.iter().chain(std::iter::once(top.item())) {
        let sink = deleted.clone();
        item.deleted().subscribe(move |event: &ItemDeleted| {
            sink.lock().push(event.path.clone());
        });
    }

    top.delete(true).unwrap();

    let deleted = deleted.lock().clone();
    assert_eq!(deleted.len(), descendants.len() + 1);
    assert_eq!(deleted.last().map(String::as_str), Some("/top"));
    // Children are always reported before their folder.
    let position = |path: &str| deleted.iter().position(|p| p == path);
    assert!(position("/top/one/two/c.txt") < position("/top/one/two"));
    assert!(position("/top/one/two") < position("/top/one"));

    assert!(descendants.iter().all(|item| !item.exists()));
    assert!(!top.exists());
    assert!(directory.root().is_empty());
}

#[test]
fn test_cascading_rename_updates_descendants() {
    init_tracing();
    let directory = Directory::new();
    let file = directory
        .add_file("/root/child/grandchild", text("foo.txt"))
        .unwrap();
    let child = directory.get_folder("/root/child").unwrap();
    let grandchild = directory.get_folder("/root/child/grandchild").unwrap();

    let grandchild_updates = record_updates(&grandchild);
    let file_updates = record_updates(&file);

    child.rename("child2").unwrap();

    assert_eq!(
        *grandchild_updates.lock(),
        vec![(
            "/root/child/grandchild".to_string(),
            "/root/child2/grandchild".to_string()
        )]
    );
    assert_eq!(
        *file_updates.lock(),
        vec![(
            "/root/child/grandchild/foo.txt".to_string(),
            "/root/child2/grandchild/foo.txt".to_string()
        )]
    );
    assert_eq!(file.name(), "foo.txt");
}

#[test]
fn test_deleted_child_stops_following_parent() {
    let directory = Directory::new();
    let folder = directory.get_or_add_folder("/a").unwrap();
    let file = folder.add_file(text("x.txt")).unwrap();
    let updates = record_updates(&file);

    file.delete().unwrap();
    folder.rename("b").unwrap();

    assert!(updates.lock().is_empty());
}

#[test]
fn test_concurrent_get_or_add_folder_creates_once() {
    let directory = Directory::new();
    let added = Arc::new(Mutex::new(0));
    let counter = added.clone();
    directory
        .root()
        .added()
        .subscribe(move |_: &ItemAdded| *counter.lock() += 1);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let directory = directory.clone();
            thread::spawn(move || directory.get_or_add_folder("/shared").unwrap())
        })
        .collect();
    let folders: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(folders.iter().all(|folder| folder.same_node(&folders[0])));
    assert_eq!(*added.lock(), 1);
}
