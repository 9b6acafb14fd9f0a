//! Integration coverage for the aggregation engine that does not require a
//! real rsync binary: destination parsing, queue optimization, and the
//! transfer invoker's dry-run path.

use std::path::PathBuf;

use syncdrift::core::{
    destination::Destination, item::Item, queue::ItemQueue, source::Source, transfer::Transfer,
};

#[test]
fn dry_run_sync_against_local_destination_does_not_touch_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source_root = dir.path().join("source");
    let dest_root = dir.path().join("dest");
    std::fs::create_dir_all(&source_root).unwrap();
    std::fs::create_dir_all(&dest_root).unwrap();

    let file = source_root.join("report.csv");
    std::fs::write(&file, b"a,b,c\n").unwrap();

    let source = Source::parse(&source_root.to_string_lossy());
    let destination = Destination::parse(&dest_root.to_string_lossy());
    let transfer = Transfer::new(PathBuf::from("/usr/bin/rsync"), true);

    let mut queue = ItemQueue::new();
    queue.add(Item::leaf(file.clone()));
    let dirs = queue.pending_dirs();
    let trees = queue.pending_trees();

    let outcome = transfer.sync(&source, &destination, &dirs, &trees);
    assert!(outcome.is_ok());

    // Dry run: destination must remain empty.
    let entries: Vec<_> = std::fs::read_dir(&dest_root).unwrap().collect();
    assert!(entries.is_empty());
}

#[test]
fn queue_collapses_file_events_under_a_later_directory_creation() {
    let dir = tempfile::tempdir().unwrap();
    let source_root = dir.path().join("source");
    std::fs::create_dir_all(&source_root).unwrap();

    let sub = source_root.join("new_dir");
    std::fs::create_dir_all(&sub).unwrap();
    let nested = sub.join("child.txt");
    std::fs::write(&nested, b"x").unwrap();

    let mut queue = ItemQueue::new();
    queue.add(Item::leaf(nested));
    queue.add(Item::subtree(sub.clone()));

    assert!(queue.pending_dirs().is_empty());
    assert_eq!(queue.pending_trees(), vec![sub]);
}

#[test]
fn destination_uri_shapes_normalize_with_a_trailing_slash() {
    let cases = [
        ("host::module/path", "host::module/path/"),
        ("user@host:/srv/backup", "user@host:/srv/backup/"),
        ("rsync://user@host:873/path", "rsync://user@host:873/path/"),
    ];

    for (raw, expected) in cases {
        let destination = Destination::parse(raw);
        assert_eq!(destination.normalized_path, expected, "mismatch for {}", raw);
    }
}
