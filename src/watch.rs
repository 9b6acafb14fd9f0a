/*!
 * Filesystem event translation: turns `notify` events into the `Item`s the
 * dispatcher and workers understand, and wires up the recursive,
 * auto-add-on-create watch.
 */

use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::core::{dispatcher::Dispatcher, item::Item, source::Source};
use crate::error::Result;

/// Map one `notify` event to the `Item`s it produces.
///
/// A path created or moved into place becomes a subtree item if it is a
/// directory, since it may already contain content that needs a full
/// recursive sync. If it's a file, and for every other kind of event (data/
/// metadata modification, removal, the source side of a rename), the item
/// queued is the affected path's *parent* directory, non-recursively: this
/// tool does not try to sync a single changed or vanished leaf path
/// directly, only the directory listing that would reveal it, which is
/// also what lets a deletion be propagated via rsync's `--delete`.
pub fn translate(event: &Event) -> Vec<Item> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().map(|p| classify_new_path(p)).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().map(|p| classify_new_path(p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut items = Vec::new();
            if let Some(to) = event.paths.get(1) {
                items.push(classify_new_path(to));
            }
            if let Some(from) = event.paths.first() {
                items.push(parent_leaf(from));
            }
            items
        }
        _ => event.paths.iter().map(|p| parent_leaf(p)).collect(),
    }
}

fn classify_new_path(path: &std::path::Path) -> Item {
    if path.is_dir() {
        Item::subtree(path.to_path_buf())
    } else {
        parent_leaf(path)
    }
}

/// Build the non-recursive leaf item for an affected path: its containing
/// directory, not the path itself.
fn parent_leaf(path: &std::path::Path) -> Item {
    let dir = path.parent().unwrap_or(path);
    Item::leaf(dir.to_path_buf())
}

/// Register a watch on `source` and forward every translated event to
/// `dispatcher`. The returned watcher must be kept alive for the watch to
/// stay active; dropping it tears the watch down.
///
/// `recursive` controls whether newly created subdirectories are
/// auto-added to the watch; when `false`, only `source`'s own directory is
/// watched.
pub fn spawn(source: &Source, dispatcher: Arc<Dispatcher>, recursive: bool) -> Result<RecommendedWatcher> {
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for item in translate(&event) {
                dispatcher.dispatch(item);
            }
        }
        Err(err) => tracing::warn!(error = %err, "filesystem watch error"),
    })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(source.watch_path(), mode)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_create_file_is_leaf_on_parent_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        let e = event(EventKind::Create(CreateKind::File), vec![file.clone()]);
        let items = translate(&e);
        assert_eq!(items, vec![Item::leaf(dir.path().to_path_buf())]);
    }

    #[test]
    fn test_create_dir_is_subtree() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let e = event(EventKind::Create(CreateKind::Folder), vec![sub.clone()]);
        let items = translate(&e);
        assert_eq!(items, vec![Item::subtree(sub)]);
    }

    #[test]
    fn test_rename_to_file_classifies_new_path_as_parent_leaf() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("renamed.txt");
        std::fs::write(&file, b"x").unwrap();

        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![file.clone()],
        );
        let items = translate(&e);
        assert_eq!(items, vec![Item::leaf(dir.path().to_path_buf())]);
    }

    #[test]
    fn test_rename_to_dir_is_subtree() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("moved_in");
        std::fs::create_dir(&sub).unwrap();

        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![sub.clone()],
        );
        let items = translate(&e);
        assert_eq!(items, vec![Item::subtree(sub)]);
    }

    #[test]
    fn test_rename_both_emits_leaf_for_source_and_classified_dest() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("old.txt");
        let to = dir.path().join("new.txt");
        std::fs::write(&to, b"x").unwrap();

        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![from.clone(), to.clone()],
        );
        let items = translate(&e);
        assert_eq!(
            items,
            vec![Item::leaf(dir.path().to_path_buf()), Item::leaf(dir.path().to_path_buf())]
        );
    }

    #[test]
    fn test_remove_is_leaf_on_parent_dir() {
        let path = PathBuf::from("/data/sub/gone.txt");
        let e = event(EventKind::Remove(RemoveKind::File), vec![path]);
        let items = translate(&e);
        assert_eq!(items, vec![Item::leaf(PathBuf::from("/data/sub"))]);
    }
}
