/*!
 * `ItemQueue`: the per-destination accumulator that deduplicates incoming
 * `Item`s, collapses leaf items already covered by a queued subtree, and
 * filters out items that can no longer be handed to rsync.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::item::Item;

fn is_subpath(candidate: &Path, root: &Path) -> bool {
    candidate == root || candidate.starts_with(root)
}

/// Accumulates pending changes for one destination between flushes.
///
/// Non-recursive ("leaf") and recursive ("tree") items are tracked in
/// separate sets so that a later subtree notification can drop any leaf
/// items it now subsumes, and so a leaf item arriving under an
/// already-queued subtree is a no-op.
#[derive(Debug, Default)]
pub struct ItemQueue {
    dirs: HashSet<PathBuf>,
    trees: HashSet<PathBuf>,
}

impl ItemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an item, deduplicating and collapsing against what's already
    /// pending.
    pub fn add(&mut self, item: Item) {
        if item.recursive {
            self.trees.retain(|t| !is_subpath(t, &item.path));
            self.dirs.retain(|d| !is_subpath(d, &item.path));

            if !self.trees.iter().any(|t| is_subpath(&item.path, t)) {
                self.trees.insert(item.path);
            }
        } else if !self.trees.iter().any(|t| is_subpath(&item.path, t)) {
            self.dirs.insert(item.path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.trees.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len() + self.trees.len()
    }

    /// Filtered snapshot of the queued leaf paths, dropping any whose path
    /// (and parent) no longer exist. Does not drain the queue: the caller
    /// only empties a half once its transfer has actually succeeded.
    ///
    /// A leaf path is kept even if it no longer exists as long as its
    /// parent directory still does: rsync's directory-level `--delete`
    /// comparison needs that path in the file list to notice and
    /// propagate the removal. If neither the path nor its parent exist,
    /// passing it to rsync would just produce a "no such file or
    /// directory" warning, so it's dropped.
    pub fn pending_dirs(&self) -> Vec<PathBuf> {
        self.dirs.iter().filter(|p| Self::should_keep(p)).cloned().collect()
    }

    /// Filtered snapshot of the queued subtree paths; see `pending_dirs`.
    pub fn pending_trees(&self) -> Vec<PathBuf> {
        self.trees.iter().filter(|p| Self::should_keep(p)).cloned().collect()
    }

    /// Drop every queued leaf path, called once the non-recursive half of
    /// a flush has synced successfully.
    pub fn empty_dirs(&mut self) {
        self.dirs.clear();
    }

    /// Drop every queued subtree path, called once the recursive half of
    /// a flush has synced successfully.
    pub fn empty_trees(&mut self) {
        self.trees.clear();
    }

    fn should_keep(path: &Path) -> bool {
        if path.exists() {
            return true;
        }
        path.parent().map(|p| p.exists()).unwrap_or(false)
    }

    pub fn dirs(&self) -> &HashSet<PathBuf> {
        &self.dirs
    }

    pub fn trees(&self) -> &HashSet<PathBuf> {
        &self.trees
    }
}
