/*!
 * `Source`: the watched directory tree, including the virtual-root marker
 * that controls how rsync lays out destination paths relative to it.
 */

use std::path::{Path, PathBuf};

/// Embedded in a source path to mark where rsync's relative-path
/// computation should start. Everything before the marker becomes the
/// virtual root stripped from the destination layout; everything after is
/// preserved.
pub const VIRTUAL_ROOT_MARKER: &str = "/./";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// The directory rsync paths are made relative to. `None` means there
    /// is no virtual root: the effective base is the filesystem root and
    /// items are synced by their full absolute path.
    vroot: Option<PathBuf>,
    /// The full, absolute path actually being watched.
    watch_path: PathBuf,
}

impl Source {
    /// Parse a configured source path.
    ///
    /// - `.` resolves to the current working directory, used as its own
    ///   virtual root.
    /// - A path containing `/./` splits into `(vroot, rest)`.
    /// - Anything else has no virtual root: the watched path is used
    ///   verbatim (absolute) and synced paths are passed to rsync unmodified.
    pub fn parse(raw: &str) -> Self {
        if raw == "." {
            let abs = to_absolute(Path::new("."));
            return Self {
                vroot: Some(abs.clone()),
                watch_path: abs,
            };
        }

        if let Some(idx) = raw.find(VIRTUAL_ROOT_MARKER) {
            let vroot = to_absolute(Path::new(&raw[..idx]));
            let rest = &raw[idx + VIRTUAL_ROOT_MARKER.len()..];
            let watch_path = vroot.join(rest);
            return Self {
                vroot: Some(vroot),
                watch_path,
            };
        }

        let watch_path = to_absolute(Path::new(raw));
        Self {
            vroot: None,
            watch_path,
        }
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn vroot(&self) -> Option<&Path> {
        self.vroot.as_deref()
    }

    /// The directory handed to rsync as its source operand: the virtual
    /// root if one is configured, or the filesystem root otherwise.
    pub fn effective_base(&self) -> &Path {
        match &self.vroot {
            Some(vroot) => vroot,
            None => Path::new("/"),
        }
    }

    /// Build the path to hand rsync (on its `--files-from` stdin) for a
    /// given absolute item path: relative to the virtual root if one is
    /// configured, or the untouched absolute path otherwise.
    pub fn rsync_relative_path(&self, absolute: &Path) -> PathBuf {
        match &self.vroot {
            Some(vroot) => absolute
                .strip_prefix(vroot)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| absolute.to_path_buf()),
            None => absolute.to_path_buf(),
        }
    }
}

fn to_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
