/*!
 * `Transfer`: invokes rsync as a subprocess, feeding it a NUL-delimited
 * list of paths over stdin.
 */

use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::destination::Destination;
use super::source::Source;
use crate::error::{Result, SyncError};

/// Options for a flush that only touches the listed paths themselves
/// (`-d`: don't descend into queued directories).
const RSYNC_OPTIONS: &[&str] = &["-Rd", "--files-from=-", "--from0", "-HpltogD", "--delete"];

/// Options for a flush that must recurse into the queued directories
/// (`-r`), used for subtree items such as a newly created directory.
const RSYNC_OPTIONS_RECURSIVE: &[&str] =
    &["-Rr", "--files-from=-", "--from0", "-HpltogD", "--delete"];

/// Per-half result of a `sync()` call: the non-recursive (`dirs`) and
/// recursive (`trees`) batches are independent rsync invocations, so one
/// can fail while the other succeeds.
pub struct SyncOutcome {
    pub dirs: Result<()>,
    pub trees: Result<()>,
}

impl SyncOutcome {
    pub fn is_ok(&self) -> bool {
        self.dirs.is_ok() && self.trees.is_ok()
    }
}

pub struct Transfer {
    rsync_path: PathBuf,
    dry_run: bool,
}

impl Transfer {
    pub fn new(rsync_path: PathBuf, dry_run: bool) -> Self {
        Self { rsync_path, dry_run }
    }

    /// Verify the configured rsync binary exists and is executable. Meant
    /// to be called once at startup so a misconfiguration fails fast
    /// instead of on the first flush.
    pub fn check_executable(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.rsync_path)
            .map_err(|_| SyncError::TransferNotExecutable(self.rsync_path.clone()))?;

        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(SyncError::TransferNotExecutable(self.rsync_path.clone()));
        }

        Ok(())
    }

    /// Flush a batch of leaf and subtree paths to `destination`. Leaf
    /// paths and subtree paths require different rsync flags, so this may
    /// spawn up to two rsync invocations; either is skipped if its path
    /// list is empty. The two invocations proceed independently: a
    /// failure in one does not prevent the other from being attempted, so
    /// the caller can see exactly which half needs to be retried.
    pub fn sync(
        &self,
        source: &Source,
        destination: &Destination,
        dirs: &[PathBuf],
        trees: &[PathBuf],
    ) -> SyncOutcome {
        let dir_paths: Vec<PathBuf> = dirs
            .iter()
            .map(|p| source.rsync_relative_path(p))
            .collect();
        let tree_paths: Vec<PathBuf> = trees
            .iter()
            .map(|p| source.rsync_relative_path(p))
            .collect();

        let dirs_result = self.invoke(RSYNC_OPTIONS, source.effective_base(), &dir_paths, destination);
        let trees_result =
            self.invoke(RSYNC_OPTIONS_RECURSIVE, source.effective_base(), &tree_paths, destination);

        SyncOutcome {
            dirs: dirs_result,
            trees: trees_result,
        }
    }

    fn invoke(
        &self,
        options: &[&str],
        base: &Path,
        paths: &[PathBuf],
        destination: &Destination,
    ) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let target = &destination.normalized_path;

        if self.dry_run {
            tracing::info!(
                rsync = %self.rsync_path.display(),
                options = ?options,
                base = %base.display(),
                count = paths.len(),
                target = %target,
                "dry-run: would invoke rsync"
            );
            return Ok(());
        }

        let mut child = Command::new(&self.rsync_path)
            .args(options)
            .arg(base)
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SyncError::TransferFailed(format!("failed to spawn rsync: {}", e)))?;

        {
            let stdin = child.stdin.as_mut().ok_or_else(|| {
                SyncError::TransferFailed("rsync child has no stdin pipe".to_string())
            })?;
            write_path_list(stdin, paths)
                .map_err(|e| SyncError::TransferFailed(format!("failed to write to rsync stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SyncError::TransferFailed(format!("failed to wait for rsync: {}", e)))?;

        if !output.status.success() {
            return Err(SyncError::TransferFailed(format!(
                "rsync to {} exited with {}: {}",
                target,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

fn write_path_list(writer: &mut dyn Write, paths: &[PathBuf]) -> std::io::Result<()> {
    for path in paths {
        writer.write_all(path.as_os_str().as_bytes())?;
        writer.write_all(b"\0")?;
    }
    Ok(())
}
