/*!
 * Error types for syncdrift
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// A destination URI or config value could not be parsed or was out of range
    Config(String),

    /// The configured rsync binary does not exist or is not executable
    TransferNotExecutable(PathBuf),

    /// The rsync subprocess exited with a non-zero status or could not be spawned
    TransferFailed(String),

    /// The filesystem watch could not be established (missing source, inotify limits, ...)
    WatchInit(String),

    /// Underlying I/O error
    Io(io::Error),
}

impl SyncError {
    /// Whether this error should stop the whole daemon, as opposed to just
    /// backing off a single destination worker.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Config(_) => true,
            SyncError::WatchInit(_) => true,
            SyncError::TransferNotExecutable(_) => true,
            SyncError::TransferFailed(_) => false,
            SyncError::Io(_) => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::Config(_) => ErrorCategory::Configuration,
            SyncError::TransferNotExecutable(_) | SyncError::TransferFailed(_) => {
                ErrorCategory::Transfer
            }
            SyncError::WatchInit(_) => ErrorCategory::Watch,
            SyncError::Io(_) => ErrorCategory::IoError,
        }
    }
}

/// Error category for classification and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    IoError,
    Transfer,
    Watch,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Transfer => write!(f, "transfer"),
            ErrorCategory::Watch => write!(f, "watch"),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Config(msg) => write!(f, "configuration error: {}", msg),
            SyncError::TransferNotExecutable(path) => {
                write!(f, "rsync binary not executable: {}", path.display())
            }
            SyncError::TransferFailed(msg) => write!(f, "transfer failed: {}", msg),
            SyncError::WatchInit(msg) => write!(f, "failed to initialize filesystem watch: {}", msg),
            SyncError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SyncError {
    fn from(err: io::Error) -> Self {
        SyncError::Io(err)
    }
}

impl From<notify::Error> for SyncError {
    fn from(err: notify::Error) -> Self {
        SyncError::WatchInit(err.to_string())
    }
}
