/*!
 * Configuration structures and defaults for syncdrift
 */

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables governing aggregation latency, batching, queue capacity and
/// worker back-off. Defaults match the reference implementation this tool
/// was modeled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Seconds of quiet time after the last change before a flush is forced.
    pub timer_limit_secs: u64,

    /// Force a flush once this many distinct items have accumulated.
    pub max_changes: usize,

    /// During the initial full sync, flush in batches of this size instead
    /// of waiting for `max_changes` or the timer.
    pub max_changes_sync: usize,

    /// Upper bound on a single destination's pending-item channel. Once
    /// full, the dispatcher blocks rather than drop events.
    pub max_queue_len: usize,

    /// Seconds added to the back-off delay per consecutive transfer failure.
    pub time_sleep_failure_secs: u64,

    /// A destination worker is dropped after this many consecutive
    /// transfer failures.
    pub max_sync_failures: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            timer_limit_secs: 60,
            max_changes: 1000,
            max_changes_sync: 100,
            max_queue_len: 100_000,
            time_sleep_failure_secs: 60,
            max_sync_failures: 5,
        }
    }
}

impl Tunables {
    pub fn timer_limit(&self) -> Duration {
        Duration::from_secs(self.timer_limit_secs)
    }

    pub fn back_off_unit(&self) -> Duration {
        Duration::from_secs(self.time_sleep_failure_secs)
    }
}

/// Fully resolved runtime configuration: the merge of CLI flags, an optional
/// TOML config file, and built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory tree to watch. May contain the `/./` virtual-root marker.
    pub source: PathBuf,

    /// Watch the source tree recursively and auto-add newly created
    /// subdirectories to the watch set.
    pub recursive: bool,

    /// Raw destination URIs, parsed later by `destination::parse`.
    pub destinations: Vec<String>,

    /// Path to the rsync binary.
    pub rsync_path: PathBuf,

    /// Perform a full initial sync of each destination before watching
    /// for live changes.
    pub initial_sync: bool,

    /// Log every rsync invocation without executing it.
    pub dry_run: bool,

    /// `tracing` filter directive, e.g. "info" or "syncdrift=debug".
    pub log_level: String,

    /// When set, logs are written as JSON lines to this file instead of
    /// compact text on stdout.
    pub log_file: Option<PathBuf>,

    pub tunables: Tunables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            recursive: true,
            destinations: Vec::new(),
            rsync_path: PathBuf::from("/usr/bin/rsync"),
            initial_sync: true,
            dry_run: false,
            log_level: "info".to_string(),
            log_file: None,
            tunables: Tunables::default(),
        }
    }
}

/// On-disk configuration file structure (TOML).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub recursive: Option<bool>,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub rsync_path: Option<PathBuf>,
    pub initial_sync: Option<bool>,
    pub dry_run: Option<bool>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub tunables: TunablesFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TunablesFile {
    pub timer_limit_secs: Option<u64>,
    pub max_changes: Option<usize>,
    pub max_changes_sync: Option<usize>,
    pub max_queue_len: Option<usize>,
    pub time_sleep_failure_secs: Option<u64>,
    pub max_sync_failures: Option<u32>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("failed to read config file {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("failed to parse config file {}: {}", path.display(), e)))
    }

    /// Load configuration with fallback priority:
    /// 1. ./syncdrift.toml (project-local)
    /// 2. ~/.syncdrift/syncdrift.toml (user default)
    /// 3. built-in defaults (an empty ConfigFile)
    pub fn load_with_fallback() -> Self {
        if let Ok(config) = Self::load(Path::new("syncdrift.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".syncdrift").join("syncdrift.toml");
            if let Ok(config) = Self::load(&user_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Merge this file's values into `config`, overwriting any field the
    /// file sets explicitly. CLI-supplied values should be applied after
    /// this call so they win over the file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref source) = self.source {
            config.source = source.clone();
        }
        if let Some(recursive) = self.recursive {
            config.recursive = recursive;
        }
        if !self.destinations.is_empty() {
            config.destinations = self.destinations.clone();
        }
        if let Some(ref rsync_path) = self.rsync_path {
            config.rsync_path = rsync_path.clone();
        }
        if let Some(initial_sync) = self.initial_sync {
            config.initial_sync = initial_sync;
        }
        if let Some(dry_run) = self.dry_run {
            config.dry_run = dry_run;
        }
        if let Some(ref log_level) = self.log_level {
            config.log_level = log_level.clone();
        }
        if let Some(ref log_file) = self.log_file {
            config.log_file = Some(log_file.clone());
        }

        let t = &self.tunables;
        if let Some(v) = t.timer_limit_secs {
            config.tunables.timer_limit_secs = v;
        }
        if let Some(v) = t.max_changes {
            config.tunables.max_changes = v;
        }
        if let Some(v) = t.max_changes_sync {
            config.tunables.max_changes_sync = v;
        }
        if let Some(v) = t.max_queue_len {
            config.tunables.max_queue_len = v;
        }
        if let Some(v) = t.time_sleep_failure_secs {
            config.tunables.time_sleep_failure_secs = v;
        }
        if let Some(v) = t.max_sync_failures {
            config.tunables.max_sync_failures = v;
        }
    }
}
