/*!
 * syncdrift - live one-way filesystem replicator
 *
 * Watches a directory tree for changes and aggregates them into batched
 * rsync transfers to one or more destinations. Each destination is driven
 * by its own worker thread with independent back-off, so a slow or
 * unreachable destination cannot stall the others.
 */

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod supervisor;
pub mod watch;

pub use config::{Config, ConfigFile, Tunables};
pub use core::{Destination, Dispatcher, Item, ItemQueue, Source, Timer, Worker, WorkerState};
pub use error::{ErrorCategory, Result, SyncError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
