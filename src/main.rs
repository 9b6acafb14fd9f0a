/*!
 * syncdrift - live one-way filesystem replicator
 *
 * Watches a directory tree and mirrors changes to one or more rsync
 * destinations as they happen.
 */

use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use syncdrift::{Config, ConfigFile};

#[derive(Parser)]
#[command(name = "syncdrift", version, about = "Live one-way filesystem replicator built on rsync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory tree and mirror changes to one or more destinations
    Watch {
        /// Directory to watch. May contain the `/./` virtual-root marker
        /// to control rsync's relative-path computation.
        source: PathBuf,

        /// Destination URIs: a local path, `host:path`, `host::module/path`,
        /// or `rsync://host[:port]/path`. May be repeated.
        #[arg(required = true)]
        destinations: Vec<String>,

        /// Path to the rsync binary
        #[arg(long, default_value = "/usr/bin/rsync")]
        rsync_path: PathBuf,

        /// Skip the full initial sync and only mirror live changes
        #[arg(long)]
        no_initial_sync: bool,

        /// Watch the source tree non-recursively (new subdirectories are
        /// not auto-added to the watch)
        #[arg(long)]
        no_recursive: bool,

        /// Log every rsync invocation without executing it
        #[arg(long)]
        dry_run: bool,

        /// Path to a TOML config file; falls back to ./syncdrift.toml and
        /// ~/.syncdrift/syncdrift.toml if not given
        #[arg(long)]
        config: Option<PathBuf>,

        /// `tracing` filter directive, e.g. "info" or "syncdrift=debug"
        #[arg(long, default_value = "info")]
        log_level: String,

        /// Write JSON logs to this file instead of compact text on stdout
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Print shell completion scripts
    Completions {
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            source,
            destinations,
            rsync_path,
            no_initial_sync,
            no_recursive,
            dry_run,
            config,
            log_level,
            log_file,
        } => {
            let file_config = match config {
                Some(ref path) => ConfigFile::load(path)
                    .with_context(|| format!("failed to load config file {}", path.display()))?,
                None => ConfigFile::load_with_fallback(),
            };

            // Config file values fill in the built-in defaults; CLI flags
            // then take precedence over both.
            let mut resolved = Config::default();
            file_config.apply_to(&mut resolved);

            resolved.source = source;
            resolved.recursive = !no_recursive;
            resolved.destinations = destinations;
            resolved.rsync_path = rsync_path;
            resolved.initial_sync = !no_initial_sync;
            resolved.dry_run = dry_run;
            resolved.log_level = log_level;
            if log_file.is_some() {
                resolved.log_file = log_file;
            }

            syncdrift::logging::init_logging(&resolved).context("failed to initialize logging")?;

            syncdrift::supervisor::run(resolved).context("watch loop exited with an error")?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut stdout());
        }
    }

    Ok(())
}
