/*!
 * `supervisor`: wires the source, destinations, dispatcher, watch and
 * worker threads together and runs them until shutdown is requested.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::config::Config;
use crate::core::dispatcher::{bounded_channel, Dispatcher};
use crate::core::item::Item;
use crate::core::source::Source;
use crate::core::transfer::Transfer;
use crate::core::worker::Worker;
use crate::error::Result;
use crate::watch;

/// Build the source, one worker thread per destination, the dispatcher and
/// the filesystem watch, then block until a termination signal arrives or
/// every worker has exited (e.g. all destinations were dropped).
pub fn run(config: Config) -> Result<()> {
    let source = Source::parse(&config.source.to_string_lossy());

    Transfer::new(config.rsync_path.clone(), config.dry_run).check_executable()?;

    let mut senders: Vec<Sender<Item>> = Vec::with_capacity(config.destinations.len());
    let mut ready_senders = Vec::with_capacity(config.destinations.len());
    let mut handles = Vec::with_capacity(config.destinations.len());

    for raw in &config.destinations {
        let destination = crate::core::destination::Destination::parse(raw);
        let (tx, rx) = bounded_channel(config.tunables.max_queue_len);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<()>(1);

        let transfer = Transfer::new(config.rsync_path.clone(), config.dry_run);
        let worker = Worker::new(
            destination,
            source.clone(),
            transfer,
            rx,
            config.tunables,
            config.initial_sync,
        );
        let thread_name = format!("worker-{}", worker.destination().shortname);

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run(ready_rx))?;

        senders.push(tx);
        ready_senders.push(ready_tx);
        handles.push(handle);
    }

    let dispatcher = Some(Arc::new(Dispatcher::new(senders)));
    let watcher = Some(watch::spawn(&source, dispatcher.clone().unwrap(), config.recursive)?);

    for ready_tx in ready_senders {
        let _ = ready_tx.send(());
    }

    tracing::info!(
        source = %source.watch_path().display(),
        destinations = handles.len(),
        "watching for changes"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, shutdown.clone())?;
    signal_hook::flag::register(SIGINT, shutdown.clone())?;

    // Dropping the watcher and dispatcher closes every worker's channel,
    // which unblocks their `recv` with a disconnect and lets them exit.
    let mut watcher = watcher;
    let mut dispatcher = dispatcher;
    while !shutdown.load(Ordering::Relaxed) {
        if handles.iter().all(|h| h.is_finished()) {
            break;
        }
        thread::sleep(Duration::from_millis(250));
    }

    watcher.take();
    dispatcher.take();

    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}
