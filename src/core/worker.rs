/*!
 * `Worker`: the per-destination state machine that drains a channel of
 * queued `Item`s and turns them into batched rsync transfers.
 *
 * States: waiting for the watch to come up (S0), an initial full sync
 * (S1), steady-state running (S2), back-off after a failed transfer (S3),
 * and dropped after too many consecutive failures.
 */

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::destination::Destination;
use super::item::Item;
use super::queue::ItemQueue;
use super::source::Source;
use super::timer::Timer;
use super::transfer::Transfer;
use crate::config::Tunables;

#[derive(Debug)]
pub enum WorkerState {
    WaitingForMonitor,
    InitialSync,
    Running,
    BackOff { until: Instant, failcount: u32 },
    Dropped,
}

pub struct Worker {
    destination: Destination,
    source: Source,
    transfer: Transfer,
    rx: Receiver<Item>,
    tunables: Tunables,
    initial_sync: bool,

    queue: ItemQueue,
    timer: Timer,
    state: WorkerState,
    failcount: u32,
}

impl Worker {
    pub fn new(
        destination: Destination,
        source: Source,
        transfer: Transfer,
        rx: Receiver<Item>,
        tunables: Tunables,
        initial_sync: bool,
    ) -> Self {
        let timer = Timer::new(tunables.timer_limit());
        Self {
            destination,
            source,
            transfer,
            rx,
            tunables,
            initial_sync,
            queue: ItemQueue::new(),
            timer,
            state: WorkerState::WaitingForMonitor,
            failcount: 0,
        }
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Block until the watch is ready, perform an optional initial sync,
    /// then drain `self.rx` until the dispatcher hangs up or this
    /// destination is dropped after too many failures.
    pub fn run(mut self, ready_rx: Receiver<()>) {
        let _ = ready_rx.recv();

        if self.initial_sync {
            self.state = WorkerState::InitialSync;
            let root = self.source.watch_path().to_path_buf();
            self.queue.add(Item::subtree(root));
            if !self.flush() {
                self.state = WorkerState::Dropped;
                return;
            }
            self.state = WorkerState::Running;
        } else {
            self.state = WorkerState::Running;
        }

        loop {
            if matches!(self.state, WorkerState::Dropped) {
                break;
            }

            match self.compute_wait() {
                Some(wait) => match self.rx.recv_timeout(wait) {
                    Ok(item) => self.on_item(item),
                    Err(RecvTimeoutError::Timeout) => self.on_timeout(),
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.rx.recv() {
                    Ok(item) => self.on_item(item),
                    Err(_) => break,
                },
            }
        }
    }

    fn on_item(&mut self, item: Item) {
        self.queue.add(item);
        if !self.timer.is_running() {
            self.timer.start();
        }

        let threshold = if matches!(self.state, WorkerState::InitialSync) {
            self.tunables.max_changes_sync
        } else {
            self.tunables.max_changes
        };

        if self.queue.len() >= threshold {
            self.flush();
        }
    }

    fn on_timeout(&mut self) {
        match &self.state {
            WorkerState::BackOff { until, .. } => {
                if Instant::now() >= *until {
                    self.flush();
                }
            }
            _ => {
                if self.timer.is_running() && self.timer.expired() {
                    self.flush();
                }
            }
        }
    }

    fn compute_wait(&self) -> Option<Duration> {
        match &self.state {
            WorkerState::BackOff { until, .. } => Some(until.saturating_duration_since(Instant::now())),
            _ => {
                if self.timer.is_running() {
                    Some(self.timer.remaining())
                } else {
                    None
                }
            }
        }
    }

    /// Attempt to sync whatever is pending. Each half (non-recursive
    /// `dirs`, recursive `trees`) is emptied from the queue only if its
    /// own transfer succeeded, so a failed half stays queued and is
    /// retried on the next flush instead of being lost. Returns whether
    /// both halves succeeded.
    fn flush(&mut self) -> bool {
        if self.queue.is_empty() {
            self.timer.stop();
            return true;
        }

        let dirs = self.queue.pending_dirs();
        let trees = self.queue.pending_trees();
        self.timer.stop();

        if dirs.is_empty() && trees.is_empty() {
            // Everything queued was stale (the path and its parent are both
            // gone): nothing to hand rsync, but still drop it so it doesn't
            // sit in the queue forever being re-filtered to nothing.
            self.queue.empty_dirs();
            self.queue.empty_trees();
            return true;
        }

        let outcome = self.transfer.sync(&self.source, &self.destination, &dirs, &trees);

        if outcome.dirs.is_ok() {
            self.queue.empty_dirs();
        }
        if outcome.trees.is_ok() {
            self.queue.empty_trees();
        }

        if outcome.is_ok() {
            self.failcount = 0;
            self.state = WorkerState::Running;
            return true;
        }

        for err in [&outcome.dirs, &outcome.trees].into_iter().filter_map(|r| r.as_ref().err()) {
            tracing::warn!(
                destination = %self.destination,
                error = %err,
                "transfer failed"
            );
        }
        self.failcount += 1;

        if self.failcount >= self.tunables.max_sync_failures {
            tracing::error!(
                destination = %self.destination,
                failures = self.failcount,
                "dropping destination after repeated transfer failures"
            );
            self.state = WorkerState::Dropped;
        } else {
            let delay = self.tunables.back_off_unit() * self.failcount;
            self.state = WorkerState::BackOff {
                until: Instant::now() + delay,
                failcount: self.failcount,
            };
        }

        false
    }
}

#[cfg(test)]
impl Worker {
    fn test_worker(dry_run: bool, tunables: Tunables) -> (Self, crossbeam_channel::Sender<Item>) {
        Self::test_worker_with_initial_sync(dry_run, tunables, false)
    }

    fn test_worker_with_initial_sync(
        dry_run: bool,
        tunables: Tunables,
        initial_sync: bool,
    ) -> (Self, crossbeam_channel::Sender<Item>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let destination = Destination::parse("/tmp/syncdrift-test-dest");
        let source = Source::parse("/tmp/syncdrift-test-src");
        let transfer = Transfer::new(std::path::PathBuf::from("/no/such/rsync"), dry_run);
        let worker = Worker::new(destination, source, transfer, rx, tunables, initial_sync);
        (worker, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_item_starts_timer() {
        let (mut worker, _tx) = Worker::test_worker(true, Tunables::default());
        assert!(!worker.timer.is_running());
        worker.on_item(Item::leaf("/tmp/syncdrift-test-src/a.txt"));
        assert!(worker.timer.is_running());
        assert_eq!(worker.queue.len(), 1);
    }

    #[test]
    fn test_flush_on_threshold() {
        let mut tunables = Tunables::default();
        tunables.max_changes = 2;
        let (mut worker, _tx) = Worker::test_worker(true, tunables);
        worker.state = WorkerState::Running;

        worker.on_item(Item::leaf("/tmp/syncdrift-test-src/a.txt"));
        assert_eq!(worker.queue.len(), 1);
        worker.on_item(Item::leaf("/tmp/syncdrift-test-src/b.txt"));
        // Flushed because dry-run always succeeds, so the queue is drained.
        assert_eq!(worker.queue.len(), 0);
    }

    #[test]
    fn test_failed_transfer_enters_backoff() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 5;
        tunables.time_sleep_failure_secs = 60;
        // dry_run = false with a nonexistent rsync binary: the spawn fails.
        let (mut worker, _tx) = Worker::test_worker(false, tunables);
        worker.state = WorkerState::Running;
        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/a.txt"));

        worker.flush();

        match worker.state {
            WorkerState::BackOff { failcount, .. } => assert_eq!(failcount, 1),
            other => panic!("expected BackOff, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_flush_keeps_items_queued_for_retry() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 5;
        let (mut worker, _tx) = Worker::test_worker(false, tunables);
        worker.state = WorkerState::Running;
        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/a.txt"));

        let ok = worker.flush();

        assert!(!ok);
        assert!(matches!(worker.state, WorkerState::BackOff { failcount: 1, .. }));
        // The failed half was not drained: it's still pending for the
        // next flush to retry, instead of being silently lost.
        assert_eq!(worker.queue.len(), 1);
    }

    #[test]
    fn test_initial_sync_drops_worker_immediately_on_failure() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 5;
        let (mut worker, _tx) = Worker::test_worker(false, tunables);
        worker.state = WorkerState::InitialSync;
        worker.queue.add(Item::subtree("/tmp/syncdrift-test-src"));

        let ok = worker.flush();
        assert!(!ok);

        // A real run() would see this false return and drop immediately
        // rather than entering back-off; flush() itself only reports
        // success/failure and leaves that policy decision to the caller.
    }

    #[test]
    fn test_flush_purges_entirely_stale_queue_without_touching_rsync() {
        let (mut worker, _tx) = Worker::test_worker(false, Tunables::default());
        worker.state = WorkerState::Running;
        // Neither the path nor its parent exist, so it's pure garbage.
        worker.queue.add(Item::leaf("/no/such/parent/gone.txt"));

        let ok = worker.flush();

        assert!(ok);
        assert!(worker.queue.is_empty());
        assert!(matches!(worker.state, WorkerState::Running));
    }

    #[test]
    fn test_worker_dropped_after_max_failures() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 2;
        let (mut worker, _tx) = Worker::test_worker(false, tunables);
        worker.state = WorkerState::Running;

        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/a.txt"));
        worker.flush();
        assert!(matches!(worker.state, WorkerState::BackOff { .. }));

        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/b.txt"));
        worker.flush();
        assert!(matches!(worker.state, WorkerState::Dropped));
    }

    #[test]
    fn test_empty_flush_is_a_noop() {
        let (mut worker, _tx) = Worker::test_worker(true, Tunables::default());
        worker.timer.start();
        worker.flush();
        assert!(!worker.timer.is_running());
        assert!(matches!(worker.state, WorkerState::WaitingForMonitor));
    }

    #[test]
    fn test_backoff_delay_grows_with_failcount() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 10;
        tunables.time_sleep_failure_secs = 10;
        let (mut worker, _tx) = Worker::test_worker(false, tunables);
        worker.state = WorkerState::Running;

        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/a.txt"));
        worker.flush();
        let first_wait = worker.compute_wait().unwrap();

        worker.queue.add(Item::leaf("/tmp/syncdrift-test-src/b.txt"));
        worker.flush();
        let second_wait = worker.compute_wait().unwrap();

        assert!(second_wait > first_wait);
    }

    #[test]
    fn test_run_drops_immediately_on_failed_initial_sync() {
        let mut tunables = Tunables::default();
        tunables.max_sync_failures = 1000; // would never trip via the back-off path
        let (worker, _tx) = Worker::test_worker_with_initial_sync(false, tunables, true);

        let (ready_tx, ready_rx) = crossbeam_channel::unbounded();
        ready_tx.send(()).unwrap();

        // If a failed initial sync fell through to back-off instead of
        // dropping immediately, this would hang forever retrying against
        // the nonexistent rsync binary and never return.
        worker.run(ready_rx);
    }
}
