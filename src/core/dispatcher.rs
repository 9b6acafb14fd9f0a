/*!
 * `Dispatcher`: fans a single stream of `Item`s out to every destination's
 * bounded channel. A full channel blocks the dispatcher rather than
 * dropping the event, which is the backpressure mechanism that bounds
 * memory use when a destination falls behind.
 */

use crossbeam_channel::Sender;

use super::item::Item;

pub struct Dispatcher {
    senders: Vec<Sender<Item>>,
}

impl Dispatcher {
    pub fn new(senders: Vec<Sender<Item>>) -> Self {
        Self { senders }
    }

    /// Send `item` to every destination queue, blocking on any queue that
    /// is currently full. A destination whose receiver has been dropped
    /// (its worker exited, e.g. after too many failures) is silently
    /// skipped for the rest of the run.
    pub fn dispatch(&self, item: Item) {
        for sender in &self.senders {
            let _ = sender.send(item.clone());
        }
    }

    pub fn destination_count(&self) -> usize {
        self.senders.len()
    }
}

/// Build a bounded channel sized per the configured queue capacity.
pub fn bounded_channel(capacity: usize) -> (Sender<Item>, crossbeam_channel::Receiver<Item>) {
    crossbeam_channel::bounded(capacity)
}
