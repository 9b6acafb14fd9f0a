/*!
 * Core aggregation engine: the data types and state machines that turn a
 * stream of filesystem events into batched rsync transfers per destination.
 */

pub mod destination;
pub mod dispatcher;
pub mod item;
pub mod queue;
pub mod source;
pub mod timer;
pub mod transfer;
pub mod worker;

pub use destination::Destination;
pub use dispatcher::Dispatcher;
pub use item::Item;
pub use queue::ItemQueue;
pub use source::Source;
pub use timer::Timer;
pub use worker::{Worker, WorkerState};
