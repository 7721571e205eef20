//! FIFO primitives used by the connection caches.
//!
//! `ConcurrentQueueImpl` and `ConcurrentQueueBlockingImpl` support O(1)
//! removal of any element through a [`QueueHandle`]; the caches rely on that
//! to pull a connection out of the LRU order the moment it becomes busy.
//! `LmsQueue` is lock-free but only supports enqueue/dequeue.

mod blocking;
mod linked;
mod lms;

pub use blocking::{BlockingHandle, ConcurrentQueueBlockingImpl};
pub use linked::{ConcurrentQueueImpl, Iter, PeekedEntry, QueueEntry, QueueHandle};
pub use lms::LmsQueue;
