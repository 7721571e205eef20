use super::linked::{ConcurrentQueueImpl, QueueEntry, QueueHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// [`ConcurrentQueueImpl`] behind a single mutex.
///
/// Every operation mutates the shared links, so there is no read/write
/// split: one lock guards everything.
pub struct ConcurrentQueueBlockingImpl<V> {
    inner: Arc<Mutex<ConcurrentQueueImpl<V>>>,
}

impl<V> ConcurrentQueueBlockingImpl<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConcurrentQueueImpl::new(ttl))),
        }
    }

    pub fn offer(&self, value: V) -> BlockingHandle<V> {
        let handle = self.inner.lock().offer(value);
        BlockingHandle {
            queue: Arc::clone(&self.inner),
            handle,
        }
    }

    pub fn poll(&self) -> Option<QueueEntry<V>> {
        self.inner.lock().poll()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.lock().ttl()
    }
}

impl<V: Clone> ConcurrentQueueBlockingImpl<V> {
    /// Copy of the oldest element, left in place.
    pub fn peek(&self) -> Option<QueueEntry<V>> {
        let queue = self.inner.lock();
        let peeked = queue.peek()?;
        let handle = peeked.handle;
        let value = peeked.value.clone();
        let expiration = peeked.expiration;
        drop(queue);
        Some(QueueEntry::from_parts(handle, value, expiration))
    }

    /// Values from oldest to newest, copied under the lock.
    pub fn snapshot(&self) -> Vec<V> {
        self.inner.lock().iter().cloned().collect()
    }
}

/// Handle into a [`ConcurrentQueueBlockingImpl`].
///
/// Holds a reference to the queue, so removal needs nothing else.
pub struct BlockingHandle<V> {
    queue: Arc<Mutex<ConcurrentQueueImpl<V>>>,
    handle: QueueHandle,
}

impl<V> BlockingHandle<V> {
    /// Unlinks the element. `false` if it was already removed or polled.
    pub fn remove(&self) -> bool {
        self.queue.lock().remove(self.handle)
    }

    pub fn is_queued(&self) -> bool {
        self.queue.lock().contains(self.handle)
    }

    pub fn expiration(&self) -> Option<Instant> {
        self.queue.lock().expiration(self.handle)
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle
    }
}

impl<V: Clone> BlockingHandle<V> {
    pub fn value(&self) -> Option<V> {
        self.queue.lock().value(self.handle).cloned()
    }
}

impl<V> std::fmt::Debug for BlockingHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingHandle")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<V> std::fmt::Debug for ConcurrentQueueBlockingImpl<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentQueueBlockingImpl")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let q = ConcurrentQueueBlockingImpl::new(Duration::from_secs(60));
        for i in 0..5u32 {
            q.offer(i);
        }

        let polled: Vec<_> = std::iter::from_fn(|| q.poll().map(QueueEntry::into_value)).collect();
        assert_eq!(polled, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_handle_remove_is_single_use() {
        let q = ConcurrentQueueBlockingImpl::new(Duration::from_secs(60));
        q.offer("a");
        let h = q.offer("b");

        assert_eq!(h.value(), Some("b"));
        assert!(h.remove());
        assert!(!h.remove());
        assert_eq!(h.value(), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_remove_after_poll_returns_false() {
        let q = ConcurrentQueueBlockingImpl::new(Duration::from_secs(60));
        let h = q.offer(7u8);

        assert_eq!(q.poll().unwrap().into_value(), 7);
        assert!(!h.is_queued());
        assert!(!h.remove());
    }

    #[test]
    fn test_peek_and_snapshot_copy_values() {
        let q = ConcurrentQueueBlockingImpl::new(Duration::from_secs(60));
        let h = q.offer("x".to_string());
        q.offer("y".to_string());

        let peeked = q.peek().unwrap();
        assert_eq!(peeked.handle(), h.handle());
        assert_eq!(peeked.value(), "x");
        assert_eq!(q.snapshot(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(q.len(), 2);
        assert!(h.expiration().is_some());
    }

    #[test]
    fn test_concurrent_offer_and_remove() {
        let q = ConcurrentQueueBlockingImpl::new(Duration::from_secs(60));

        thread::scope(|s| {
            for t in 0..4u32 {
                let q = &q;
                s.spawn(move || {
                    for i in 0..1000u32 {
                        let h = q.offer(t * 1000 + i);
                        if i % 2 == 0 {
                            assert!(h.remove());
                        }
                    }
                });
            }
        });

        assert_eq!(q.len(), 2000);
        let values: HashSet<_> = std::iter::from_fn(|| q.poll().map(QueueEntry::into_value)).collect();
        assert_eq!(values.len(), 2000);
        assert!(values.iter().all(|v| v % 2 == 1));
    }
}
