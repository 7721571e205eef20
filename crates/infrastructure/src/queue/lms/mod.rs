//! Optimistic lock-free FIFO after Ladan-Mozes & Shavit.
//!
//! Enqueue needs a single CAS on `tail`. Each node's `next` points to the
//! node enqueued before it and is set before that CAS; `prev` points the
//! other way and is written afterwards with a plain store. Dequeue walks
//! `head.prev`; when that link is missing or carries the wrong tag it runs
//! `fix_list`, which rebuilds `prev` from the `next` chain.
//!
//! Nodes live in a [`NodeArena`] and are referenced by `(index, tag)` pairs,
//! so a recycled node is told apart from its previous life by the tag.

mod arena;

use arena::{NodeArena, Tagged};
use ferrous_orb_domain::QueueError;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Lock-free unbounded FIFO supporting only `enqueue` and `dequeue`.
///
/// Unlike [`ConcurrentQueueImpl`](super::ConcurrentQueueImpl) it cannot
/// remove an arbitrary element, so it is not a drop-in LRU list for the
/// caches.
pub struct LmsQueue<T> {
    arena: NodeArena<T>,
    head: AtomicU64,
    tail: AtomicU64,
    len: AtomicI64,
}

impl<T> LmsQueue<T> {
    pub fn new() -> Self {
        let arena = NodeArena::new();
        // The first allocation of a fresh arena is index 0 and cannot fail.
        let dummy = arena.allocate(None, true).unwrap_or(0);
        let start = Tagged::new(dummy, 0).pack();
        Self {
            arena,
            head: AtomicU64::new(start),
            tail: AtomicU64::new(start),
            len: AtomicI64::new(0),
        }
    }

    pub fn enqueue(&self, value: T) -> Result<(), QueueError> {
        let index = self.arena.allocate(Some(value), false)?;
        let node = self.arena.node(index);

        loop {
            let tail = Tagged::load(&self.tail);
            node.next.store(
                Tagged::new(tail.index, tail.tag.wrapping_add(1)).pack(),
                Ordering::SeqCst,
            );
            let new_tail = Tagged::new(index, tail.tag.wrapping_add(1));
            if self
                .tail
                .compare_exchange(tail.pack(), new_tail.pack(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.arena
                    .node(tail.index)
                    .prev
                    .store(Tagged::new(index, tail.tag).pack(), Ordering::SeqCst);
                self.len.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        }
    }

    /// Oldest value, or `None` when the queue is empty.
    pub fn dequeue(&self) -> Option<T> {
        loop {
            let head = Tagged::load(&self.head);
            let tail = Tagged::load(&self.tail);
            let head_node = self.arena.node(head.index);
            let first_prev = Tagged::unpack(head_node.prev.load(Ordering::SeqCst));
            let head_is_dummy = head_node.dummy.load(Ordering::SeqCst);

            if head.pack() != self.head.load(Ordering::SeqCst) {
                continue;
            }

            if head_is_dummy {
                if tail.index == head.index {
                    return None;
                }
                if first_prev.is_null() || first_prev.tag != head.tag {
                    self.fix_list(tail, head);
                    continue;
                }
                let new_head = Tagged::new(first_prev.index, head.tag.wrapping_add(1));
                if self
                    .head
                    .compare_exchange(head.pack(), new_head.pack(), Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    self.arena.release(head.index);
                }
                continue;
            }

            if tail == head {
                // Last real node: queue a dummy behind it so head can move on.
                self.push_dummy(tail, head_node);
                continue;
            }
            if first_prev.is_null() || first_prev.tag != head.tag {
                self.fix_list(tail, head);
                continue;
            }

            let new_head = Tagged::new(first_prev.index, head.tag.wrapping_add(1));
            if self
                .head
                .compare_exchange(head.pack(), new_head.pack(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // SAFETY: only the thread whose CAS moved `head` past this
                // node reaches here for it, and the node is not released
                // until after the take.
                let value = unsafe { (*head_node.value.get()).take() };
                self.arena.release(head.index);
                self.len.fetch_sub(1, Ordering::Relaxed);
                return value;
            }
        }
    }

    /// Approximate element count; exact when no operation is in flight.
    pub fn len_hint(&self) -> usize {
        self.len.load(Ordering::Relaxed).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        let head = Tagged::load(&self.head);
        let tail = Tagged::load(&self.tail);
        head.index == tail.index && self.arena.node(head.index).dummy.load(Ordering::SeqCst)
    }

    fn push_dummy(&self, tail: Tagged, head_node: &arena::Node<T>) {
        // Without a free node the dequeue retries; other threads keep
        // releasing nodes as they dequeue.
        let Ok(dummy) = self.arena.allocate(None, true) else {
            std::hint::spin_loop();
            return;
        };
        self.arena.node(dummy).next.store(
            Tagged::new(tail.index, tail.tag.wrapping_add(1)).pack(),
            Ordering::SeqCst,
        );
        let new_tail = Tagged::new(dummy, tail.tag.wrapping_add(1));
        if self
            .tail
            .compare_exchange(tail.pack(), new_tail.pack(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            head_node
                .prev
                .store(Tagged::new(dummy, tail.tag).pack(), Ordering::SeqCst);
        } else {
            self.arena.release(dummy);
        }
    }

    /// Rebuilds `prev` links from `tail` back to `head` using the `next`
    /// chain. Stops as soon as `head` moves.
    fn fix_list(&self, tail: Tagged, head: Tagged) {
        let mut current = tail;
        while head.pack() == self.head.load(Ordering::SeqCst) && current.index != head.index {
            let next = Tagged::load(&self.arena.node(current.index).next);
            if next.is_null() {
                return;
            }
            let back_tag = current.tag.wrapping_sub(1);
            self.arena
                .node(next.index)
                .prev
                .store(Tagged::new(current.index, back_tag).pack(), Ordering::SeqCst);
            current = Tagged::new(next.index, back_tag);
        }
    }
}

impl<T> Default for LmsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for LmsQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmsQueue")
            .field("len_hint", &self.len_hint())
            .finish()
    }
}
