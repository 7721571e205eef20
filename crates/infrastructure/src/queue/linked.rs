use std::time::{Duration, Instant};

/// Slot 0 is the sentinel: `slots[0].next` is the oldest element and
/// `slots[0].prev` the newest. The queue is empty when the sentinel links
/// to itself.
const SENTINEL: u32 = 0;

// Keeps `Instant + ttl` representable on every platform.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Identifies one queued element.
///
/// A handle stays valid until its element is polled or removed. Slots are
/// recycled, so the generation distinguishes a live element from a stale
/// handle pointing at a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueHandle {
    index: u32,
    generation: u64,
}

/// An element taken out of the queue.
#[derive(Debug)]
pub struct QueueEntry<V> {
    handle: QueueHandle,
    value: V,
    expiration: Instant,
}

impl<V> QueueEntry<V> {
    pub(crate) fn from_parts(handle: QueueHandle, value: V, expiration: Instant) -> Self {
        Self {
            handle,
            value,
            expiration,
        }
    }

    /// The handle the element had while queued. Already stale.
    pub fn handle(&self) -> QueueHandle {
        self.handle
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn expiration(&self) -> Instant {
        self.expiration
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expiration <= now
    }
}

/// A view of the oldest element, left in place.
#[derive(Debug)]
pub struct PeekedEntry<'a, V> {
    pub handle: QueueHandle,
    pub value: &'a V,
    pub expiration: Instant,
}

struct Slot<V> {
    value: Option<V>,
    expiration: Instant,
    prev: u32,
    next: u32,
    generation: u64,
}

impl<V> Slot<V> {
    fn unlinked(now: Instant) -> Self {
        Self {
            value: None,
            expiration: now,
            prev: SENTINEL,
            next: SENTINEL,
            generation: 0,
        }
    }
}

/// Unsynchronized doubly-linked FIFO over an arena of slots.
///
/// Callers that share it between threads must hold their own lock around
/// every call; [`ConcurrentQueueBlockingImpl`](super::ConcurrentQueueBlockingImpl)
/// is the self-locking variant.
///
/// Each element carries an expiration of `insertion time + ttl`. The queue
/// stores it and never acts on it.
pub struct ConcurrentQueueImpl<V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    len: usize,
    ttl: Duration,
}

impl<V> ConcurrentQueueImpl<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: vec![Slot::unlinked(Instant::now())],
            free: Vec::new(),
            len: 0,
            ttl: ttl.min(MAX_TTL),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.slots[SENTINEL as usize].next == SENTINEL
    }

    /// Appends `value` at the tail.
    pub fn offer(&mut self, value: V) -> QueueHandle {
        let now = Instant::now();
        let expiration = now.checked_add(self.ttl).unwrap_or(now);

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                debug_assert!(self.slots.len() < u32::MAX as usize);
                self.slots.push(Slot::unlinked(now));
                (self.slots.len() - 1) as u32
            }
        };

        let tail = self.slots[SENTINEL as usize].prev;
        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        slot.expiration = expiration;
        slot.prev = tail;
        slot.next = SENTINEL;
        let generation = slot.generation;

        self.slots[tail as usize].next = index;
        self.slots[SENTINEL as usize].prev = index;
        self.len += 1;

        QueueHandle { index, generation }
    }

    /// Removes and returns the oldest element.
    pub fn poll(&mut self) -> Option<QueueEntry<V>> {
        let first = self.slots[SENTINEL as usize].next;
        if first == SENTINEL {
            return None;
        }
        let handle = QueueHandle {
            index: first,
            generation: self.slots[first as usize].generation,
        };
        let (value, expiration) = self.unlink(first)?;
        Some(QueueEntry {
            handle,
            value,
            expiration,
        })
    }

    pub fn peek(&self) -> Option<PeekedEntry<'_, V>> {
        let first = self.slots[SENTINEL as usize].next;
        let slot = self.slots.get(first as usize).filter(|_| first != SENTINEL)?;
        Some(PeekedEntry {
            handle: QueueHandle {
                index: first,
                generation: slot.generation,
            },
            value: slot.value.as_ref()?,
            expiration: slot.expiration,
        })
    }

    /// Unlinks the element behind `handle`. Returns `false` when the handle
    /// is stale: already removed, polled, or from another queue.
    pub fn remove(&mut self, handle: QueueHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        self.unlink(handle.index).is_some()
    }

    pub fn contains(&self, handle: QueueHandle) -> bool {
        handle.index != SENTINEL
            && self
                .slots
                .get(handle.index as usize)
                .is_some_and(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    pub fn value(&self, handle: QueueHandle) -> Option<&V> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index as usize].value.as_ref()
    }

    pub fn expiration(&self, handle: QueueHandle) -> Option<Instant> {
        if !self.contains(handle) {
            return None;
        }
        Some(self.slots[handle.index as usize].expiration)
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: &self.slots,
            cursor: self.slots[SENTINEL as usize].next,
        }
    }

    fn unlink(&mut self, index: u32) -> Option<(V, Instant)> {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.prev, slot.next)
        };
        self.slots[prev as usize].next = next;
        self.slots[next as usize].prev = prev;

        let slot = &mut self.slots[index as usize];
        let value = slot.value.take();
        slot.prev = SENTINEL;
        slot.next = SENTINEL;
        slot.generation = slot.generation.wrapping_add(1);
        let expiration = slot.expiration;

        self.free.push(index);
        self.len -= 1;
        value.map(|value| (value, expiration))
    }
}

impl<V> std::fmt::Debug for ConcurrentQueueImpl<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentQueueImpl")
            .field("len", &self.len)
            .field("ttl", &self.ttl)
            .finish()
    }
}

pub struct Iter<'a, V> {
    slots: &'a [Slot<V>],
    cursor: u32,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == SENTINEL {
            return None;
        }
        let slot = &self.slots[self.cursor as usize];
        self.cursor = slot.next;
        slot.value.as_ref()
    }
}
