use ferrous_orb_domain::QueueError;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::OnceLock;

/// Index that never names a node.
pub(super) const NULL: u32 = u32::MAX;

// Segment k holds 1 << (k + FIRST_SEGMENT_BITS) nodes, so 27 segments cover
// every index below u32::MAX - 32.
const FIRST_SEGMENT_BITS: u32 = 5;
const SEGMENT_COUNT: usize = (u32::BITS - FIRST_SEGMENT_BITS) as usize;
const CAPACITY: u64 = (1u64 << u32::BITS) - (1u64 << FIRST_SEGMENT_BITS);

/// Arena index plus a modification tag, packed into one `u64` so that both
/// change in a single compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Tagged {
    pub index: u32,
    pub tag: u32,
}

impl Tagged {
    pub const fn new(index: u32, tag: u32) -> Self {
        Self { index, tag }
    }

    pub const fn pack(self) -> u64 {
        ((self.tag as u64) << 32) | self.index as u64
    }

    pub const fn unpack(raw: u64) -> Self {
        Self {
            index: raw as u32,
            tag: (raw >> 32) as u32,
        }
    }

    pub fn load(cell: &AtomicU64) -> Self {
        Self::unpack(cell.load(Ordering::SeqCst))
    }

    pub fn is_null(self) -> bool {
        self.index == NULL
    }
}

pub(super) struct Node<T> {
    /// Written by the allocating enqueuer before the node is published,
    /// taken by the single dequeuer whose CAS moves `head` past the node.
    pub value: UnsafeCell<Option<T>>,
    pub dummy: AtomicBool,
    /// Points to the node enqueued just before this one.
    pub next: AtomicU64,
    /// Points to the node enqueued just after this one. Set without CAS,
    /// so it may lag behind `next`.
    pub prev: AtomicU64,
    free_next: AtomicU32,
}

impl<T> Node<T> {
    fn vacant() -> Self {
        Self {
            value: UnsafeCell::new(None),
            dummy: AtomicBool::new(false),
            next: AtomicU64::new(Tagged::new(NULL, 0).pack()),
            prev: AtomicU64::new(Tagged::new(NULL, 0).pack()),
            free_next: AtomicU32::new(NULL),
        }
    }
}

// SAFETY: `value` is only touched by the thread that owns the node at that
// moment (the allocator before publication, or the dequeuer that unlinked
// it); every other field is atomic.
unsafe impl<T: Send> Sync for Node<T> {}

/// Growable node store that never moves or frees a node while the arena is
/// alive, so stale indices always read valid memory.
pub(super) struct NodeArena<T> {
    segments: Box<[OnceLock<Box<[Node<T>]>>]>,
    next_unused: AtomicU64,
    free_top: AtomicU64,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        let segments = (0..SEGMENT_COUNT).map(|_| OnceLock::new()).collect();
        Self {
            segments,
            next_unused: AtomicU64::new(0),
            free_top: AtomicU64::new(Tagged::new(NULL, 0).pack()),
        }
    }

    pub fn node(&self, index: u32) -> &Node<T> {
        let (segment, offset) = locate(index);
        let nodes = self.segments[segment].get_or_init(|| {
            (0..segment_len(segment)).map(|_| Node::vacant()).collect()
        });
        &nodes[offset]
    }

    /// Hands out a node reset to `value`/`dummy` with null links.
    pub fn allocate(&self, value: Option<T>, dummy: bool) -> Result<u32, QueueError> {
        let index = match self.pop_free() {
            Some(index) => index,
            None => {
                let index = self.next_unused.fetch_add(1, Ordering::Relaxed);
                if index >= CAPACITY {
                    return Err(QueueError::CapacityExhausted);
                }
                index as u32
            }
        };

        let node = self.node(index);
        // SAFETY: the index came off the free list or the bump counter, so
        // no other thread owns this node until it is published.
        unsafe {
            *node.value.get() = value;
        }
        node.dummy.store(dummy, Ordering::SeqCst);
        node.next.store(Tagged::new(NULL, 0).pack(), Ordering::SeqCst);
        node.prev.store(Tagged::new(NULL, 0).pack(), Ordering::SeqCst);
        Ok(index)
    }

    /// Returns a node to the free list. The caller must own it: its value
    /// has been taken and no queue pointer can reach it any more.
    pub fn release(&self, index: u32) {
        let node = self.node(index);
        loop {
            let top = Tagged::load(&self.free_top);
            node.free_next.store(top.index, Ordering::SeqCst);
            let new_top = Tagged::new(index, top.tag.wrapping_add(1));
            if self
                .free_top
                .compare_exchange(top.pack(), new_top.pack(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return;
            }
        }
    }

    fn pop_free(&self) -> Option<u32> {
        loop {
            let top = Tagged::load(&self.free_top);
            if top.is_null() {
                return None;
            }
            let next = self.node(top.index).free_next.load(Ordering::SeqCst);
            let new_top = Tagged::new(next, top.tag.wrapping_add(1));
            if self
                .free_top
                .compare_exchange(top.pack(), new_top.pack(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(top.index);
            }
        }
    }

    /// Nodes handed out by the bump counter so far.
    #[cfg(test)]
    pub fn allocated(&self) -> u64 {
        self.next_unused.load(Ordering::Relaxed).min(CAPACITY)
    }
}

fn segment_len(segment: usize) -> usize {
    1usize << (segment as u32 + FIRST_SEGMENT_BITS)
}

fn locate(index: u32) -> (usize, usize) {
    let pos = index as u64 + (1u64 << FIRST_SEGMENT_BITS);
    let bit = u64::BITS - 1 - pos.leading_zeros();
    let segment = (bit - FIRST_SEGMENT_BITS) as usize;
    let offset = (pos - (1u64 << bit)) as usize;
    (segment, offset)
}
