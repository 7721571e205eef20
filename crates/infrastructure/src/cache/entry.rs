use crate::queue::{BlockingHandle, ConcurrentQueueBlockingImpl, ConcurrentQueueImpl, QueueHandle};

/// LRU list of idle connections awaiting reclamation.
///
/// Implemented by the unsynchronized queue (owned by a cache that locks
/// around it) and by a shared reference to the self-locking queue.
pub(crate) trait ReclaimList<C> {
    type Handle;

    fn push(&mut self, conn: C) -> Self::Handle;

    /// `false` when the handle is stale, i.e. the element was already
    /// polled by a reclamation pass or unlinked before.
    fn unlink(&mut self, handle: &Self::Handle) -> bool;
}

impl<C> ReclaimList<C> for ConcurrentQueueImpl<C> {
    type Handle = QueueHandle;

    fn push(&mut self, conn: C) -> QueueHandle {
        self.offer(conn)
    }

    fn unlink(&mut self, handle: &QueueHandle) -> bool {
        self.remove(*handle)
    }
}

impl<C> ReclaimList<C> for &ConcurrentQueueBlockingImpl<C> {
    type Handle = BlockingHandle<C>;

    fn push(&mut self, conn: C) -> BlockingHandle<C> {
        self.offer(conn)
    }

    fn unlink(&mut self, handle: &BlockingHandle<C>) -> bool {
        handle.remove()
    }
}

/// Outcome of a counter decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Both counters reached zero; the connection is now reclaimable.
    BecameIdle,
    StillBusy,
    /// The counter was already zero. Nothing changed.
    Unmatched,
}

/// Usage counters of one cached connection.
///
/// Idle means `busy == 0 && expected_responses == 0`. An idle connection
/// carries exactly one reclaim handle, a busy one none.
#[derive(Debug)]
pub(crate) struct ConnectionState<H> {
    busy: usize,
    expected_responses: usize,
    reclaim_handle: Option<H>,
}

impl<H> ConnectionState<H> {
    /// State of a connection handed out (or seen) for the first time.
    pub fn new_busy() -> Self {
        Self {
            busy: 1,
            expected_responses: 0,
            reclaim_handle: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.busy == 0 && self.expected_responses == 0
    }

    /// Adds one user. Returns whether the connection was idle before.
    pub fn acquire<C, R>(&mut self, reclaim: &mut R) -> bool
    where
        R: ReclaimList<C, Handle = H>,
    {
        let was_idle = self.is_idle();
        self.busy += 1;
        self.detach(reclaim);
        was_idle
    }

    pub fn release<C: Clone, R>(&mut self, conn: &C, responses: usize, reclaim: &mut R) -> Transition
    where
        R: ReclaimList<C, Handle = H>,
    {
        if self.busy == 0 {
            return Transition::Unmatched;
        }
        self.busy -= 1;
        self.expected_responses += responses;
        self.settle(conn, reclaim)
    }

    pub fn response_done<C: Clone, R>(&mut self, conn: &C, reclaim: &mut R) -> Transition
    where
        R: ReclaimList<C, Handle = H>,
    {
        if self.expected_responses == 0 {
            return Transition::Unmatched;
        }
        self.expected_responses -= 1;
        self.settle(conn, reclaim)
    }

    /// Takes the connection off the reclaim list, if it is on it.
    pub fn detach<C, R>(&mut self, reclaim: &mut R)
    where
        R: ReclaimList<C, Handle = H>,
    {
        if let Some(handle) = self.reclaim_handle.take() {
            reclaim.unlink(&handle);
        }
    }

    fn settle<C: Clone, R>(&mut self, conn: &C, reclaim: &mut R) -> Transition
    where
        R: ReclaimList<C, Handle = H>,
    {
        if self.is_idle() {
            self.reclaim_handle = Some(reclaim.push(conn.clone()));
            Transition::BecameIdle
        } else {
            Transition::StillBusy
        }
    }
}
