use super::entry::{ConnectionState, ReclaimList, Transition};
use crate::queue::{ConcurrentQueueImpl, QueueHandle};
use ferrous_orb_domain::Connection;
use rustc_hash::FxHashMap;
use std::time::Duration;

struct GroupEntry<H> {
    state: ConnectionState<H>,
    /// Position in the group's idle or busy list, whichever matches `state`.
    position: QueueHandle,
}

/// Connections of one ContactInfo inside an outbound cache.
///
/// `idle` is LRU (oldest first, used for idle hand-out), `busy` is a
/// round-robin rotation. Every connection is in exactly one of the two.
pub(crate) struct ConnectionGroup<C, H> {
    entries: FxHashMap<C, GroupEntry<H>>,
    idle: ConcurrentQueueImpl<C>,
    busy: ConcurrentQueueImpl<C>,
    /// Creations for this ContactInfo that are running right now.
    pub pending: usize,
    /// Set once the group has been dropped from its cache's map. A caller
    /// that locked a retired group must look it up again.
    pub retired: bool,
}

impl<C: Connection, H> ConnectionGroup<C, H> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: FxHashMap::default(),
            idle: ConcurrentQueueImpl::new(ttl),
            busy: ConcurrentQueueImpl::new(ttl),
            pending: 0,
            retired: false,
        }
    }

    /// Established connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No connections and no creation in flight.
    pub fn is_unused(&self) -> bool {
        self.entries.is_empty() && self.pending == 0
    }

    /// Idle then busy connections, each oldest first.
    pub fn snapshot(&self) -> (Vec<C>, Vec<C>) {
        (
            self.idle.iter().cloned().collect(),
            self.busy.iter().cloned().collect(),
        )
    }

    /// Hands out the least recently used idle connection.
    pub fn take_idle<R>(&mut self, reclaim: &mut R) -> Option<C>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let conn = self.idle.poll()?.into_value();
        let entry = self.entries.get_mut(&conn)?;
        entry.state.acquire(reclaim);
        entry.position = self.busy.offer(conn.clone());
        Some(conn)
    }

    /// Hands out the next busy connection and moves it to the back of the
    /// rotation.
    pub fn take_busy<R>(&mut self, reclaim: &mut R) -> Option<C>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let conn = self.busy.poll()?.into_value();
        let entry = self.entries.get_mut(&conn)?;
        entry.state.acquire(reclaim);
        entry.position = self.busy.offer(conn.clone());
        Some(conn)
    }

    /// Hands out a specific connection. Returns whether it was idle, or
    /// `None` when the group no longer holds it.
    pub fn claim<R>(&mut self, conn: &C, reclaim: &mut R) -> Option<bool>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let entry = self.entries.get_mut(conn)?;
        let was_idle = entry.state.acquire(reclaim);
        if was_idle {
            self.idle.remove(entry.position);
        } else {
            self.busy.remove(entry.position);
        }
        entry.position = self.busy.offer(conn.clone());
        Some(was_idle)
    }

    /// Adds a freshly created connection, already busy with one user.
    pub fn insert_busy(&mut self, conn: C) {
        let position = self.busy.offer(conn.clone());
        self.entries.insert(
            conn,
            GroupEntry {
                state: ConnectionState::new_busy(),
                position,
            },
        );
    }

    pub fn release<R>(&mut self, conn: &C, responses: usize, reclaim: &mut R) -> Option<Transition>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let entry = self.entries.get_mut(conn)?;
        let transition = entry.state.release(conn, responses, reclaim);
        if transition == Transition::BecameIdle {
            self.busy.remove(entry.position);
            entry.position = self.idle.offer(conn.clone());
        }
        Some(transition)
    }

    pub fn response_received<R>(&mut self, conn: &C, reclaim: &mut R) -> Option<Transition>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let entry = self.entries.get_mut(conn)?;
        let transition = entry.state.response_done(conn, reclaim);
        if transition == Transition::BecameIdle {
            self.busy.remove(entry.position);
            entry.position = self.idle.offer(conn.clone());
        }
        Some(transition)
    }

    /// Drops `conn` whatever its state. Returns whether it was idle.
    pub fn remove<R>(&mut self, conn: &C, reclaim: &mut R) -> Option<bool>
    where
        R: ReclaimList<C, Handle = H>,
    {
        let mut entry = self.entries.remove(conn)?;
        let was_idle = entry.state.is_idle();
        if was_idle {
            self.idle.remove(entry.position);
        } else {
            self.busy.remove(entry.position);
        }
        entry.state.detach(reclaim);
        Some(was_idle)
    }

    /// Drops `conn` only if it is still idle.
    pub fn evict_if_idle<R>(&mut self, conn: &C, reclaim: &mut R) -> bool
    where
        R: ReclaimList<C, Handle = H>,
    {
        let idle = self.entries.get(conn).is_some_and(|e| e.state.is_idle());
        idle && self.remove(conn, reclaim).is_some()
    }

    #[cfg(test)]
    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Conn(u32);

    impl Connection for Conn {
        fn close(&self) -> std::io::Result<()> {
            Ok(())
        }
    }

    type Group = ConnectionGroup<Conn, QueueHandle>;

    fn setup() -> (Group, ConcurrentQueueImpl<Conn>) {
        let ttl = Duration::from_secs(60);
        (ConnectionGroup::new(ttl), ConcurrentQueueImpl::new(ttl))
    }

    #[test]
    fn test_take_idle_prefers_least_recently_used() {
        let (mut group, mut reclaim) = setup();
        for id in 1..=3 {
            group.insert_busy(Conn(id));
        }
        group.release(&Conn(2), 0, &mut reclaim);
        group.release(&Conn(1), 0, &mut reclaim);

        assert_eq!(group.take_idle(&mut reclaim), Some(Conn(2)));
        assert_eq!(group.take_idle(&mut reclaim), Some(Conn(1)));
        assert_eq!(group.take_idle(&mut reclaim), None);
        assert!(reclaim.is_empty());
    }

    #[test]
    fn test_take_busy_rotates() {
        let (mut group, mut reclaim) = setup();
        group.insert_busy(Conn(1));
        group.insert_busy(Conn(2));

        let picks: Vec<_> = (0..4)
            .filter_map(|_| group.take_busy(&mut reclaim))
            .collect();
        assert_eq!(picks, vec![Conn(1), Conn(2), Conn(1), Conn(2)]);
    }

    #[test]
    fn test_claim_moves_idle_connection_to_busy() {
        let (mut group, mut reclaim) = setup();
        group.insert_busy(Conn(1));
        group.release(&Conn(1), 0, &mut reclaim);

        assert_eq!(group.claim(&Conn(1), &mut reclaim), Some(true));
        assert_eq!(group.idle_len(), 0);
        assert!(reclaim.is_empty());
        assert_eq!(group.claim(&Conn(1), &mut reclaim), Some(false));
        assert_eq!(group.claim(&Conn(9), &mut reclaim), None);
    }

    #[test]
    fn test_evict_if_idle_skips_busy_connections() {
        let (mut group, mut reclaim) = setup();
        group.insert_busy(Conn(1));

        assert!(!group.evict_if_idle(&Conn(1), &mut reclaim));
        group.release(&Conn(1), 0, &mut reclaim);
        assert!(group.evict_if_idle(&Conn(1), &mut reclaim));
        assert!(group.is_unused());
        assert!(reclaim.is_empty());
    }

    #[test]
    fn test_pending_creation_keeps_group_in_use() {
        let (mut group, _) = setup();
        group.pending = 1;
        assert!(!group.is_unused());
    }

    #[test]
    fn test_remove_reports_previous_state() {
        let (mut group, mut reclaim) = setup();
        group.insert_busy(Conn(1));
        group.insert_busy(Conn(2));
        group.release(&Conn(2), 0, &mut reclaim);

        assert_eq!(group.remove(&Conn(1), &mut reclaim), Some(false));
        assert_eq!(group.remove(&Conn(2), &mut reclaim), Some(true));
        assert_eq!(group.remove(&Conn(2), &mut reclaim), None);
        assert_eq!(group.len(), 0);
        assert!(reclaim.is_empty());
    }
}
