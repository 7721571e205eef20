use crate::cache::entry::{ConnectionState, Transition};
use crate::cache::metrics::{Accounting, ConnectionCacheMetrics};
use crate::cache::{close_all, CacheSettings, Victims};
use crate::queue::{BlockingHandle, ConcurrentQueueBlockingImpl};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ferrous_orb_application::ports::{CacheStatsSnapshot, ConnectionCache, InboundConnectionCache};
use ferrous_orb_domain::Connection;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Inbound cache on a sharded map; each connection is updated under its
/// shard lock only.
pub struct NonBlockingInboundConnectionCache<C: Connection> {
    settings: CacheSettings,
    connections: DashMap<C, ConnectionState<BlockingHandle<C>>, FxBuildHasher>,
    reclaimable: ConcurrentQueueBlockingImpl<C>,
    total: AtomicUsize,
    idle: AtomicUsize,
    metrics: ConnectionCacheMetrics,
}

impl<C: Connection> NonBlockingInboundConnectionCache<C> {
    pub fn new(settings: CacheSettings) -> Self {
        info!(
            cache = %settings.cache_type,
            high_water_mark = settings.high_water_mark,
            number_to_reclaim = settings.number_to_reclaim,
            "Non-blocking inbound connection cache created"
        );
        Self {
            connections: DashMap::with_hasher(FxBuildHasher),
            reclaimable: ConcurrentQueueBlockingImpl::new(settings.ttl),
            total: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            settings,
            metrics: ConnectionCacheMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ConnectionCacheMetrics {
        &self.metrics
    }

    /// Applies a counter decrement under the connection's shard lock.
    fn update(
        &self,
        conn: &C,
        apply: impl FnOnce(
            &mut ConnectionState<BlockingHandle<C>>,
            &mut &ConcurrentQueueBlockingImpl<C>,
        ) -> Transition,
    ) {
        let transition = self.connections.get_mut(conn).map(|mut state| {
            let mut reclaim = &self.reclaimable;
            let transition = apply(state.value_mut(), &mut reclaim);
            if transition == Transition::BecameIdle {
                self.idle.fetch_add(1, Ordering::AcqRel);
            }
            transition
        });
        match transition {
            Some(Transition::BecameIdle) => {
                if self.total.load(Ordering::Acquire) > self.settings.high_water_mark {
                    self.reclaim();
                }
            }
            Some(Transition::StillBusy) => {}
            Some(Transition::Unmatched) => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Counter underflow ignored");
            }
            None => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Unknown connection ignored");
            }
        }
    }

    fn reclaim(&self) {
        let mut victims: Victims<C> = Victims::new();
        while victims.len() < self.settings.number_to_reclaim {
            let Some(entry) = self.reclaimable.poll() else {
                break;
            };
            let conn = entry.into_value();
            let removed = match self.connections.entry(conn.clone()) {
                Entry::Occupied(occupied) if occupied.get().is_idle() => {
                    self.total.fetch_sub(1, Ordering::AcqRel);
                    self.idle.fetch_sub(1, Ordering::AcqRel);
                    let mut state = occupied.remove();
                    let mut reclaim = &self.reclaimable;
                    state.detach(&mut reclaim);
                    true
                }
                _ => false,
            };
            if removed {
                victims.push(conn);
            }
        }
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }
}

impl<C: Connection> ConnectionCache<C> for NonBlockingInboundConnectionCache<C> {
    fn cache_type(&self) -> &str {
        &self.settings.cache_type
    }

    fn number_of_connections(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    fn number_of_idle_connections(&self) -> usize {
        self.idle.load(Ordering::Acquire)
    }

    fn number_of_busy_connections(&self) -> usize {
        self.number_of_connections()
            .saturating_sub(self.number_of_idle_connections())
    }

    fn number_of_reclaimable_connections(&self) -> usize {
        self.reclaimable.len()
    }

    fn high_water_mark(&self) -> usize {
        self.settings.high_water_mark
    }

    fn number_to_reclaim(&self) -> usize {
        self.settings.number_to_reclaim
    }

    fn close(&self, conn: &C) {
        // Counters move while the shard is locked, as in `request_received`.
        let Entry::Occupied(occupied) = self.connections.entry(conn.clone()) else {
            debug!(cache = %self.settings.cache_type, connection = ?conn, "Close of uncached connection ignored");
            return;
        };
        self.total.fetch_sub(1, Ordering::AcqRel);
        if occupied.get().is_idle() {
            self.idle.fetch_sub(1, Ordering::AcqRel);
        }
        let mut state = occupied.remove();
        let mut reclaim = &self.reclaimable;
        state.detach(&mut reclaim);
        close_all(&self.settings.cache_type, [conn.clone()], &self.metrics, false);
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.metrics.snapshot(Accounting {
            cache_type: &self.settings.cache_type,
            total: self.number_of_connections(),
            idle: self.number_of_idle_connections(),
            reclaimable: self.number_of_reclaimable_connections(),
            high_water_mark: self.settings.high_water_mark,
            number_to_reclaim: self.settings.number_to_reclaim,
        })
    }
}

impl<C: Connection> InboundConnectionCache<C> for NonBlockingInboundConnectionCache<C> {
    fn request_received(&self, conn: &C) {
        let mut reclaim = &self.reclaimable;
        let total = match self.connections.entry(conn.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get_mut().acquire(&mut reclaim) {
                    self.idle.fetch_sub(1, Ordering::AcqRel);
                }
                return;
            }
            Entry::Vacant(vacant) => {
                // A concurrent close must not decrement `total` before this
                // registration is counted, so the shard stays locked.
                let registered = vacant.insert(ConnectionState::new_busy());
                let total = self.total.fetch_add(1, Ordering::AcqRel) + 1;
                drop(registered);
                total
            }
        };

        self.metrics.created.fetch_add(1, Ordering::Relaxed);
        debug!(cache = %self.settings.cache_type, connection = ?conn, total, "Connection registered");
        if total > self.settings.high_water_mark {
            self.reclaim();
        }
    }

    fn request_processed(&self, conn: &C, num_responses_expected: usize) {
        self.update(conn, |state, reclaim| {
            state.release(conn, num_responses_expected, reclaim)
        });
    }

    fn response_sent(&self, conn: &C) {
        self.update(conn, |state, reclaim| state.response_done(conn, reclaim));
    }
}
