use crate::cache::entry::{ConnectionState, Transition};
use crate::cache::metrics::{Accounting, ConnectionCacheMetrics};
use crate::cache::{close_all, CacheSettings, Victims};
use crate::queue::{ConcurrentQueueImpl, QueueHandle};
use ferrous_orb_application::ports::{CacheStatsSnapshot, ConnectionCache, InboundConnectionCache};
use ferrous_orb_domain::Connection;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

struct InboundState<C> {
    connections: FxHashMap<C, ConnectionState<QueueHandle>>,
    reclaimable: ConcurrentQueueImpl<C>,
    idle: usize,
}

impl<C: Connection> InboundState<C> {
    fn reclaim(&mut self, count: usize) -> Victims<C> {
        let mut victims = Victims::new();
        while victims.len() < count {
            let Some(entry) = self.reclaimable.poll() else {
                break;
            };
            let conn = entry.into_value();
            if !self.connections.get(&conn).is_some_and(|s| s.is_idle()) {
                continue;
            }
            if let Some(mut state) = self.connections.remove(&conn) {
                state.detach(&mut self.reclaimable);
                self.idle -= 1;
                victims.push(conn);
            }
        }
        victims
    }
}

/// Inbound cache with every operation serialized on one mutex.
pub struct BlockingInboundConnectionCache<C: Connection> {
    settings: CacheSettings,
    state: Mutex<InboundState<C>>,
    metrics: ConnectionCacheMetrics,
}

impl<C: Connection> BlockingInboundConnectionCache<C> {
    pub fn new(settings: CacheSettings) -> Self {
        info!(
            cache = %settings.cache_type,
            high_water_mark = settings.high_water_mark,
            number_to_reclaim = settings.number_to_reclaim,
            "Blocking inbound connection cache created"
        );
        Self {
            state: Mutex::new(InboundState {
                connections: FxHashMap::default(),
                reclaimable: ConcurrentQueueImpl::new(settings.ttl),
                idle: 0,
            }),
            settings,
            metrics: ConnectionCacheMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ConnectionCacheMetrics {
        &self.metrics
    }

    fn settle(
        &self,
        conn: &C,
        state: &mut InboundState<C>,
        transition: Option<Transition>,
    ) -> Victims<C> {
        match transition {
            Some(Transition::BecameIdle) => {
                state.idle += 1;
                if state.connections.len() > self.settings.high_water_mark {
                    return state.reclaim(self.settings.number_to_reclaim);
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
        Victims::new()
    }
}

impl<C: Connection> ConnectionCache<C> for BlockingInboundConnectionCache<C> {
    fn cache_type(&self) -> &str {
        &self.settings.cache_type
    }

    fn number_of_connections(&self) -> usize {
        self.state.lock().connections.len()
    }

    fn number_of_idle_connections(&self) -> usize {
        self.state.lock().idle
    }

    fn number_of_busy_connections(&self) -> usize {
        let state = self.state.lock();
        state.connections.len() - state.idle
    }

    fn number_of_reclaimable_connections(&self) -> usize {
        self.state.lock().reclaimable.len()
    }

    fn high_water_mark(&self) -> usize {
        self.settings.high_water_mark
    }

    fn number_to_reclaim(&self) -> usize {
        self.settings.number_to_reclaim
    }

    fn close(&self, conn: &C) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(mut removed) = state.connections.remove(conn) else {
            drop(guard);
            debug!(cache = %self.settings.cache_type, connection = ?conn, "Close of uncached connection ignored");
            return;
        };
        if removed.is_idle() {
            state.idle -= 1;
        }
        removed.detach(&mut state.reclaimable);
        drop(guard);
        close_all(&self.settings.cache_type, [conn.clone()], &self.metrics, false);
    }

    fn stats(&self) -> CacheStatsSnapshot {
        let state = self.state.lock();
        self.metrics.snapshot(Accounting {
            cache_type: &self.settings.cache_type,
            total: state.connections.len(),
            idle: state.idle,
            reclaimable: state.reclaimable.len(),
            high_water_mark: self.settings.high_water_mark,
            number_to_reclaim: self.settings.number_to_reclaim,
        })
    }
}

impl<C: Connection> InboundConnectionCache<C> for BlockingInboundConnectionCache<C> {
    fn request_received(&self, conn: &C) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let victims = match state.connections.get_mut(conn) {
            Some(existing) => {
                if existing.acquire(&mut state.reclaimable) {
                    state.idle -= 1;
                }
                Victims::new()
            }
            None => {
                state.connections.insert(conn.clone(), ConnectionState::new_busy());
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                debug!(
                    cache = %self.settings.cache_type,
                    connection = ?conn,
                    total = state.connections.len(),
                    "Connection registered"
                );
                if state.connections.len() > self.settings.high_water_mark {
                    state.reclaim(self.settings.number_to_reclaim)
                } else {
                    Victims::new()
                }
            }
        };
        drop(guard);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }

    fn request_processed(&self, conn: &C, num_responses_expected: usize) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let transition = state
            .connections
            .get_mut(conn)
            .map(|s| s.release(conn, num_responses_expected, &mut state.reclaimable));
        let victims = self.settle(conn, state, transition);
        drop(guard);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }

    fn response_sent(&self, conn: &C) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let transition = state
            .connections
            .get_mut(conn)
            .map(|s| s.response_done(conn, &mut state.reclaimable));
        let victims = self.settle(conn, state, transition);
        drop(guard);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }
}
