use crate::cache::entry::Transition;
use crate::cache::group::ConnectionGroup;
use crate::cache::metrics::{Accounting, ConnectionCacheMetrics};
use crate::cache::{close_all, CacheSettings, Victims};
use crate::queue::{ConcurrentQueueImpl, QueueHandle};
use ferrous_orb_application::ports::{
    CacheStatsSnapshot, ConnectionCache, ConnectionFinder, OutboundConnectionCache,
};
use ferrous_orb_domain::{ConnectionError, ContactInfo};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

type Conn<CI> = <CI as ContactInfo>::Connection;

struct OutboundState<CI: ContactInfo> {
    groups: FxHashMap<CI, ConnectionGroup<Conn<CI>, QueueHandle>>,
    owners: FxHashMap<Conn<CI>, CI>,
    reclaimable: ConcurrentQueueImpl<Conn<CI>>,
    total: usize,
    idle: usize,
}

impl<CI: ContactInfo> OutboundState<CI> {
    fn take_idle(&mut self, contact_info: &CI) -> Option<Conn<CI>> {
        let group = self.groups.get_mut(contact_info)?;
        let conn = group.take_idle(&mut self.reclaimable)?;
        self.idle -= 1;
        Some(conn)
    }

    fn take_busy(&mut self, contact_info: &CI) -> Option<Conn<CI>> {
        self.groups
            .get_mut(contact_info)?
            .take_busy(&mut self.reclaimable)
    }

    fn can_create(&self, settings: &CacheSettings, contact_info: &CI) -> bool {
        let established = self.groups.get(contact_info).map_or(0, |g| g.len());
        settings.creation_allowed(established, 0, self.total)
    }

    fn insert(&mut self, contact_info: &CI, conn: Conn<CI>, settings: &CacheSettings) {
        self.groups
            .entry(contact_info.clone())
            .or_insert_with(|| ConnectionGroup::new(settings.ttl))
            .insert_busy(conn.clone());
        self.owners.insert(conn, contact_info.clone());
        self.total += 1;
    }

    /// Drops up to `count` idle connections, least recently used first.
    fn reclaim(&mut self, count: usize) -> Victims<Conn<CI>> {
        let mut victims = Victims::new();
        while victims.len() < count {
            let Some(entry) = self.reclaimable.poll() else {
                break;
            };
            let conn = entry.into_value();
            let Some(contact_info) = self.owners.get(&conn).cloned() else {
                continue;
            };
            let Some(group) = self.groups.get_mut(&contact_info) else {
                continue;
            };
            if !group.evict_if_idle(&conn, &mut self.reclaimable) {
                continue;
            }
            if group.is_unused() {
                self.groups.remove(&contact_info);
            }
            self.owners.remove(&conn);
            self.total -= 1;
            self.idle -= 1;
            victims.push(conn);
        }
        victims
    }

    fn remove(&mut self, conn: &Conn<CI>) -> bool {
        let Some(contact_info) = self.owners.remove(conn) else {
            return false;
        };
        let Some(group) = self.groups.get_mut(&contact_info) else {
            return false;
        };
        let Some(was_idle) = group.remove(conn, &mut self.reclaimable) else {
            return false;
        };
        if group.is_unused() {
            self.groups.remove(&contact_info);
        }
        self.total -= 1;
        if was_idle {
            self.idle -= 1;
        }
        true
    }
}

/// Outbound cache with every operation serialized on one mutex.
///
/// Connection creation also happens under the mutex, so a slow connect
/// stalls all other users of the cache.
pub struct BlockingOutboundConnectionCache<CI: ContactInfo> {
    settings: CacheSettings,
    state: Mutex<OutboundState<CI>>,
    metrics: ConnectionCacheMetrics,
}

impl<CI: ContactInfo> BlockingOutboundConnectionCache<CI> {
    pub fn new(settings: CacheSettings) -> Self {
        info!(
            cache = %settings.cache_type,
            high_water_mark = settings.high_water_mark,
            number_to_reclaim = settings.number_to_reclaim,
            max_parallel_connections = settings.max_parallel_connections,
            "Blocking outbound connection cache created"
        );
        Self {
            state: Mutex::new(OutboundState {
                groups: FxHashMap::default(),
                owners: FxHashMap::default(),
                reclaimable: ConcurrentQueueImpl::new(settings.ttl),
                total: 0,
                idle: 0,
            }),
            settings,
            metrics: ConnectionCacheMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ConnectionCacheMetrics {
        &self.metrics
    }

    fn find_with(&self, contact_info: &CI, finder: &dyn ConnectionFinder<CI>) -> Option<Conn<CI>> {
        let (idle, busy) = self
            .state
            .lock()
            .groups
            .get(contact_info)
            .map(|g| g.snapshot())
            .unwrap_or_default();

        let chosen = finder.find(contact_info, &idle, &busy)?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let claimed = state
            .groups
            .get_mut(contact_info)
            .and_then(|g| g.claim(&chosen, &mut state.reclaimable));
        match claimed {
            Some(was_idle) => {
                if was_idle {
                    state.idle -= 1;
                }
                self.metrics.finder_hits.fetch_add(1, Ordering::Relaxed);
                Some(chosen)
            }
            None => {
                debug!(
                    cache = %self.settings.cache_type,
                    connection = ?chosen,
                    "Finder picked a connection that is no longer cached"
                );
                None
            }
        }
    }

    fn after_idle(&self, state: &mut OutboundState<CI>) -> Victims<Conn<CI>> {
        state.idle += 1;
        if state.total > self.settings.high_water_mark {
            state.reclaim(self.settings.number_to_reclaim)
        } else {
            Victims::new()
        }
    }
}

impl<CI: ContactInfo> ConnectionCache<Conn<CI>> for BlockingOutboundConnectionCache<CI> {
    fn cache_type(&self) -> &str {
        &self.settings.cache_type
    }

    fn number_of_connections(&self) -> usize {
        self.state.lock().total
    }

    fn number_of_idle_connections(&self) -> usize {
        self.state.lock().idle
    }

    fn number_of_busy_connections(&self) -> usize {
        let state = self.state.lock();
        state.total - state.idle
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

    fn close(&self, conn: &Conn<CI>) {
        let removed = self.state.lock().remove(conn);
        if removed {
            close_all(&self.settings.cache_type, [conn.clone()], &self.metrics, false);
        } else {
            debug!(cache = %self.settings.cache_type, connection = ?conn, "Close of uncached connection ignored");
        }
    }

    fn stats(&self) -> CacheStatsSnapshot {
        let state = self.state.lock();
        self.metrics.snapshot(Accounting {
            cache_type: &self.settings.cache_type,
            total: state.total,
            idle: state.idle,
            reclaimable: state.reclaimable.len(),
            high_water_mark: self.settings.high_water_mark,
            number_to_reclaim: self.settings.number_to_reclaim,
        })
    }
}

impl<CI: ContactInfo> OutboundConnectionCache<CI> for BlockingOutboundConnectionCache<CI> {
    fn max_parallel_connections(&self) -> usize {
        self.settings.max_parallel_connections
    }

    fn get(
        &self,
        contact_info: &CI,
        finder: Option<&dyn ConnectionFinder<CI>>,
    ) -> Result<Conn<CI>, ConnectionError> {
        if let Some(conn) = finder.and_then(|f| self.find_with(contact_info, f)) {
            return Ok(conn);
        }

        let mut state = self.state.lock();
        if let Some(conn) = state.take_idle(contact_info) {
            self.metrics.idle_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(conn);
        }
        if !state.can_create(&self.settings, contact_info) {
            if let Some(conn) = state.take_busy(contact_info) {
                self.metrics.busy_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(conn);
            }
        }

        let conn = match contact_info.create_connection() {
            Ok(conn) => conn,
            Err(e) => {
                self.metrics.creation_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    cache = %self.settings.cache_type,
                    contact_info = ?contact_info,
                    error = %e,
                    "Connection creation failed"
                );
                return Err(ConnectionError::creation_failed(contact_info, e));
            }
        };
        state.insert(contact_info, conn.clone(), &self.settings);
        self.metrics.created.fetch_add(1, Ordering::Relaxed);
        debug!(
            cache = %self.settings.cache_type,
            contact_info = ?contact_info,
            connection = ?conn,
            total = state.total,
            "Connection created"
        );

        let victims = if state.total > self.settings.high_water_mark {
            state.reclaim(self.settings.number_to_reclaim)
        } else {
            Victims::new()
        };
        drop(state);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
        Ok(conn)
    }

    fn release(&self, conn: &Conn<CI>, num_responses_expected: usize) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let transition = state.owners.get(conn).and_then(|ci| {
            state
                .groups
                .get_mut(ci)?
                .release(conn, num_responses_expected, &mut state.reclaimable)
        });
        let victims = match transition {
            Some(Transition::BecameIdle) => self.after_idle(state),
            Some(Transition::StillBusy) => Victims::new(),
            Some(Transition::Unmatched) => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Release of a connection that is not busy");
                Victims::new()
            }
            None => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Release of unknown connection");
                Victims::new()
            }
        };
        drop(guard);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }

    fn response_received(&self, conn: &Conn<CI>) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let transition = state.owners.get(conn).and_then(|ci| {
            state
                .groups
                .get_mut(ci)?
                .response_received(conn, &mut state.reclaimable)
        });
        let victims = match transition {
            Some(Transition::BecameIdle) => self.after_idle(state),
            Some(Transition::StillBusy) => Victims::new(),
            Some(Transition::Unmatched) => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Response on a connection that expects none");
                Victims::new()
            }
            None => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Response on unknown connection");
                Victims::new()
            }
        };
        drop(guard);
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }

    fn can_create_new_connection(&self, contact_info: &CI) -> bool {
        self.state.lock().can_create(&self.settings, contact_info)
    }
}
