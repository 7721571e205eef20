use crate::cache::entry::Transition;
use crate::cache::group::ConnectionGroup;
use crate::cache::metrics::{Accounting, ConnectionCacheMetrics};
use crate::cache::{close_all, CacheSettings, Victims};
use crate::queue::{BlockingHandle, ConcurrentQueueBlockingImpl};
use dashmap::DashMap;
use ferrous_orb_application::ports::{
    CacheStatsSnapshot, ConnectionCache, ConnectionFinder, OutboundConnectionCache,
};
use ferrous_orb_domain::{ConnectionError, ContactInfo};
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Conn<CI> = <CI as ContactInfo>::Connection;
type Group<C> = ConnectionGroup<C, BlockingHandle<C>>;
type GroupCell<C> = Arc<Mutex<Group<C>>>;

/// Outbound cache that never holds a lock while a connection is opened.
///
/// Each ContactInfo has its own group lock; the cache-wide counters are
/// atomics. Lock order is group lock, then the reclaim queue lock. A map
/// guard is never held while a group lock is taken.
pub struct NonBlockingOutboundConnectionCache<CI: ContactInfo> {
    settings: CacheSettings,
    groups: DashMap<CI, GroupCell<Conn<CI>>, FxBuildHasher>,
    owners: DashMap<Conn<CI>, CI, FxBuildHasher>,
    reclaimable: ConcurrentQueueBlockingImpl<Conn<CI>>,
    total: AtomicUsize,
    idle: AtomicUsize,
    /// Creations running right now, over all ContactInfos.
    pending: AtomicUsize,
    metrics: ConnectionCacheMetrics,
}

impl<CI: ContactInfo> NonBlockingOutboundConnectionCache<CI> {
    pub fn new(settings: CacheSettings) -> Self {
        info!(
            cache = %settings.cache_type,
            high_water_mark = settings.high_water_mark,
            number_to_reclaim = settings.number_to_reclaim,
            max_parallel_connections = settings.max_parallel_connections,
            "Non-blocking outbound connection cache created"
        );
        Self {
            groups: DashMap::with_hasher(FxBuildHasher),
            owners: DashMap::with_hasher(FxBuildHasher),
            reclaimable: ConcurrentQueueBlockingImpl::new(settings.ttl),
            total: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            settings,
            metrics: ConnectionCacheMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ConnectionCacheMetrics {
        &self.metrics
    }

    fn group_for(&self, contact_info: &CI) -> GroupCell<Conn<CI>> {
        if let Some(cell) = self.existing_group(contact_info) {
            return cell;
        }
        let ttl = self.settings.ttl;
        Arc::clone(
            self.groups
                .entry(contact_info.clone())
                .or_insert_with(|| Arc::new(Mutex::new(ConnectionGroup::new(ttl))))
                .value(),
        )
    }

    fn existing_group(&self, contact_info: &CI) -> Option<GroupCell<Conn<CI>>> {
        self.groups.get(contact_info).map(|g| Arc::clone(g.value()))
    }

    fn group_of(&self, conn: &Conn<CI>) -> Option<GroupCell<Conn<CI>>> {
        let contact_info = self.owners.get(conn).map(|e| e.value().clone())?;
        self.existing_group(&contact_info)
    }

    /// Drops an empty group from the map. Must be called with the group
    /// locked.
    fn retire_if_unused(
        &self,
        contact_info: &CI,
        cell: &GroupCell<Conn<CI>>,
        group: &mut Group<Conn<CI>>,
    ) {
        if group.is_unused() && !group.retired {
            group.retired = true;
            self.groups
                .remove_if(contact_info, |_, current| Arc::ptr_eq(current, cell));
        }
    }

    fn creation_allowed(&self, group: &Group<Conn<CI>>) -> bool {
        let total = self.total.load(Ordering::Acquire) + self.pending.load(Ordering::Acquire);
        self.settings
            .creation_allowed(group.len(), group.pending, total)
    }

    fn find_with(&self, contact_info: &CI, finder: &dyn ConnectionFinder<CI>) -> Option<Conn<CI>> {
        let cell = self.existing_group(contact_info);
        let (idle, busy) = cell
            .as_ref()
            .map(|cell| cell.lock().snapshot())
            .unwrap_or_default();

        let chosen = finder.find(contact_info, &idle, &busy)?;

        let claimed = cell.and_then(|cell| {
            let mut group = cell.lock();
            if group.retired {
                return None;
            }
            let mut reclaim = &self.reclaimable;
            group.claim(&chosen, &mut reclaim)
        });
        match claimed {
            Some(was_idle) => {
                if was_idle {
                    self.idle.fetch_sub(1, Ordering::AcqRel);
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

    /// Opens a connection with no lock held. The creation counts as pending
    /// in both the group and the cache until it settles.
    fn create(
        &self,
        contact_info: &CI,
        cell: &GroupCell<Conn<CI>>,
    ) -> Result<Conn<CI>, ConnectionError> {
        let created = contact_info.create_connection();

        let mut group = cell.lock();
        group.pending -= 1;
        self.pending.fetch_sub(1, Ordering::AcqRel);

        let conn = match created {
            Ok(conn) => conn,
            Err(e) => {
                self.retire_if_unused(contact_info, cell, &mut group);
                drop(group);
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

        group.insert_busy(conn.clone());
        self.owners.insert(conn.clone(), contact_info.clone());
        let total = self.total.fetch_add(1, Ordering::AcqRel) + 1;
        drop(group);

        self.metrics.created.fetch_add(1, Ordering::Relaxed);
        debug!(
            cache = %self.settings.cache_type,
            contact_info = ?contact_info,
            connection = ?conn,
            total,
            "Connection created"
        );
        if total > self.settings.high_water_mark {
            self.reclaim();
        }
        Ok(conn)
    }

    /// Must run under the group lock that produced `transition`, so the
    /// idle count never lags behind a connection that can already be taken.
    fn count_idle(&self, transition: Option<Transition>) {
        if transition == Some(Transition::BecameIdle) {
            self.idle.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn became_idle(&self) {
        if self.total.load(Ordering::Acquire) > self.settings.high_water_mark {
            self.reclaim();
        }
    }

    /// Closes up to `number_to_reclaim` idle connections, least recently
    /// used first. An entry polled from the reclaim queue is re-checked
    /// under its group lock, since it may have been handed out meanwhile.
    fn reclaim(&self) {
        let mut victims: Victims<Conn<CI>> = Victims::new();
        while victims.len() < self.settings.number_to_reclaim {
            let Some(entry) = self.reclaimable.poll() else {
                break;
            };
            let conn = entry.into_value();
            let Some(contact_info) = self.owners.get(&conn).map(|e| e.value().clone()) else {
                continue;
            };
            let Some(cell) = self.existing_group(&contact_info) else {
                continue;
            };

            let mut group = cell.lock();
            let mut reclaim = &self.reclaimable;
            if !group.evict_if_idle(&conn, &mut reclaim) {
                continue;
            }
            self.owners.remove(&conn);
            self.total.fetch_sub(1, Ordering::AcqRel);
            self.idle.fetch_sub(1, Ordering::AcqRel);
            self.retire_if_unused(&contact_info, &cell, &mut group);
            drop(group);
            victims.push(conn);
        }
        close_all(&self.settings.cache_type, victims, &self.metrics, true);
    }
}

impl<CI: ContactInfo> ConnectionCache<Conn<CI>> for NonBlockingOutboundConnectionCache<CI> {
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

    fn close(&self, conn: &Conn<CI>) {
        let Some((_, contact_info)) = self.owners.remove(conn) else {
            debug!(cache = %self.settings.cache_type, connection = ?conn, "Close of uncached connection ignored");
            return;
        };
        let Some(cell) = self.existing_group(&contact_info) else {
            return;
        };

        let mut group = cell.lock();
        let mut reclaim = &self.reclaimable;
        let Some(was_idle) = group.remove(conn, &mut reclaim) else {
            return;
        };
        self.total.fetch_sub(1, Ordering::AcqRel);
        if was_idle {
            self.idle.fetch_sub(1, Ordering::AcqRel);
        }
        self.retire_if_unused(&contact_info, &cell, &mut group);
        drop(group);

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

impl<CI: ContactInfo> OutboundConnectionCache<CI> for NonBlockingOutboundConnectionCache<CI> {
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

        loop {
            let cell = self.group_for(contact_info);
            let mut group = cell.lock();
            if group.retired {
                continue;
            }

            let mut reclaim = &self.reclaimable;
            if let Some(conn) = group.take_idle(&mut reclaim) {
                self.idle.fetch_sub(1, Ordering::AcqRel);
                self.metrics.idle_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(conn);
            }
            if !self.creation_allowed(&group) {
                if let Some(conn) = group.take_busy(&mut reclaim) {
                    self.metrics.busy_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(conn);
                }
            }

            group.pending += 1;
            self.pending.fetch_add(1, Ordering::AcqRel);
            drop(group);
            return self.create(contact_info, &cell);
        }
    }

    fn release(&self, conn: &Conn<CI>, num_responses_expected: usize) {
        let transition = self.group_of(conn).and_then(|cell| {
            let mut group = cell.lock();
            let mut reclaim = &self.reclaimable;
            let transition = group.release(conn, num_responses_expected, &mut reclaim);
            self.count_idle(transition);
            transition
        });
        match transition {
            Some(Transition::BecameIdle) => self.became_idle(),
            Some(Transition::StillBusy) => {}
            Some(Transition::Unmatched) => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Release of a connection that is not busy");
            }
            None => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Release of unknown connection");
            }
        }
    }

    fn response_received(&self, conn: &Conn<CI>) {
        let transition = self.group_of(conn).and_then(|cell| {
            let mut group = cell.lock();
            let mut reclaim = &self.reclaimable;
            let transition = group.response_received(conn, &mut reclaim);
            self.count_idle(transition);
            transition
        });
        match transition {
            Some(Transition::BecameIdle) => self.became_idle(),
            Some(Transition::StillBusy) => {}
            Some(Transition::Unmatched) => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Response on a connection that expects none");
            }
            None => {
                warn!(cache = %self.settings.cache_type, connection = ?conn, "Response on unknown connection");
            }
        }
    }

    fn can_create_new_connection(&self, contact_info: &CI) -> bool {
        let Some(cell) = self.existing_group(contact_info) else {
            return true;
        };
        let group = cell.lock();
        self.creation_allowed(&group)
    }
}
