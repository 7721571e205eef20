use ferrous_orb_application::ports::CacheStatsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters of one cache. All updates are relaxed; a snapshot is
/// only consistent with itself approximately.
#[derive(Debug, Default)]
pub struct ConnectionCacheMetrics {
    /// Connections opened (outbound) or registered (inbound).
    pub created: AtomicU64,
    pub creation_failures: AtomicU64,
    pub idle_hits: AtomicU64,
    /// Acquisitions that piled onto an already busy connection.
    pub busy_hits: AtomicU64,
    pub finder_hits: AtomicU64,
    pub reclaimed: AtomicU64,
    pub force_closed: AtomicU64,
    pub close_failures: AtomicU64,
}

/// Current accounting, taken by the cache when a snapshot is requested.
pub(crate) struct Accounting<'a> {
    pub cache_type: &'a str,
    pub total: usize,
    pub idle: usize,
    pub reclaimable: usize,
    pub high_water_mark: usize,
    pub number_to_reclaim: usize,
}

impl ConnectionCacheMetrics {
    pub(crate) fn snapshot(&self, accounting: Accounting<'_>) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            cache_type: accounting.cache_type.to_string(),
            total_connections: accounting.total,
            idle_connections: accounting.idle,
            busy_connections: accounting.total.saturating_sub(accounting.idle),
            reclaimable_connections: accounting.reclaimable,
            high_water_mark: accounting.high_water_mark,
            number_to_reclaim: accounting.number_to_reclaim,
            created: self.created.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            idle_hits: self.idle_hits.load(Ordering::Relaxed),
            busy_hits: self.busy_hits.load(Ordering::Relaxed),
            finder_hits: self.finder_hits.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            force_closed: self.force_closed.load(Ordering::Relaxed),
            close_failures: self.close_failures.load(Ordering::Relaxed),
        }
    }
}
