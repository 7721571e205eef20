use ferrous_orb_domain::Connection;

/// Snapshot of connection cache accounting and metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub cache_type: String,
    pub total_connections: usize,
    pub idle_connections: usize,
    pub busy_connections: usize,
    pub reclaimable_connections: usize,
    pub high_water_mark: usize,
    pub number_to_reclaim: usize,
    pub created: u64,
    pub creation_failures: u64,
    pub idle_hits: u64,
    pub busy_hits: u64,
    pub finder_hits: u64,
    pub reclaimed: u64,
    pub force_closed: u64,
    pub close_failures: u64,
}

impl CacheStatsSnapshot {
    /// Share of acquisitions served without opening a connection.
    pub fn reuse_rate(&self) -> f64 {
        let reused = self.idle_hits + self.busy_hits + self.finder_hits;
        let total = reused + self.created;
        if total == 0 {
            0.0
        } else {
            reused as f64 / total as f64
        }
    }
}

/// Accounting shared by inbound and outbound caches.
///
/// A connection is idle when no caller holds it and no response is
/// expected on it; every other cached connection counts as busy.
pub trait ConnectionCache<C: Connection>: Send + Sync {
    /// Label given at construction, used in logs.
    fn cache_type(&self) -> &str;

    /// Idle plus busy connections.
    fn number_of_connections(&self) -> usize;

    fn number_of_idle_connections(&self) -> usize;

    fn number_of_busy_connections(&self) -> usize;

    /// Idle connections currently queued for reclamation.
    fn number_of_reclaimable_connections(&self) -> usize;

    fn high_water_mark(&self) -> usize;

    fn number_to_reclaim(&self) -> usize;

    /// Drops `conn` from the cache and closes it, whatever its state.
    /// Requests or responses in flight on it may fail.
    fn close(&self, conn: &C);

    fn stats(&self) -> CacheStatsSnapshot;
}
