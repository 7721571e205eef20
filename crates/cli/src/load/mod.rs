//! Synthetic traffic against the connection caches.

mod inbound;
mod outbound;

pub use inbound::run_inbound;
pub use outbound::run_outbound;

use ferrous_orb_application::ports::CacheStatsSnapshot;
use std::time::Duration;
use tracing::{info, warn};

pub struct LoadReport {
    pub operations: u64,
    pub failures: u64,
    pub elapsed: Duration,
    pub stats: CacheStatsSnapshot,
}

impl LoadReport {
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.operations as f64 / secs
        }
    }
}

pub fn log_report(direction: &str, report: &LoadReport) {
    let stats = &report.stats;
    info!(
        direction,
        cache = %stats.cache_type,
        operations = report.operations,
        failures = report.failures,
        elapsed_ms = report.elapsed.as_millis() as u64,
        ops_per_sec = format!("{:.0}", report.ops_per_sec()),
        connections = stats.total_connections,
        idle = stats.idle_connections,
        created = stats.created,
        reclaimed = stats.reclaimed,
        reuse_rate = format!("{:.1}%", stats.reuse_rate() * 100.0),
        "Load report"
    );
    if stats.close_failures > 0 {
        warn!(
            direction,
            close_failures = stats.close_failures,
            "Some connections failed to close"
        );
    }
}
