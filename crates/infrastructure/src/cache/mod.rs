//! Connection caches.
//!
//! Both directions come in two flavours with identical contracts:
//! *blocking* caches keep all bookkeeping behind one mutex, *non-blocking*
//! caches spread it over concurrent maps and never hold a lock while a
//! connection is being opened.

mod entry;
mod factory;
mod group;
pub mod inbound;
mod metrics;
pub mod outbound;
mod settings;

pub use factory::ConnectionCacheFactory;
pub use inbound::{BlockingInboundConnectionCache, NonBlockingInboundConnectionCache};
pub use metrics::ConnectionCacheMetrics;
pub use outbound::{BlockingOutboundConnectionCache, NonBlockingOutboundConnectionCache};
pub use settings::CacheSettings;

use ferrous_orb_domain::Connection;
use smallvec::SmallVec;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// Connections picked by one reclamation pass, closed once locks are gone.
pub(crate) type Victims<C> = SmallVec<[C; 8]>;

/// Closes connections dropped from a cache. A failure is logged and counted
/// but never stops the remaining closes.
pub(crate) fn close_all<C: Connection>(
    cache_type: &str,
    victims: impl IntoIterator<Item = C>,
    metrics: &ConnectionCacheMetrics,
    reclaimed: bool,
) {
    for conn in victims {
        if reclaimed {
            metrics.reclaimed.fetch_add(1, Ordering::Relaxed);
        } else {
            metrics.force_closed.fetch_add(1, Ordering::Relaxed);
        }
        match conn.close() {
            Ok(()) => debug!(cache = cache_type, connection = ?conn, reclaimed, "Connection closed"),
            Err(e) => {
                metrics.close_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    cache = cache_type,
                    connection = ?conn,
                    error = %e,
                    "Failed to close connection"
                );
            }
        }
    }
}
