mod connection_cache;
mod connection_finder;
mod inbound_cache;
mod outbound_cache;

pub use connection_cache::{CacheStatsSnapshot, ConnectionCache};
pub use connection_finder::ConnectionFinder;
pub use inbound_cache::InboundConnectionCache;
pub use outbound_cache::OutboundConnectionCache;

// Re-export for convenience
pub use ferrous_orb_domain::{Connection, ConnectionError, ContactInfo};
