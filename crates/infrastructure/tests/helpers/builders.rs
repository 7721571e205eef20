#![allow(dead_code)]
use super::mock_transport::{MockConnection, MockContactInfo};
use ferrous_orb_application::ports::{InboundConnectionCache, OutboundConnectionCache};
use ferrous_orb_infrastructure::cache::ConnectionCacheFactory;
use std::sync::Arc;
use std::time::Duration;

pub type Outbound = Arc<dyn OutboundConnectionCache<MockContactInfo>>;
pub type Inbound = Arc<dyn InboundConnectionCache<MockConnection>>;

const TTL: Duration = Duration::from_secs(60);

/// One cache of each flavour with identical bounds, labelled for assertion
/// messages.
pub fn outbound_caches(
    high_water_mark: usize,
    number_to_reclaim: usize,
    max_parallel_connections: usize,
) -> Vec<(&'static str, Outbound)> {
    vec![
        (
            "blocking",
            ConnectionCacheFactory::make_blocking_outbound_connection_cache(
                "test-outbound",
                high_water_mark,
                number_to_reclaim,
                max_parallel_connections,
                TTL,
            )
            .unwrap(),
        ),
        (
            "non-blocking",
            ConnectionCacheFactory::make_non_blocking_outbound_connection_cache(
                "test-outbound",
                high_water_mark,
                number_to_reclaim,
                max_parallel_connections,
                TTL,
            )
            .unwrap(),
        ),
    ]
}

pub fn inbound_caches(high_water_mark: usize, number_to_reclaim: usize) -> Vec<(&'static str, Inbound)> {
    vec![
        (
            "blocking",
            ConnectionCacheFactory::make_blocking_inbound_connection_cache(
                "test-inbound",
                high_water_mark,
                number_to_reclaim,
                TTL,
            )
            .unwrap(),
        ),
        (
            "non-blocking",
            ConnectionCacheFactory::make_non_blocking_inbound_connection_cache(
                "test-inbound",
                high_water_mark,
                number_to_reclaim,
                TTL,
            )
            .unwrap(),
        ),
    ]
}
