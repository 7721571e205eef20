use super::{
    BlockingInboundConnectionCache, BlockingOutboundConnectionCache, CacheSettings,
    NonBlockingInboundConnectionCache, NonBlockingOutboundConnectionCache,
};
use ferrous_orb_application::ports::{InboundConnectionCache, OutboundConnectionCache};
use ferrous_orb_domain::{CacheConcurrency, CacheConfig, ConfigError, Connection, ContactInfo};
use std::sync::Arc;
use std::time::Duration;

/// Builds connection caches behind their port traits.
///
/// Every constructor validates its parameters and fails with
/// [`ConfigError::Validation`] on a zero bound or an empty label.
pub struct ConnectionCacheFactory;

impl ConnectionCacheFactory {
    pub fn make_blocking_outbound_connection_cache<CI: ContactInfo>(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        max_parallel_connections: usize,
        ttl: Duration,
    ) -> Result<Arc<dyn OutboundConnectionCache<CI>>, ConfigError> {
        let settings = CacheSettings::outbound(
            cache_type,
            high_water_mark,
            number_to_reclaim,
            max_parallel_connections,
            ttl,
        )?;
        Ok(Arc::new(BlockingOutboundConnectionCache::new(settings)))
    }

    pub fn make_non_blocking_outbound_connection_cache<CI: ContactInfo>(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        max_parallel_connections: usize,
        ttl: Duration,
    ) -> Result<Arc<dyn OutboundConnectionCache<CI>>, ConfigError> {
        let settings = CacheSettings::outbound(
            cache_type,
            high_water_mark,
            number_to_reclaim,
            max_parallel_connections,
            ttl,
        )?;
        Ok(Arc::new(NonBlockingOutboundConnectionCache::new(settings)))
    }

    pub fn make_blocking_inbound_connection_cache<C: Connection>(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        ttl: Duration,
    ) -> Result<Arc<dyn InboundConnectionCache<C>>, ConfigError> {
        let settings = CacheSettings::inbound(cache_type, high_water_mark, number_to_reclaim, ttl)?;
        Ok(Arc::new(BlockingInboundConnectionCache::new(settings)))
    }

    pub fn make_non_blocking_inbound_connection_cache<C: Connection>(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        ttl: Duration,
    ) -> Result<Arc<dyn InboundConnectionCache<C>>, ConfigError> {
        let settings = CacheSettings::inbound(cache_type, high_water_mark, number_to_reclaim, ttl)?;
        Ok(Arc::new(NonBlockingInboundConnectionCache::new(settings)))
    }

    /// Outbound cache of the flavour named by `config.concurrency`.
    pub fn outbound_from_config<CI: ContactInfo>(
        config: &CacheConfig,
    ) -> Result<Arc<dyn OutboundConnectionCache<CI>>, ConfigError> {
        let settings = CacheSettings::outbound_from_config(config)?;
        Ok(match config.concurrency {
            CacheConcurrency::Blocking => Arc::new(BlockingOutboundConnectionCache::new(settings)),
            CacheConcurrency::NonBlocking => {
                Arc::new(NonBlockingOutboundConnectionCache::new(settings))
            }
        })
    }

    /// Inbound cache of the flavour named by `config.concurrency`.
    pub fn inbound_from_config<C: Connection>(
        config: &CacheConfig,
    ) -> Result<Arc<dyn InboundConnectionCache<C>>, ConfigError> {
        let settings = CacheSettings::inbound_from_config(config)?;
        Ok(match config.concurrency {
            CacheConcurrency::Blocking => Arc::new(BlockingInboundConnectionCache::new(settings)),
            CacheConcurrency::NonBlocking => {
                Arc::new(NonBlockingInboundConnectionCache::new(settings))
            }
        })
    }
}
