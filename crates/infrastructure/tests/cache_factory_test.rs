mod helpers;

use ferrous_orb_domain::{CacheConcurrency, CacheConfig, ConfigError};
use ferrous_orb_infrastructure::cache::ConnectionCacheFactory;
use helpers::{MockConnection, MockContactInfo};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(30);

fn validation_message(err: ConfigError) -> String {
    match err {
        ConfigError::Validation(msg) => msg,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_outbound_factories_reject_zero_bounds() {
    let cases = [
        (0, 1, 1, TTL, "high_water_mark"),
        (1, 0, 1, TTL, "number_to_reclaim"),
        (1, 1, 0, TTL, "max_parallel_connections"),
        (1, 1, 1, Duration::ZERO, "ttl"),
    ];

    for (hwm, reclaim, max_parallel, ttl, field) in cases {
        let blocking = ConnectionCacheFactory::make_blocking_outbound_connection_cache::<MockContactInfo>(
            "out", hwm, reclaim, max_parallel, ttl,
        );
        let non_blocking =
            ConnectionCacheFactory::make_non_blocking_outbound_connection_cache::<MockContactInfo>(
                "out", hwm, reclaim, max_parallel, ttl,
            );

        for result in [blocking, non_blocking] {
            let msg = validation_message(result.err().expect("must be rejected"));
            assert!(msg.contains(field), "{msg}");
        }
    }
}

#[test]
fn test_inbound_factories_reject_invalid_parameters() {
    assert!(ConnectionCacheFactory::make_blocking_inbound_connection_cache::<MockConnection>(
        "in", 0, 1, TTL
    )
    .is_err());
    assert!(
        ConnectionCacheFactory::make_non_blocking_inbound_connection_cache::<MockConnection>(
            "in", 1, 0, TTL
        )
        .is_err()
    );
    assert!(ConnectionCacheFactory::make_blocking_inbound_connection_cache::<MockConnection>(
        " ", 1, 1, TTL
    )
    .is_err());
}

#[test]
fn test_caches_built_from_config() {
    for concurrency in [CacheConcurrency::Blocking, CacheConcurrency::NonBlocking] {
        let mut config = CacheConfig::outbound();
        config.concurrency = concurrency;
        config.high_water_mark = 12;
        config.max_parallel_connections = 3;

        let cache = ConnectionCacheFactory::outbound_from_config::<MockContactInfo>(&config).unwrap();
        assert_eq!(cache.cache_type(), config.cache_type);
        assert_eq!(cache.high_water_mark(), 12);
        assert_eq!(cache.max_parallel_connections(), 3);

        let ci = MockContactInfo::new("orb");
        let conn = cache.get(&ci, None).unwrap();
        cache.release(&conn, 0);
        assert_eq!(cache.number_of_idle_connections(), 1);

        let mut config = CacheConfig::inbound();
        config.concurrency = concurrency;
        let cache = ConnectionCacheFactory::inbound_from_config::<MockConnection>(&config).unwrap();
        assert_eq!(cache.number_to_reclaim(), config.number_to_reclaim);
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = CacheConfig::outbound();
    config.max_parallel_connections = 0;
    assert!(ConnectionCacheFactory::outbound_from_config::<MockContactInfo>(&config).is_err());

    // Inbound caches ignore the parallel bound.
    let mut config = CacheConfig::inbound();
    config.max_parallel_connections = 0;
    assert!(ConnectionCacheFactory::inbound_from_config::<MockConnection>(&config).is_ok());

    config.ttl_secs = 0;
    assert!(ConnectionCacheFactory::inbound_from_config::<MockConnection>(&config).is_err());
}
