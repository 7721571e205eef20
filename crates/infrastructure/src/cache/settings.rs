use ferrous_orb_domain::{CacheConfig, ConfigError};
use std::time::Duration;

/// Validated construction parameters shared by every cache flavour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub cache_type: String,
    pub high_water_mark: usize,
    pub number_to_reclaim: usize,
    /// Always 1 for inbound caches, where it has no meaning.
    pub max_parallel_connections: usize,
    pub ttl: Duration,
}

impl CacheSettings {
    pub fn outbound(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        max_parallel_connections: usize,
        ttl: Duration,
    ) -> Result<Self, ConfigError> {
        if max_parallel_connections == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': max_parallel_connections must be greater than 0",
                cache_type
            )));
        }
        let mut settings = Self::inbound(cache_type, high_water_mark, number_to_reclaim, ttl)?;
        settings.max_parallel_connections = max_parallel_connections;
        Ok(settings)
    }

    pub fn inbound(
        cache_type: &str,
        high_water_mark: usize,
        number_to_reclaim: usize,
        ttl: Duration,
    ) -> Result<Self, ConfigError> {
        if cache_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache_type cannot be empty".to_string(),
            ));
        }
        if high_water_mark == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': high_water_mark must be greater than 0",
                cache_type
            )));
        }
        if number_to_reclaim == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': number_to_reclaim must be greater than 0",
                cache_type
            )));
        }
        if ttl.is_zero() {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': ttl must be greater than 0",
                cache_type
            )));
        }
        Ok(Self {
            cache_type: cache_type.to_string(),
            high_water_mark,
            number_to_reclaim,
            max_parallel_connections: 1,
            ttl,
        })
    }

    pub fn outbound_from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate(true)?;
        Self::outbound(
            &config.cache_type,
            config.high_water_mark,
            config.number_to_reclaim,
            config.max_parallel_connections,
            config.ttl(),
        )
    }

    pub fn inbound_from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate(false)?;
        Self::inbound(
            &config.cache_type,
            config.high_water_mark,
            config.number_to_reclaim,
            config.ttl(),
        )
    }

    /// Creation rule of outbound caches. A ContactInfo without any
    /// established connection may always open one; otherwise both the cache
    /// total and the group size (pending creations included) must be under
    /// their bounds.
    pub(crate) fn creation_allowed(
        &self,
        established: usize,
        group_pending: usize,
        total_with_pending: usize,
    ) -> bool {
        established == 0
            || (total_with_pending < self.high_water_mark
                && established + group_pending < self.max_parallel_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(hwm: usize, max_parallel: usize) -> CacheSettings {
        CacheSettings::outbound("test", hwm, 1, max_parallel, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_empty_group_may_always_create() {
        let s = settings(1, 1);
        assert!(s.creation_allowed(0, 0, 100));
        assert!(s.creation_allowed(0, 3, 100));
    }

    #[test]
    fn test_creation_bounded_by_high_water_mark() {
        let s = settings(2, 5);
        assert!(s.creation_allowed(1, 0, 1));
        assert!(!s.creation_allowed(1, 0, 2));
    }

    #[test]
    fn test_creation_bounded_by_parallel_limit_including_pending() {
        let s = settings(100, 2);
        assert!(s.creation_allowed(1, 0, 10));
        assert!(!s.creation_allowed(1, 1, 10));
        assert!(!s.creation_allowed(2, 0, 10));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(CacheSettings::outbound("x", 0, 1, 1, Duration::from_secs(1)).is_err());
        assert!(CacheSettings::outbound("x", 1, 0, 1, Duration::from_secs(1)).is_err());
        assert!(CacheSettings::outbound("x", 1, 1, 0, Duration::from_secs(1)).is_err());
        assert!(CacheSettings::outbound("x", 1, 1, 1, Duration::ZERO).is_err());
        assert!(CacheSettings::inbound("", 1, 1, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_sub_second_ttl_accepted() {
        let s = CacheSettings::inbound("x", 1, 1, Duration::from_millis(250)).unwrap();
        assert_eq!(s.ttl, Duration::from_millis(250));
        assert_eq!(s.max_parallel_connections, 1);
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig::outbound();
        let s = CacheSettings::outbound_from_config(&config).unwrap();
        assert_eq!(s.cache_type, config.cache_type);
        assert_eq!(s.high_water_mark, config.high_water_mark);
        assert_eq!(s.max_parallel_connections, config.max_parallel_connections);
        assert_eq!(s.ttl, config.ttl());
    }
}
