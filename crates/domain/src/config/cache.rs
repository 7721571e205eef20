use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use super::errors::ConfigError;

/// How a cache instance serializes access to its bookkeeping.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheConcurrency {
    /// One mutex around all state; connection creation runs under it.
    Blocking,

    /// Concurrent maps and per-group locks; connection creation runs unlocked.
    #[default]
    NonBlocking,
}

impl CacheConcurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::NonBlocking => "non_blocking",
        }
    }
}

impl FromStr for CacheConcurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blocking" => Ok(Self::Blocking),
            "non_blocking" | "non-blocking" | "nonblocking" => Ok(Self::NonBlocking),
            _ => Err(format!("Invalid cache concurrency: {}", s)),
        }
    }
}

/// Construction parameters of one connection cache.
///
/// There is no dynamic reconfiguration: a cache keeps the values it was
/// built with for its whole life.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Label used in logs and stats.
    pub cache_type: String,

    #[serde(default)]
    pub concurrency: CacheConcurrency,

    /// Total connection count above which reclamation kicks in.
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,

    /// Upper bound of idle connections closed by one reclamation pass.
    #[serde(default = "default_number_to_reclaim")]
    pub number_to_reclaim: usize,

    /// Per-ContactInfo creation bound. Ignored by inbound caches.
    #[serde(default = "default_max_parallel_connections")]
    pub max_parallel_connections: usize,

    /// Lifetime hint stamped on LRU queue entries. Advisory only.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn outbound() -> Self {
        Self {
            cache_type: "client-outbound".to_string(),
            concurrency: CacheConcurrency::NonBlocking,
            high_water_mark: default_high_water_mark(),
            number_to_reclaim: default_number_to_reclaim(),
            max_parallel_connections: default_max_parallel_connections(),
            ttl_secs: default_ttl_secs(),
        }
    }

    pub fn inbound() -> Self {
        Self {
            cache_type: "server-inbound".to_string(),
            concurrency: CacheConcurrency::Blocking,
            high_water_mark: 128,
            number_to_reclaim: 16,
            max_parallel_connections: 1,
            ttl_secs: default_ttl_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Rejects non-positive limits. `max_parallel_connections` is only
    /// checked when `outbound` is set.
    pub fn validate(&self, outbound: bool) -> Result<(), ConfigError> {
        if self.cache_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache_type cannot be empty".to_string(),
            ));
        }
        if self.high_water_mark == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': high_water_mark must be greater than 0",
                self.cache_type
            )));
        }
        if self.number_to_reclaim == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': number_to_reclaim must be greater than 0",
                self.cache_type
            )));
        }
        if outbound && self.max_parallel_connections == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': max_parallel_connections must be greater than 0",
                self.cache_type
            )));
        }
        if self.ttl_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "Cache '{}': ttl_secs must be greater than 0",
                self.cache_type
            )));
        }
        Ok(())
    }
}

fn default_high_water_mark() -> usize {
    64
}

fn default_number_to_reclaim() -> usize {
    8
}

fn default_max_parallel_connections() -> usize {
    4
}

fn default_ttl_secs() -> u64 {
    300
}
