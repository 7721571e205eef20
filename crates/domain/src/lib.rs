//! Ferrous ORB Domain Layer
pub mod config;
pub mod connection;
pub mod errors;

pub use config::{
    CacheConcurrency, CacheConfig, CliOverrides, Config, ConfigError, LoadConfig, LogFormat,
    LoggingConfig,
};
pub use connection::{Connection, ContactInfo};
pub use errors::{ConnectionError, QueueError};
