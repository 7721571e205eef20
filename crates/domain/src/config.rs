pub mod cache;
pub mod errors;
pub mod load;
pub mod logging;
pub mod root;

pub use cache::{CacheConcurrency, CacheConfig};
pub use errors::ConfigError;
pub use load::LoadConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use root::{CliOverrides, Config};
