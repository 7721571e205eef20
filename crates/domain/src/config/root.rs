use serde::{Deserialize, Serialize};

use super::cache::{CacheConcurrency, CacheConfig};
use super::errors::ConfigError;
use super::load::LoadConfig;
use super::logging::LoggingConfig;

const LOCAL_CONFIG_PATH: &str = "ferrous-orb.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/ferrous-orb/config.toml";

/// Main configuration structure for Ferrous ORB
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Client-side connection cache
    #[serde(default = "CacheConfig::outbound")]
    pub outbound: CacheConfig,

    /// Server-side connection cache
    #[serde(default = "CacheConfig::inbound")]
    pub inbound: CacheConfig,

    /// Load driver parameters
    #[serde(default)]
    pub load: LoadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            outbound: CacheConfig::outbound(),
            inbound: CacheConfig::inbound(),
            load: LoadConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-orb.toml in current directory
    /// 3. /etc/ferrous-orb/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::FileRead {
                path: path.to_string(),
                source,
            })?;
        Self::from_toml_str(&contents)
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(threads) = overrides.threads {
            self.load.threads = threads;
        }
        if let Some(iterations) = overrides.iterations {
            self.load.iterations = iterations;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.outbound.concurrency = concurrency;
            self.inbound.concurrency = concurrency;
        }
        if !overrides.endpoints.is_empty() {
            self.load.endpoints = overrides.endpoints;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.outbound.validate(true)?;
        self.inbound.validate(false)?;

        if self.load.threads == 0 {
            return Err(ConfigError::Validation(
                "load.threads must be greater than 0".to_string(),
            ));
        }
        if self.load.endpoints.is_empty() && self.load.contact_infos == 0 {
            return Err(ConfigError::Validation(
                "load.contact_infos must be greater than 0 when no endpoint is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|source| ConfigError::FileWrite {
                path: path.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if std::path::Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub threads: Option<usize>,
    pub iterations: Option<usize>,
    pub concurrency: Option<CacheConcurrency>,
    pub endpoints: Vec<String>,
}
