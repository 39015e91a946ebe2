//! Configuration loading for the Billbook CLI.
//!
//! Paths are required. The cache section is optional; anything it leaves
//! out falls back to the `BILLBOOK_CACHE_*` environment variables, then to
//! the built-in defaults.

use billbook_core::BusinessId;
use billbook_storage::CacheConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// JSON file with the records served by the in-memory remote.
    pub seed_path: PathBuf,
    /// Where the active business is remembered between runs.
    pub session_path: PathBuf,
    /// Business to use when the session has none selected.
    pub default_business_id: Option<BusinessId>,
    #[serde(default)]
    pub log_format: LogFormat,
    pub cache: Option<CacheSection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub listing_ttl_ms: Option<u64>,
    pub entity_ttl_ms: Option<u64>,
    pub profile_ttl_ms: Option<u64>,
    pub loader_timeout_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliConfigError {
    #[error("Missing configuration file path (use --config or BILLBOOK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl CliConfig {
    /// Load and validate the file named by `--config` or `BILLBOOK_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, CliConfigError> {
        let path = path.ok_or(CliConfigError::MissingConfigPath)?;
        let config = Self::from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, CliConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CliConfigError> {
        let config: CliConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliConfigError> {
        if self.seed_path.as_os_str().is_empty() {
            return Err(CliConfigError::InvalidValue {
                field: "seed_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.session_path.as_os_str().is_empty() {
            return Err(CliConfigError::InvalidValue {
                field: "session_path",
                reason: "must not be empty".to_string(),
            });
        }
        self.cache_config()
            .validate()
            .map_err(|e| CliConfigError::InvalidValue {
                field: "cache",
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Cache settings with the file taking precedence over the environment.
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::from_env();
        let Some(section) = &self.cache else {
            return config;
        };
        if let Some(ms) = section.listing_ttl_ms {
            config = config.with_listing_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = section.entity_ttl_ms {
            config = config.with_entity_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = section.profile_ttl_ms {
            config = config.with_profile_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = section.loader_timeout_ms {
            config = config.with_loader_timeout(Duration::from_millis(ms));
        }
        config
    }
}
