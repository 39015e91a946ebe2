//! Cache configuration and TTL classes.

use billbook_core::{BillbookResult, ConfigError};
use std::time::Duration;

/// Static freshness class of a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Frequently changing listings such as recent invoices.
    Listing,
    /// Parties and items.
    Entity,
    /// Slow-changing records such as the business profile.
    Profile,
}

/// Configuration for the cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for [`TtlClass::Listing`].
    pub listing_ttl: Duration,
    /// TTL for [`TtlClass::Entity`].
    pub entity_ttl: Duration,
    /// TTL for [`TtlClass::Profile`].
    pub profile_ttl: Duration,
    /// Upper bound on a single loader call, and on waiting for a manual
    /// loading marker to clear.
    pub loader_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl: Duration::from_secs(60),
            entity_ttl: Duration::from_secs(300), // 5 minutes
            profile_ttl: Duration::from_secs(600),
            loader_timeout: Duration::from_secs(10),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listing TTL.
    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }

    /// Set the entity TTL.
    pub fn with_entity_ttl(mut self, ttl: Duration) -> Self {
        self.entity_ttl = ttl;
        self
    }

    /// Set the profile TTL.
    pub fn with_profile_ttl(mut self, ttl: Duration) -> Self {
        self.profile_ttl = ttl;
        self
    }

    /// Set the loader timeout.
    pub fn with_loader_timeout(mut self, timeout: Duration) -> Self {
        self.loader_timeout = timeout;
        self
    }

    /// TTL for a freshness class.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Listing => self.listing_ttl,
            TtlClass::Entity => self.entity_ttl,
            TtlClass::Profile => self.profile_ttl,
        }
    }

    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables (all in milliseconds, unset or unparsable
    /// values fall back to the defaults):
    /// - `BILLBOOK_CACHE_LISTING_TTL_MS` (default: 60000)
    /// - `BILLBOOK_CACHE_ENTITY_TTL_MS` (default: 300000)
    /// - `BILLBOOK_CACHE_PROFILE_TTL_MS` (default: 600000)
    /// - `BILLBOOK_CACHE_LOADER_TIMEOUT_MS` (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listing_ttl: env_millis("BILLBOOK_CACHE_LISTING_TTL_MS")
                .unwrap_or(defaults.listing_ttl),
            entity_ttl: env_millis("BILLBOOK_CACHE_ENTITY_TTL_MS").unwrap_or(defaults.entity_ttl),
            profile_ttl: env_millis("BILLBOOK_CACHE_PROFILE_TTL_MS")
                .unwrap_or(defaults.profile_ttl),
            loader_timeout: env_millis("BILLBOOK_CACHE_LOADER_TIMEOUT_MS")
                .unwrap_or(defaults.loader_timeout),
        }
    }

    /// Validate the configuration. Every duration must be positive.
    pub fn validate(&self) -> BillbookResult<()> {
        let fields = [
            ("listing_ttl", self.listing_ttl),
            ("entity_ttl", self.entity_ttl),
            ("profile_ttl", self.profile_ttl),
            ("loader_timeout", self.loader_timeout),
        ];
        for (field, value) in fields {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: format!("{} must be positive", field),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
