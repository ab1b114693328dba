//! Configuration Module
//!
//! Loads cache configuration from environment variables. The owning
//! application builds this once and injects what it derives into the store
//! and the caches; nothing is configured implicitly.

use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;

/// Process-level cache configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace of the store instance the cache reads through
    pub namespace: String,
    /// Key prefix, empty for none
    pub prefix: String,
    /// TTL in seconds of loaded values and cached failures
    pub ttl_secs: u64,
    /// Maximum number of values the memory store can hold
    pub max_entries: usize,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Serialize loads of the same key
    pub single_flight: bool,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Store namespace (default: `default`)
    /// - `CACHE_PREFIX` - Key prefix (default: empty)
    /// - `CACHE_TTL` - TTL in seconds (default: 300)
    /// - `MAX_ENTRIES` - Maximum store entries (default: 1000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `CACHE_SINGLE_FLIGHT` - `true` to serialize loads per key (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
            prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.prefix),
            ttl_secs: env_or("CACHE_TTL", defaults.ttl_secs),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            single_flight: env_or("CACHE_SINGLE_FLIGHT", defaults.single_flight),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    /// Parameters for [`ValueCache::from_config`](crate::cache::ValueCache::from_config).
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.namespace.clone(), self.prefix.clone(), self.ttl())
            .with_single_flight(self.single_flight)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            prefix: String::new(),
            ttl_secs: 300,
            max_entries: 1000,
            cleanup_interval: 1,
            single_flight: false,
        }
    }
}
