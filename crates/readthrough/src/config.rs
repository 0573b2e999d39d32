use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for a [`Cache`](crate::Cache).
///
/// Durations deserialize in humantime notation (`"5m"`, `"300s"`, `"100ms"`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on resident entries.
    ///
    /// When an admit would exceed this, the least recently used entry is
    /// evicted first. Must be at least 1.
    pub capacity: usize,

    /// Idle time after which an entry becomes eligible for removal by the
    /// background reclaimer. Every successful lookup of an entry restarts its
    /// idle clock. Must be positive.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 10_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given idle TTL and capacity.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        CacheConfig { capacity, ttl }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(())
    }
}
