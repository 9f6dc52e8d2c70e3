//! Request cache configuration.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 60;
const DEFAULT_MAX_ENTRIES: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every lookup goes straight to the fetcher.
    pub enabled: bool,
    /// How long a completed fetch is served from memory.
    pub ttl: Duration,
    /// Upper bound on stored entries per cache instance.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: settings.ttl,
            max_entries: settings.max_entries.get(),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Capacity clamped to at least one entry.
    pub fn capacity(&self) -> u64 {
        self.max_entries.max(1)
    }
}
