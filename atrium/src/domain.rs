use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// A cached value snapshot.
///
/// Entries are replaced wholesale on refresh and never mutated in place.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at: Instant::now(),
        }
    }

    /// Valid iff `now - stored_at < ttl`. A zero TTL is never fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub name: String,               // unique cache name
    pub default_ttl: Duration,      // used by `get_default`
    pub max_entries: Option<u64>,   // None -> unbounded store
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            default_ttl,
            max_entries: None,
        }
    }

    pub fn with_max_entries(mut self, max_entries: Option<u64>) -> Self {
        self.max_entries = max_entries;
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheInfo {
    pub name: String,
    pub default_ttl_ms: u64,
    pub entries: u64,
    pub in_flight: u64,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub failures: u64,
}
