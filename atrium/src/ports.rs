#![deny(clippy::all)]

use crate::domain::{CacheConfig, CacheEntry};
use std::sync::Arc;

// Ports are the pluggable extension points for the entry storage behind a cache

/// Port for creating entry storage from configuration
pub trait StorageFactory<V>: Send + Sync + 'static {
    fn create_from_config(&self, config: &CacheConfig) -> Arc<dyn EntryStore<V>>;
}

/// Port for the entry map behind a read-through cache.
///
/// All operations are synchronous: lookup and write-back never suspend.
/// Freshness is decided by the cache, so stores hand back expired entries too.
pub trait EntryStore<V>: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<CacheEntry<V>>;
    /// Insert or replace the entry under `entry.key`.
    fn put(&self, entry: CacheEntry<V>);
    fn remove(&self, key: &str) -> bool;
    fn clear(&self);
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
