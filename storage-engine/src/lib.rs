use atrium::domain::{CacheConfig, CacheEntry};
use atrium::ports::{EntryStore, StorageFactory};
use dashmap::DashMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

mod moka_cache;

pub use moka_cache::MokaStore;

/// Unbounded DashMap-backed entry store.
///
/// Entries are only removed by invalidation or `clear`; there is no eviction.
pub struct DashMapStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> DashMapStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V> Default for DashMapStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EntryStore<V> for DashMapStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, entry: CacheEntry<V>) {
        self.entries.insert(entry.key.clone(), entry);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> u64 {
        self.entries.len() as u64
    }
}

impl<V> Debug for DashMapStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashMapStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Picks a bounded moka store when `max_entries` is set, otherwise a DashMap store.
pub struct DefaultStorageFactory<V> {
    _value: PhantomData<fn() -> V>,
}

impl<V> DefaultStorageFactory<V> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<V> Default for DefaultStorageFactory<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StorageFactory<V> for DefaultStorageFactory<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn create_from_config(&self, config: &CacheConfig) -> Arc<dyn EntryStore<V>> {
        match config.max_entries {
            Some(max_entries) => {
                debug!("Cache '{}' backed by moka, max {} entries", config.name, max_entries);
                Arc::new(MokaStore::new(&config.name, max_entries))
            }
            None => {
                debug!("Cache '{}' backed by unbounded dashmap", config.name);
                Arc::new(DashMapStore::new())
            }
        }
    }
}
