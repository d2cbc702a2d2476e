use atrium::domain::CacheEntry;
use atrium::ports::EntryStore;
use moka::sync::Cache;
use std::fmt::Debug;

/// Size-bounded entry store on top of moka.
///
/// Moka only evicts for capacity here; expiry is still decided by the
/// read-through cache comparing `stored_at` against the caller's TTL.
pub struct MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, CacheEntry<V>>,
}

impl<V> MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &str, max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().name(name).max_capacity(max_entries).build(),
        }
    }
}

impl<V> EntryStore<V> for MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.cache.get(key)
    }

    fn put(&self, entry: CacheEntry<V>) {
        self.cache.insert(entry.key.clone(), entry);
    }

    fn remove(&self, key: &str) -> bool {
        self.cache.remove(key).is_some()
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }

    fn len(&self) -> u64 {
        // entry_count is eventually consistent until pending maintenance runs
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl<V> Debug for MokaStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moka_store_put_and_get() {
        let store = MokaStore::new("test", 100);
        store.put(CacheEntry::new("hello", "world"));

        let entry = store.get("hello").unwrap();
        assert_eq!(entry.value, "world");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_moka_store_remove() {
        let store = MokaStore::new("test", 100);
        store.put(CacheEntry::new("test_key", "test_value"));

        assert!(store.remove("test_key"));
        assert!(store.get("test_key").is_none());
        assert!(!store.remove("test_key"));
    }

    #[test]
    fn test_moka_store_clear() {
        let store = MokaStore::new("test", 100);
        store.put(CacheEntry::new("a", 1));
        store.put(CacheEntry::new("b", 2));

        store.clear();
        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_moka_store_bounded() {
        let store = MokaStore::new("test", 2);
        store.put(CacheEntry::new("key1", "value1"));
        store.put(CacheEntry::new("key2", "value2"));
        store.put(CacheEntry::new("key3", "value3"));

        assert!(store.len() <= 2, "store should hold at most 2 entries");
    }
}
