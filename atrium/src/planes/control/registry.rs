use crate::domain::CacheInfo;
use crate::planes::control::CacheControl;
use dashmap::DashMap;
use shared::{Error, Result};
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::info;

/// Named caches owned by the application, for resets and introspection.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    // Maps cache name -> cache handle
    caches: Arc<DashMap<String, Arc<dyn CacheControl>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache under its own name. Returns false if the name is taken.
    pub fn register(&self, cache: Arc<dyn CacheControl>) -> bool {
        let name = cache.name().to_string();
        match self.caches.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(slot) => {
                info!("Cache '{}' already registered", slot.key());
                false
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!("Registered cache '{}'", slot.key());
                slot.insert(cache);
                true
            }
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    pub fn describe(&self, name: &str) -> Result<CacheInfo> {
        self.caches
            .get(name)
            .map(|cache| cache.describe())
            .ok_or(Error::NotFound)
    }

    /// Descriptions of every registered cache, sorted by name.
    pub fn list(&self) -> Vec<CacheInfo> {
        let mut infos: Vec<CacheInfo> = self.caches.iter().map(|c| c.describe()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Clear every registered cache, e.g. on logout. Returns how many were cleared.
    pub fn clear_all(&self) -> usize {
        let handles: Vec<Arc<dyn CacheControl>> =
            self.caches.iter().map(|c| Arc::clone(c.value())).collect();
        for cache in &handles {
            cache.clear();
        }
        info!("Cleared {} cache(s)", handles.len());
        handles.len()
    }
}

impl Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.caches.len())
            .finish()
    }
}
