use crate::domain::CacheInfo;
use crate::keys::CacheKey;
use crate::planes::data::ReadThroughCache;
use std::fmt::Display;

/// Type-erased administrative view of a cache, independent of its payload type.
pub trait CacheControl: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn describe(&self) -> CacheInfo;
    fn invalidate(&self, key: &CacheKey) -> bool;
    fn clear(&self);
}

impl<V, E> CacheControl for ReadThroughCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Display + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        ReadThroughCache::name(self)
    }

    fn describe(&self) -> CacheInfo {
        ReadThroughCache::describe(self)
    }

    fn invalidate(&self, key: &CacheKey) -> bool {
        ReadThroughCache::invalidate(self, key)
    }

    fn clear(&self) {
        ReadThroughCache::clear(self)
    }
}
