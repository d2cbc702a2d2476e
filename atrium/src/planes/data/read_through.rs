use crate::domain::{CacheConfig, CacheEntry, CacheInfo};
use crate::events::{
    CacheClearedEvent, CacheEntryEvent, EntryInvalidatedEvent, EntryStoredEvent, now_timestamp,
};
use crate::keys::CacheKey;
use crate::ports::EntryStore;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt::{self, Debug, Display};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Marker for a fetch that is currently running for a key.
struct InFlight<V, E> {
    id: u64,
    future: Flight<V, E>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

struct Inner<V, E> {
    config: CacheConfig,
    store: Arc<dyn EntryStore<V>>,
    in_flight: DashMap<String, InFlight<V, E>>,
    next_flight: AtomicU64,
    counters: Counters,
    event_broadcaster: Option<broadcast::Sender<CacheEntryEvent>>,
}

enum Lookup<V, E> {
    Hit(V),
    Join(u64, Flight<V, E>),
    Start(u64, Flight<V, E>),
}

/// A caller's handle on a flight.
///
/// If the caller is dropped before the flight resolves and no other caller
/// holds it, the marker is removed, which drops the fetch itself.
struct Waiter<'a, V, E> {
    inner: &'a Inner<V, E>,
    key: &'a str,
    id: u64,
    flight: Option<Flight<V, E>>,
}

impl<V: Clone, E: Clone> Future for Waiter<'_, V, E> {
    type Output = Result<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // already resolved
        let Some(flight) = self.flight.as_mut() else {
            return Poll::Pending;
        };
        let outcome = ready!(flight.poll_unpin(cx));
        self.flight = None;
        Poll::Ready(outcome)
    }
}

impl<V, E> Drop for Waiter<'_, V, E> {
    fn drop(&mut self) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        drop(flight);
        // Same shard lock as joiners take, so nobody can join between the
        // count check and the removal.
        let abandoned = self
            .inner
            .in_flight
            .remove_if(self.key, |_, marker| {
                marker.id == self.id && marker.future.strong_count() == Some(1)
            })
            .is_some();
        if abandoned {
            debug!(
                "Cache '{}' dropped abandoned fetch for '{}'",
                self.inner.config.name, self.key
            );
        }
    }
}

/// Read-through cache with a fixed per-call TTL and single-flight fetches.
///
/// Cloning is cheap and yields a handle to the same entries. Concurrent reads
/// of a missing or expired key share one fetch; every waiter receives the same
/// outcome, value or error. A fetch result is stored only if no `invalidate`
/// or `clear` for its key happened while it was running.
pub struct ReadThroughCache<V, E = shared::Error> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for ReadThroughCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> ReadThroughCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Display + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig, store: Arc<dyn EntryStore<V>>) -> Self {
        Self::build(config, store, None)
    }

    pub fn with_event_broadcaster(
        config: CacheConfig,
        store: Arc<dyn EntryStore<V>>,
        broadcaster: broadcast::Sender<CacheEntryEvent>,
    ) -> Self {
        Self::build(config, store, Some(broadcaster))
    }

    fn build(
        config: CacheConfig,
        store: Arc<dyn EntryStore<V>>,
        event_broadcaster: Option<broadcast::Sender<CacheEntryEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                in_flight: DashMap::new(),
                next_flight: AtomicU64::new(0),
                counters: Counters::default(),
                event_broadcaster,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.config.default_ttl
    }

    /// Return the cached value for `key` if it is younger than `ttl`, otherwise
    /// run `fetch`, store its result and return it.
    ///
    /// Errors from `fetch` are returned as-is and leave any existing entry in
    /// place. A zero `ttl` disables caching for the call: `fetch` always runs,
    /// on its own, and its result is not stored. `fetch` is called at most
    /// once and must not call back into this cache before returning its future.
    ///
    /// Dropping the returned future abandons the read. When the last caller
    /// waiting on a fetch goes away the fetch is dropped too and nothing is
    /// written, so the next `get` starts afresh.
    pub async fn get<F, Fut>(&self, key: &CacheKey, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if ttl.is_zero() {
            self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache '{}' bypassed for '{}' (zero ttl)", self.name(), key);
            let outcome = fetch().await;
            if let Err(e) = &outcome {
                self.inner.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Cache '{}' fetch for '{}' failed: {}", self.name(), key, e);
            }
            return outcome;
        }

        if let Some(value) = self.peek(key, ttl) {
            self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache '{}' hit for '{}'", self.name(), key);
            return Ok(value);
        }

        let (id, flight) = match self.join_or_start(key, ttl, fetch) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Join(id, flight) => {
                debug!("Cache '{}' joined in-flight fetch for '{}'", self.name(), key);
                (id, flight)
            }
            Lookup::Start(id, flight) => {
                debug!("Cache '{}' miss for '{}', fetching", self.name(), key);
                (id, flight)
            }
        };

        Waiter {
            inner: &self.inner,
            key: key.as_str(),
            id,
            flight: Some(flight),
        }
        .await
    }

    /// `get` with the instance's configured TTL.
    pub async fn get_default<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get(key, self.default_ttl(), fetch).await
    }

    /// Cached value for `key` if still fresh; never fetches.
    pub fn peek(&self, key: &CacheKey, ttl: Duration) -> Option<V> {
        self.inner
            .store
            .get(key.as_str())
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.value)
    }

    /// Drop the entry for `key` and detach any running fetch for it, so the
    /// next `get` fetches again. Returns whether an entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        // in-flight marker first: a fetch completing in between either stored
        // before we get to the store, or finds its marker gone and skips storing
        let detached = self.inner.in_flight.remove(key.as_str()).is_some();
        let had_entry = self.inner.store.remove(key.as_str());
        info!(
            "Cache '{}' invalidated '{}' (entry: {}, in-flight detached: {})",
            self.name(),
            key,
            had_entry,
            detached
        );
        self.inner.emit(CacheEntryEvent::Invalidated(EntryInvalidatedEvent {
            cache_name: self.name().to_string(),
            key: key.to_string(),
            had_entry,
            timestamp: now_timestamp(),
        }));
        had_entry
    }

    /// Drop every entry and detach every running fetch.
    pub fn clear(&self) {
        self.inner.in_flight.clear();
        self.inner.store.clear();
        info!("Cache '{}' cleared", self.name());
        self.inner.emit(CacheEntryEvent::Cleared(CacheClearedEvent {
            cache_name: self.name().to_string(),
            timestamp: now_timestamp(),
        }));
    }

    pub fn describe(&self) -> CacheInfo {
        let counters = &self.inner.counters;
        CacheInfo {
            name: self.name().to_string(),
            default_ttl_ms: u64::try_from(self.default_ttl().as_millis()).unwrap_or(u64::MAX),
            entries: self.inner.store.len(),
            in_flight: self.inner.in_flight.len() as u64,
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    fn join_or_start<F, Fut>(&self, key: &CacheKey, ttl: Duration, fetch: F) -> Lookup<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let counters = &self.inner.counters;

        match self.inner.in_flight.entry(key.to_string()) {
            Entry::Occupied(slot) => {
                counters.coalesced.fetch_add(1, Ordering::Relaxed);
                let marker = slot.get();
                Lookup::Join(marker.id, marker.future.clone())
            }
            Entry::Vacant(slot) => {
                // a fetch may have finished since the first lookup
                if let Some(value) = self.peek(key, ttl) {
                    counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Hit(value);
                }
                counters.misses.fetch_add(1, Ordering::Relaxed);

                // runs under the shard lock; `fetch` only builds the future
                let pending = fetch();
                let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let future = settle(Arc::downgrade(&self.inner), key.to_string(), id, pending)
                    .boxed()
                    .shared();
                slot.insert(InFlight {
                    id,
                    future: future.clone(),
                });
                Lookup::Start(id, future)
            }
        }
    }
}

/// Drive one fetch to completion and write the value back if the flight is
/// still the registered one for its key.
async fn settle<V, E, Fut>(inner: Weak<Inner<V, E>>, key: String, id: u64, pending: Fut) -> Result<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Display + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    let outcome = pending.await;

    let Some(inner) = inner.upgrade() else {
        return outcome;
    };

    let mut stored = false;
    // The write-back happens under the in-flight shard lock, so it is ordered
    // against `invalidate` removing the marker.
    inner.in_flight.remove_if(&key, |_, flight| {
        if flight.id != id {
            return false;
        }
        if let Ok(value) = &outcome {
            inner.store.put(CacheEntry::new(key.clone(), value.clone()));
            stored = true;
        }
        true
    });

    match &outcome {
        Ok(_) if stored => {
            debug!("Cache '{}' stored '{}'", inner.config.name, key);
            inner.emit(CacheEntryEvent::Stored(EntryStoredEvent {
                cache_name: inner.config.name.clone(),
                key,
                timestamp: now_timestamp(),
            }));
        }
        Ok(_) => {
            debug!(
                "Cache '{}' discarded result for '{}', key was invalidated during fetch",
                inner.config.name, key
            );
        }
        Err(e) => {
            inner.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!("Cache '{}' fetch for '{}' failed: {}", inner.config.name, key, e);
        }
    }

    outcome
}

impl<V, E> Inner<V, E> {
    fn emit(&self, event: CacheEntryEvent) {
        let Some(broadcaster) = &self.event_broadcaster else {
            return;
        };
        match broadcaster.send(event) {
            Ok(subscriber_count) => {
                debug!(
                    "Broadcasted cache event for '{}' to {} subscriber(s)",
                    self.config.name, subscriber_count
                );
            }
            Err(_) => {
                warn!("No subscribers for cache event on '{}'", self.config.name);
            }
        }
    }
}

impl<V: 'static, E> Debug for ReadThroughCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("name", &self.inner.config.name)
            .field("default_ttl", &self.inner.config.default_ttl)
            .field("entries", &self.inner.store.len())
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}
