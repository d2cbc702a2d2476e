use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEntryEvent {
    Stored(EntryStoredEvent),
    Invalidated(EntryInvalidatedEvent),
    Cleared(CacheClearedEvent),
}

impl CacheEntryEvent {
    pub fn cache_name(&self) -> &str {
        match self {
            CacheEntryEvent::Stored(e) => &e.cache_name,
            CacheEntryEvent::Invalidated(e) => &e.cache_name,
            CacheEntryEvent::Cleared(e) => &e.cache_name,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            CacheEntryEvent::Stored(e) => Some(&e.key),
            CacheEntryEvent::Invalidated(e) => Some(&e.key),
            CacheEntryEvent::Cleared(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryStoredEvent {
    pub cache_name: String,
    pub key: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryInvalidatedEvent {
    pub cache_name: String,
    pub key: String,
    pub had_entry: bool,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheClearedEvent {
    pub cache_name: String,
    pub timestamp: u64,
}

/// Helper to get current timestamp in seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
