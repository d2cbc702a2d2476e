// shared/src/lib.rs
use std::time::Duration;

/// Errors shared across the workspace.
///
/// The enum is `Clone` because a single fetch outcome is handed to every
/// caller that was waiting on the same in-flight read.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
    #[error("backend: {0}")]
    Backend(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlMs(pub u64);

impl TtlMs {
    /// Caching disabled: every read delegates to the source.
    pub const ZERO: TtlMs = TtlMs(0);

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<TtlMs> for Duration {
    fn from(ttl: TtlMs) -> Self {
        ttl.as_duration()
    }
}

pub mod config;
