// atrium/src/lib.rs
pub mod domain;
pub mod events;
pub mod keys;
pub mod planes;
pub mod ports;

pub use keys::CacheKey;
pub use planes::control::{CacheControl, CacheRegistry};
pub use planes::data::ReadThroughCache;
