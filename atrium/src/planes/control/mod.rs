pub mod operation;
pub mod registry;

pub use operation::CacheControl;
pub use registry::CacheRegistry;
