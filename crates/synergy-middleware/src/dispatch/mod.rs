//! Controller resolution: registry, resolution cache and the dispatcher.

pub mod cache;
pub mod dispatcher;
pub mod registry;

pub use cache::{CacheConfig, CacheStats, ResolutionCache};
pub use dispatcher::Dispatcher;
pub use registry::ControllerRegistry;
