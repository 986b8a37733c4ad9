//! Persistent file cache with cache-aware content loading
//!
//! [`FileCacheStore`] maps remote URIs to files in a cache directory, keeps a
//! JSON index of them that survives restarts, and fetches content on a miss.
//! [`CacheAwareLoader`] wraps any [`ContentLoader`] so that loads go through
//! the cache when one is configured, falling back to direct loading whenever
//! the cache cannot help.

mod error;
mod index;
mod loader;
mod paths;
mod service;
mod store;
mod types;

#[cfg(test)]
mod testing;

pub use content_loader::{ContentLoader, LoadResponse};
pub use error::{CacheError, Result};
pub use index::{CacheIndex, INDEX_VERSION};
pub use loader::CacheAwareLoader;
pub use paths::derive_file_name;
pub use service::CacheService;
pub use store::FileCacheStore;
pub use types::{parse_bool, CacheConfig, CacheEntry, CacheStats};
