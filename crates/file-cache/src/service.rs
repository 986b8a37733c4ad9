//! The cache service capability consumed by [`crate::CacheAwareLoader`]

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;

/// Maps remote URIs to local cached files
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Whether `key` has a valid entry whose file exists right now
    async fn is_cached(&self, key: &str) -> bool;

    /// Local path of a cached key, `CacheError::NotCached` otherwise
    async fn cached_location(&self, key: &str) -> Result<PathBuf>;

    /// Fetch and store `key` if it is not cached yet
    ///
    /// Returns the local path, or `None` if the content could not be cached.
    async fn add_or_update(&self, key: &str) -> Option<PathBuf>;
}
