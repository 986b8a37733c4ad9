//! Content loading that goes through the cache when one is available

use async_trait::async_trait;
use content_loader::{ContentLoader, DefaultContentLoader, LoadResponse};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::service::CacheService;

/// Loads content through a [`CacheService`], falling back to the raw loader
///
/// Caching is best effort: whenever the cache cannot produce a local copy,
/// the original URI is loaded directly. Callers get the same
/// [`LoadResponse`] either way.
pub struct CacheAwareLoader {
    cache: Option<Arc<dyn CacheService>>,
    inner: Arc<dyn ContentLoader>,
}

impl CacheAwareLoader {
    /// `inner` must handle both remote URIs and local paths
    pub fn new(cache: Option<Arc<dyn CacheService>>, inner: Arc<dyn ContentLoader>) -> Self {
        Self { cache, inner }
    }

    /// Use a [`DefaultContentLoader`] as the raw loader
    pub fn with_default_loader(cache: Option<Arc<dyn CacheService>>) -> Self {
        Self::new(cache, Arc::new(DefaultContentLoader::new()))
    }

    /// A loader that never consults a cache
    pub fn uncached(inner: Arc<dyn ContentLoader>) -> Self {
        Self::new(None, inner)
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheService>> {
        self.cache.as_ref()
    }

    /// Local path for `uri`, populating the cache on a miss
    async fn resolve(&self, cache: &dyn CacheService, uri: &str) -> Option<PathBuf> {
        if cache.is_cached(uri).await {
            match cache.cached_location(uri).await {
                Ok(path) => return Some(path),
                // Evicted between the two calls
                Err(e) => debug!(uri = %uri, error = %e, "Cached entry vanished"),
            }
        }

        cache.add_or_update(uri).await
    }
}

#[async_trait]
impl ContentLoader for CacheAwareLoader {
    async fn load(&self, uri: &str) -> LoadResponse {
        let Some(cache) = self.cache.as_deref() else {
            return self.inner.load(uri).await;
        };

        let Some(path) = self.resolve(cache, uri).await else {
            debug!(uri = %uri, "Cache unavailable for uri, loading directly");
            return self.inner.load(uri).await;
        };

        let response = self.inner.load(&path.to_string_lossy()).await;
        if response.success {
            return response;
        }

        warn!(
            uri = %uri,
            path = %path.display(),
            error = response.error_message.as_deref().unwrap_or("unknown error"),
            "Failed to load cached copy, loading directly"
        );
        self.inner.load(uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileCacheStore;
    use crate::testing::RecordingLoader;
    use crate::types::CacheConfig;
    use content_loader::FileContentLoader;
    use std::path::Path;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URI: &str = "http://x/a.txt";

    async fn store_with(dir: &Path, loader: Arc<RecordingLoader>) -> Arc<FileCacheStore> {
        Arc::new(
            FileCacheStore::open(CacheConfig::new(dir), loader)
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_no_cache_matches_raw_loader() {
        let raw = Arc::new(RecordingLoader::new().with(URI, b"hello"));
        let loader = CacheAwareLoader::uncached(raw.clone());

        let response = loader.load(URI).await;

        assert_eq!(response, raw.load(URI).await);
        assert_eq!(raw.calls(), vec![URI.to_string(), URI.to_string()]);
    }

    #[tokio::test]
    async fn test_second_load_served_from_cache() {
        let dir = tempdir().unwrap();
        let raw = Arc::new(RecordingLoader::new().with(URI, b"hello"));
        let store = store_with(dir.path(), raw.clone()).await;
        let loader = CacheAwareLoader::new(Some(store.clone()), raw.clone());

        let first = loader.load(URI).await;
        assert!(first.success);
        assert_eq!(first.text(), Some("hello"));

        let local = store.cached_location(URI).await.unwrap();
        let local = local.to_string_lossy().into_owned();
        assert_eq!(raw.calls(), vec![URI.to_string(), local.clone()]);

        let second = loader.load(URI).await;
        assert_eq!(second.text(), Some("hello"));
        assert_eq!(raw.calls(), vec![URI.to_string(), local.clone(), local]);
        assert_eq!(raw.count_for(URI), 1);
    }

    #[tokio::test]
    async fn test_populate_failure_falls_back_to_direct_load() {
        let dir = tempdir().unwrap();
        // The store's loader cannot fetch anything
        let failing = Arc::new(RecordingLoader::new());
        let store = store_with(dir.path(), failing.clone()).await;
        let raw = Arc::new(RecordingLoader::new().with(URI, b"direct"));
        let loader = CacheAwareLoader::new(Some(store.clone()), raw.clone());

        let response = loader.load(URI).await;

        assert!(response.success);
        assert_eq!(response.text(), Some("direct"));
        assert_eq!(failing.count_for(URI), 1);
        assert_eq!(raw.calls(), vec![URI.to_string()]);
        assert!(!store.is_cached(URI).await);
    }

    #[tokio::test]
    async fn test_failure_everywhere_reports_failure() {
        let dir = tempdir().unwrap();
        let raw = Arc::new(RecordingLoader::new());
        let store = store_with(dir.path(), raw.clone()).await;
        let loader = CacheAwareLoader::new(Some(store), raw);

        let response = loader.load(URI).await;

        assert!(!response.success);
        assert_eq!(response.status, Some(404));
    }

    #[tokio::test]
    async fn test_unreadable_cached_copy_falls_back_to_direct_load() {
        let dir = tempdir().unwrap();
        let raw = Arc::new(RecordingLoader::new().with(URI, b"hello"));
        let store = store_with(dir.path(), raw.clone()).await;

        struct RemoteOnly(Arc<RecordingLoader>);

        #[async_trait]
        impl ContentLoader for RemoteOnly {
            async fn load(&self, identifier: &str) -> LoadResponse {
                if identifier.starts_with("http://") {
                    self.0.load(identifier).await
                } else {
                    LoadResponse::failed("local reads disabled")
                }
            }
        }

        let loader = CacheAwareLoader::new(Some(store), Arc::new(RemoteOnly(raw.clone())));
        let response = loader.load(URI).await;

        assert_eq!(response.text(), Some("hello"));
        // Once to populate, once for the fallback
        assert_eq!(raw.count_for(URI), 2);
    }

    #[tokio::test]
    async fn test_externally_deleted_copy_is_refetched() {
        let dir = tempdir().unwrap();
        let raw = Arc::new(RecordingLoader::new().with(URI, b"hello"));
        let store = store_with(dir.path(), raw.clone()).await;
        let loader = CacheAwareLoader::new(Some(store.clone()), raw.clone());

        loader.load(URI).await;
        std::fs::remove_file(store.cached_location(URI).await.unwrap()).unwrap();

        let response = loader.load(URI).await;
        assert_eq!(response.text(), Some("hello"));
        assert_eq!(raw.count_for(URI), 2);
        assert!(store.is_cached(URI).await);
    }

    #[tokio::test]
    async fn test_concurrent_loads_fetch_once() {
        let dir = tempdir().unwrap();
        let raw = Arc::new(
            RecordingLoader::new()
                .with(URI, b"hello")
                .with_delay(std::time::Duration::from_millis(30)),
        );
        let store = store_with(dir.path(), raw.clone()).await;
        let loader = CacheAwareLoader::new(Some(store), raw.clone());

        let responses =
            futures::future::join_all((0..4).map(|_| loader.load(URI))).await;

        assert!(responses.iter().all(|r| r.text() == Some("hello")));
        assert_eq!(raw.count_for(URI), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/cube.obj"))
            .respond_with(ResponseTemplate::new(200).set_body_string("v 1 1 1"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let raw: Arc<dyn ContentLoader> = Arc::new(DefaultContentLoader::new());
        let store = FileCacheStore::open(CacheConfig::new(dir.path()), raw.clone())
            .await
            .unwrap();
        let loader = CacheAwareLoader::new(Some(Arc::new(store)), raw);

        let uri = format!("{}/models/cube.obj", server.uri());
        for _ in 0..3 {
            let response = loader.load(&uri).await;
            assert_eq!(response.text(), Some("v 1 1 1"));
        }

        let cached: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("_cube.obj"))
            .collect();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_with_default_loader_reads_local_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("local.txt");
        std::fs::write(&file, b"local").unwrap();

        let loader = CacheAwareLoader::with_default_loader(None);
        assert!(loader.cache().is_none());

        let response = loader.load(file.to_str().unwrap()).await;
        assert_eq!(response, FileContentLoader::new().load(file.to_str().unwrap()).await);
    }
}
