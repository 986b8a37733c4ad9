//! The content loader capability and the default dispatching loader

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::file::FileContentLoader;
use crate::http::HttpContentLoader;
use crate::types::LoadResponse;

/// Fetches the content behind an identifier
///
/// An identifier is either a remote URI or a local file path. Failures are
/// reported through [`LoadResponse`] and never panic.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, identifier: &str) -> LoadResponse;
}

#[async_trait]
impl<T: ContentLoader + ?Sized> ContentLoader for Arc<T> {
    async fn load(&self, identifier: &str) -> LoadResponse {
        (**self).load(identifier).await
    }
}

/// Routes HTTP(S) URLs to an [`HttpContentLoader`] and everything else to a
/// [`FileContentLoader`]
pub struct DefaultContentLoader {
    http: HttpContentLoader,
    file: FileContentLoader,
}

impl DefaultContentLoader {
    pub fn new() -> Self {
        Self::with_http(HttpContentLoader::new())
    }

    pub fn with_http(http: HttpContentLoader) -> Self {
        Self {
            http,
            file: FileContentLoader::new(),
        }
    }

    /// Whether an identifier should go over the network
    pub fn is_remote(identifier: &str) -> bool {
        Url::parse(identifier)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

impl Default for DefaultContentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentLoader for DefaultContentLoader {
    async fn load(&self, identifier: &str) -> LoadResponse {
        if Self::is_remote(identifier) {
            self.http.load(identifier).await
        } else {
            self.file.load(identifier).await
        }
    }
}
