//! Local file content loading

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use url::Url;

use crate::error::{LoaderError, Result};
use crate::loader::ContentLoader;
use crate::types::LoadResponse;

/// Loads content from the local filesystem
///
/// Accepts plain paths as well as `file://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentLoader;

impl FileContentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Resolve an identifier to a local path
    pub fn resolve_path(identifier: &str) -> Result<PathBuf> {
        if identifier.starts_with("file:") {
            let url = Url::parse(identifier)
                .map_err(|_| LoaderError::InvalidUri(identifier.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| LoaderError::InvalidUri(identifier.to_string()));
        }

        if identifier.is_empty() {
            return Err(LoaderError::InvalidUri(identifier.to_string()));
        }

        Ok(PathBuf::from(identifier))
    }

    async fn read(&self, identifier: &str) -> Result<Vec<u8>> {
        let path = Self::resolve_path(identifier)?;
        let data = fs::read(&path).await?;
        debug!(path = %path.display(), size = data.len(), "Read local content");
        Ok(data)
    }
}

#[async_trait]
impl ContentLoader for FileContentLoader {
    async fn load(&self, identifier: &str) -> LoadResponse {
        match self.read(identifier).await {
            Ok(data) => LoadResponse::ok(data),
            Err(e) => {
                warn!(path = %identifier, error = %e, "Failed to read local content");
                LoadResponse::from(e)
            }
        }
    }
}
