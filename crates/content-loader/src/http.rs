//! HTTP(S) content loading

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};
use crate::loader::ContentLoader;
use crate::types::LoadResponse;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "content-loader-rs/0.1";

/// Loads content from HTTP(S) URLs
pub struct HttpContentLoader {
    client: Client,
}

impl HttpContentLoader {
    /// Create a loader with the default timeout and user agent
    pub fn new() -> Self {
        Self::with_config(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
            .expect("Failed to create HTTP client")
    }

    /// Create a loader with a custom request timeout and user agent
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Use an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching remote content");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(LoaderError::Status(response.status().as_u16()));
        }

        let data = response.bytes().await?.to_vec();
        debug!(url = %url, size = data.len(), "Fetched remote content");
        Ok(data)
    }
}

impl Default for HttpContentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentLoader for HttpContentLoader {
    async fn load(&self, identifier: &str) -> LoadResponse {
        match self.fetch(identifier).await {
            Ok(data) => LoadResponse::ok(data).with_status(200),
            Err(e) => {
                warn!(url = %identifier, error = %e, "Failed to fetch remote content");
                LoadResponse::from(e)
            }
        }
    }
}
