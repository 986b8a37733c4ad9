//! Test helpers

use async_trait::async_trait;
use content_loader::{ContentLoader, FileContentLoader, LoadResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A loader that serves canned remote content, reads local files, and
/// records every identifier it was asked for
#[derive(Default)]
pub(crate) struct RecordingLoader {
    remote: HashMap<String, Vec<u8>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl RecordingLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, uri: &str, content: &[u8]) -> Self {
        self.remote.insert(uri.to_string(), content.to_vec());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_for(&self, identifier: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == identifier)
            .count()
    }
}

#[async_trait]
impl ContentLoader for RecordingLoader {
    async fn load(&self, identifier: &str) -> LoadResponse {
        self.calls.lock().unwrap().push(identifier.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(content) = self.remote.get(identifier) {
            return LoadResponse::ok(content.clone());
        }

        if identifier.starts_with("http://") || identifier.starts_with("https://") {
            return LoadResponse::failed("Server returned status 404").with_status(404);
        }

        FileContentLoader::new().load(identifier).await
    }
}
