//! Load result types

use crate::error::LoaderError;

/// Outcome of loading a single identifier
///
/// Loaders report failures through this type rather than `Err`, so callers
/// get the same shape whether content came from the network, a local file
/// or a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResponse {
    pub success: bool,
    pub content: Vec<u8>,
    pub error_message: Option<String>,
    /// HTTP status code, when the content came over HTTP
    pub status: Option<u16>,
}

impl LoadResponse {
    /// A successful response carrying `content`
    pub fn ok(content: Vec<u8>) -> Self {
        Self {
            success: true,
            content,
            error_message: None,
            status: None,
        }
    }

    /// A failed response with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: Vec::new(),
            error_message: Some(message.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl From<LoaderError> for LoadResponse {
    fn from(err: LoaderError) -> Self {
        let status = err.status();
        let mut response = LoadResponse::failed(err.to_string());
        response.status = status;
        response
    }
}
