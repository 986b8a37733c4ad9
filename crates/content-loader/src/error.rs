//! Error types for content loaders

use std::fmt;

#[derive(Debug)]
pub enum LoaderError {
    Http(Box<reqwest::Error>),
    Status(u16),
    Io(Box<std::io::Error>),
    InvalidUri(String),
}

impl LoaderError {
    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LoaderError::Status(code) => Some(*code),
            LoaderError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Http(err) if err.is_timeout() => write!(f, "Request timed out: {}", err),
            LoaderError::Http(err) => write!(f, "HTTP error: {}", err),
            LoaderError::Status(code) => write!(f, "Server returned status {}", code),
            LoaderError::Io(err) => write!(f, "IO error: {}", err),
            LoaderError::InvalidUri(uri) => write!(f, "Invalid URI: {}", uri),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoaderError::Http(err) => Some(err.as_ref()),
            LoaderError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(err: reqwest::Error) -> Self {
        LoaderError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
