//! Error types for the file cache

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    /// The key has no valid cache entry
    NotCached(String),
    Fetch(String),
    Io(Box<std::io::Error>),
    IndexCorruption(String),
    Serialization(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotCached(key) => write!(f, "Not cached: {}", key),
            CacheError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::IndexCorruption(msg) => write!(f, "Corrupt cache index: {}", msg),
            CacheError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
