//! Error types for cache-fetch

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Loader(content_loader::LoaderError),
    Io(Box<std::io::Error>),
    /// Number of URIs that could not be loaded
    LoadFailed(usize),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Loader(err) => write!(f, "Loader error: {}", err),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::LoadFailed(count) => write!(f, "{} load(s) failed", count),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Loader(err) => Some(err),
            CliError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<content_loader::LoaderError> for CliError {
    fn from(err: content_loader::LoaderError) -> Self {
        CliError::Loader(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for CliError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        CliError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
