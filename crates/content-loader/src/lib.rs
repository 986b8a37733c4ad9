//! Raw content loading
//!
//! Provides the [`ContentLoader`] capability used by the file cache, along
//! with implementations for HTTP(S) URLs, local files and a dispatcher that
//! routes between the two.

mod error;
mod file;
mod http;
mod loader;
mod types;

pub use error::{LoaderError, Result};
pub use file::FileContentLoader;
pub use http::{HttpContentLoader, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use loader::{ContentLoader, DefaultContentLoader};
pub use types::LoadResponse;
