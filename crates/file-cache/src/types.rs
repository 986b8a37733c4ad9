//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INDEX_FILE: &str = "index.json";
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 1024 * 1024 * 1024; // 1GB
pub const DEFAULT_ENTRY_TTL_SECS: u64 = 365 * 24 * 60 * 60; // 365 days

/// Metadata for a cached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The remote URI this entry was fetched from
    pub key: String,
    pub local_path: PathBuf,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl CacheEntry {
    /// Whether the entry is older than `ttl` at `now`
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        let age_secs = (now - self.last_updated).num_seconds().max(0) as u64;
        age_secs > ttl.as_secs()
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    /// Fetches issued to the raw loader
    pub fetches: u64,
    pub fetch_failures: u64,
}

/// Configuration for a [`crate::FileCacheStore`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    /// Name of the index manifest inside `cache_dir`
    pub index_file_name: String,
    /// Maximum total size of cached files in bytes, 0 for unbounded
    pub max_size: u64,
    /// How long an entry stays valid, `None` for forever
    pub entry_ttl: Option<Duration>,
    /// When false the cache is cleared every time the store is opened
    pub session_persistence: bool,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let index_file_name = env::var("CACHE_INDEX_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.index_file_name);

        let max_size = env::var("MAX_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.max_size);

        let entry_ttl = match env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.entry_ttl,
        };

        let session_persistence = env::var("CACHE_SESSION_PERSISTENCE")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(defaults.session_persistence);

        Self {
            cache_dir,
            index_file_name,
            max_size,
            entry_ttl,
            session_persistence,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join(&self.index_file_name)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/content"),
            index_file_name: DEFAULT_INDEX_FILE.to_string(),
            max_size: DEFAULT_MAX_CACHE_SIZE,
            entry_ttl: Some(Duration::from_secs(DEFAULT_ENTRY_TTL_SECS)),
            session_persistence: true,
        }
    }
}

/// Parse a boolean environment value such as `true`, `0`, `yes` or `off`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
