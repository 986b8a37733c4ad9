//! Persisted index of cache entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::types::CacheEntry;

pub const INDEX_VERSION: u32 = 1;

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    entries: &'a BTreeMap<String, CacheEntry>,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// Mapping from cache key to entry, persisted as a JSON manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized index
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let file: IndexFile = serde_json::from_slice(data)
            .map_err(|e| CacheError::IndexCorruption(e.to_string()))?;

        if file.version != INDEX_VERSION {
            return Err(CacheError::IndexCorruption(format!(
                "unsupported index version {}",
                file.version
            )));
        }

        // Entries are keyed by their own key; anything else is a damaged record
        let entries = file
            .entries
            .into_iter()
            .filter(|(key, entry)| key == &entry.key)
            .collect();

        Ok(Self { entries })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let file = IndexFileRef {
            version: INDEX_VERSION,
            entries: &self.entries,
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    /// Load the index at `path`
    ///
    /// A missing file yields an empty index. An unreadable or malformed file
    /// also yields an empty index, logged as a warning.
    pub async fn load(path: &Path) -> Self {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache index found, starting empty");
                return Self::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache index, starting empty");
                return Self::new();
            }
        };

        match Self::from_slice(&data) {
            Ok(index) => {
                debug!(path = %path.display(), entries = index.len(), "Loaded cache index");
                index
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding cache index");
                Self::new()
            }
        }
    }

    /// Write the index to `path` atomically
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = self.to_vec()?;
        let tmp_path = temp_path_for(path);

        if let Err(e) = fs::write(&tmp_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), entries = self.len(), "Saved cache index");
        Ok(())
    }

    /// Drop entries whose backing file is gone or that have expired
    ///
    /// Returns the removed entries.
    pub async fn prune(&mut self, ttl: Option<Duration>, now: DateTime<Utc>) -> Vec<CacheEntry> {
        let mut stale = Vec::new();
        for (key, entry) in &self.entries {
            // Only a confirmed absence counts as missing
            let missing = matches!(fs::try_exists(&entry.local_path).await, Ok(false));
            if missing || entry.is_expired(ttl, now) {
                stale.push(key.clone());
            }
        }

        stale
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert or replace an entry, returning the previous one
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<CacheEntry> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.values().filter_map(|e| e.size_bytes).sum()
    }

    /// Key of the least recently updated entry, skipping `except`
    pub fn oldest_key(&self, except: &str) -> Option<String> {
        self.entries
            .values()
            .filter(|e| e.key != except)
            .min_by_key(|e| e.last_updated)
            .map(|e| e.key.clone())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
