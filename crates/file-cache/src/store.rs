//! Persistent file cache keyed by URI

use async_trait::async_trait;
use chrono::Utc;
use content_loader::ContentLoader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::index::CacheIndex;
use crate::paths::{derive_file_name, is_partial_file_name, partial_path_for};
use crate::service::CacheService;
use crate::types::{CacheConfig, CacheEntry, CacheStats};

type KeyLock = Arc<Mutex<Option<String>>>;

/// A file cache that maps URIs to files in a cache directory
///
/// The index is loaded and validated when the store is opened and written
/// back after every mutation. Fetches for the same key are serialized, so
/// concurrent callers trigger at most one download per key.
pub struct FileCacheStore {
    config: CacheConfig,
    index_path: PathBuf,
    index: RwLock<CacheIndex>,
    /// Per-key locks for in-flight population, holding the last failure
    /// so queued callers do not repeat it
    in_flight: Mutex<HashMap<String, KeyLock>>,
    loader: Arc<dyn ContentLoader>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
}

impl FileCacheStore {
    /// Open (or create) the cache described by `config`
    ///
    /// Content is fetched through `loader` on a miss.
    pub async fn open(config: CacheConfig, loader: Arc<dyn ContentLoader>) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir).await?;

        let index_path = config.index_path();
        remove_leftovers(&config.cache_dir, &index_path).await;

        let mut index = CacheIndex::load(&index_path).await;
        let loaded = index.len();

        let mut stale = if config.session_persistence {
            Vec::new()
        } else {
            index.drain()
        };
        stale.extend(index.prune(config.entry_ttl, Utc::now()).await);
        for entry in &stale {
            let _ = fs::remove_file(&entry.local_path).await;
        }

        remove_orphans(&config.cache_dir, &index).await;

        if !stale.is_empty() {
            if let Err(e) = index.save(&index_path).await {
                warn!(path = %index_path.display(), error = %e, "Failed to save pruned cache index");
            }
        }

        info!(
            cache_dir = %config.cache_dir.display(),
            entries = index.len(),
            dropped = loaded - index.len(),
            "File cache opened"
        );

        Ok(Self {
            config,
            index_path,
            index: RwLock::new(index),
            in_flight: Mutex::new(HashMap::new()),
            loader,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Whether `key` has an entry whose file exists and has not expired
    pub async fn is_cached(&self, key: &str) -> bool {
        let cached = self.valid_entry(key).await.is_some();
        if cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss");
        }
        cached
    }

    /// Local path of a cached key
    pub async fn cached_location(&self, key: &str) -> Result<PathBuf> {
        self.valid_entry(key)
            .await
            .map(|entry| entry.local_path)
            .ok_or_else(|| CacheError::NotCached(key.to_string()))
    }

    /// Fetch and store `key` unless it is already cached
    ///
    /// Returns `None` when the content could not be fetched or stored. In
    /// that case no entry is added and no file is left behind.
    pub async fn add_or_update(&self, key: &str) -> Option<PathBuf> {
        match self.try_add_or_update(key).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache content");
                None
            }
        }
    }

    /// Like [`Self::add_or_update`] but reports why caching failed
    pub async fn try_add_or_update(&self, key: &str) -> Result<PathBuf> {
        let key_lock = self.key_lock(key).await;
        let result = {
            let mut failure = key_lock.lock().await;
            if let Some(message) = failure.clone() {
                // The caller we waited on already failed for this key
                Err(CacheError::Fetch(message))
            } else {
                let result = self.populate(key).await;
                if let Err(e) = &result {
                    *failure = Some(e.to_string());
                }
                result
            }
        };
        self.release_key_lock(key, key_lock).await;
        result
    }

    /// Remove an entry and its file, returns whether it existed
    pub async fn evict(&self, key: &str) -> Result<bool> {
        let mut index = self.index.write().await;
        let Some(entry) = index.remove(key) else {
            return Ok(false);
        };

        remove_file_quietly(&entry.local_path).await;
        index.save(&self.index_path).await?;
        debug!(key = %key, "Evicted cache entry");
        Ok(true)
    }

    /// Remove every entry and its file
    pub async fn clear(&self) -> Result<()> {
        let mut index = self.index.write().await;
        let removed = index.drain();
        for entry in &removed {
            remove_file_quietly(&entry.local_path).await;
        }
        index.save(&self.index_path).await?;
        info!(removed = removed.len(), "Cleared file cache");
        Ok(())
    }

    /// Remove expired entries and entries whose file is gone
    ///
    /// Returns how many entries were removed.
    pub async fn remove_expired(&self) -> Result<usize> {
        let mut index = self.index.write().await;
        let removed = index.prune(self.config.entry_ttl, Utc::now()).await;
        if removed.is_empty() {
            return Ok(0);
        }

        for entry in &removed {
            remove_file_quietly(&entry.local_path).await;
        }
        index.save(&self.index_path).await?;
        debug!(removed = removed.len(), "Removed expired cache entries");
        Ok(removed.len())
    }

    /// Snapshot of the current entries
    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.index.read().await.entries().cloned().collect()
    }

    pub async fn stats(&self) -> CacheStats {
        let index = self.index.read().await;
        CacheStats {
            entries: index.len(),
            total_size: index.total_size(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }

    /// The entry for `key` if it is still valid, purging it otherwise
    async fn valid_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.index.read().await.get(key).cloned()?;

        let exists = match fs::try_exists(&entry.local_path).await {
            Ok(exists) => exists,
            Err(e) => {
                // Unknown state: report a miss but keep the entry and its file
                warn!(key = %key, path = %entry.local_path.display(), error = %e, "Failed to check cached file");
                return None;
            }
        };
        if exists && !entry.is_expired(self.config.entry_ttl, Utc::now()) {
            return Some(entry);
        }

        debug!(key = %key, exists, "Cache entry is stale");
        self.purge(&entry).await;
        None
    }

    /// Drop a stale entry unless it was replaced in the meantime
    async fn purge(&self, stale: &CacheEntry) {
        let mut index = self.index.write().await;
        if index.get(&stale.key) != Some(stale) {
            return;
        }

        index.remove(&stale.key);
        remove_file_quietly(&stale.local_path).await;
        if let Err(e) = index.save(&self.index_path).await {
            warn!(key = %stale.key, error = %e, "Failed to save cache index after purge");
        }
    }

    async fn populate(&self, key: &str) -> Result<PathBuf> {
        // A concurrent caller may have finished while we waited for the lock
        if let Some(entry) = self.valid_entry(key).await {
            debug!(key = %key, "Already cached");
            return Ok(entry.local_path);
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let response = self.loader.load(key).await;
        if !response.success {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            let message = response
                .error_message
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(CacheError::Fetch(message));
        }

        let path = self.config.cache_dir.join(derive_file_name(key));

        // Held from the write until the index is saved, so an abandoned
        // populate never leaves an unindexed file behind
        let mut index = self.index.write().await;
        let stored = RemoveOnDrop::new(path.clone());
        write_file(&path, &response.content).await?;

        let entry = CacheEntry {
            key: key.to_string(),
            local_path: path.clone(),
            last_updated: Utc::now(),
            size_bytes: Some(response.content.len() as u64),
        };

        let previous = index.insert(entry);
        let evicted = self.evict_over_limit(&mut index, key);

        if let Err(e) = index.save(&self.index_path).await {
            index.remove(key);
            if let Some(previous) = previous {
                index.insert(previous);
            }
            for entry in evicted {
                index.insert(entry);
            }
            return Err(e);
        }
        stored.disarm();

        for entry in &evicted {
            remove_file_quietly(&entry.local_path).await;
            debug!(key = %entry.key, "Evicted oldest cache entry");
        }

        debug!(
            key = %key,
            path = %path.display(),
            size = response.content.len(),
            "Cached content"
        );
        Ok(path)
    }

    /// Take entries out of the index until it fits the size limit
    fn evict_over_limit(&self, index: &mut CacheIndex, keep: &str) -> Vec<CacheEntry> {
        let mut evicted = Vec::new();
        if self.config.max_size == 0 {
            return evicted;
        }

        while index.total_size() > self.config.max_size {
            let Some(oldest) = index.oldest_key(keep) else {
                break;
            };
            if let Some(entry) = index.remove(&oldest) {
                evicted.push(entry);
            }
        }
        evicted
    }

    async fn key_lock(&self, key: &str) -> KeyLock {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    async fn release_key_lock(&self, key: &str, key_lock: KeyLock) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference held by the registry and one by us means nobody is waiting
        if Arc::strong_count(&key_lock) <= 2 {
            in_flight.remove(key);
        }
    }
}

#[async_trait]
impl CacheService for FileCacheStore {
    async fn is_cached(&self, key: &str) -> bool {
        FileCacheStore::is_cached(self, key).await
    }

    async fn cached_location(&self, key: &str) -> Result<PathBuf> {
        FileCacheStore::cached_location(self, key).await
    }

    async fn add_or_update(&self, key: &str) -> Option<PathBuf> {
        FileCacheStore::add_or_update(self, key).await
    }
}

/// Removes a file when dropped unless disarmed
struct RemoveOnDrop {
    path: PathBuf,
    armed: bool,
}

impl RemoveOnDrop {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Write `data` to `path` via a partial file and rename
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let partial = RemoveOnDrop::new(partial_path_for(path));
    fs::write(&partial.path, data).await?;
    fs::rename(&partial.path, path).await?;
    partial.disarm();
    Ok(())
}

async fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove cached file");
        }
    }
}

/// Remove partial downloads and index temp files from interrupted runs
async fn remove_leftovers(cache_dir: &Path, index_path: &Path) {
    let mut index_tmp = index_path.as_os_str().to_os_string();
    index_tmp.push(".tmp");
    let _ = fs::remove_file(PathBuf::from(index_tmp)).await;

    let Ok(mut read_dir) = fs::read_dir(cache_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let name = entry.file_name();
        if is_partial_file_name(&name.to_string_lossy()) {
            debug!(path = %entry.path().display(), "Removing partial download");
            let _ = fs::remove_file(entry.path()).await;
        }
    }
}

/// Remove cache files that no index entry refers to
async fn remove_orphans(cache_dir: &Path, index: &CacheIndex) {
    let Ok(mut read_dir) = fs::read_dir(cache_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let path = entry.path();
        let name = entry.file_name();
        if !looks_like_cache_file(&name.to_string_lossy()) {
            continue;
        }
        if !index
            .entries()
            .any(|e| e.local_path.file_name() == Some(name.as_os_str()))
        {
            debug!(path = %path.display(), "Removing orphaned cache file");
            let _ = fs::remove_file(&path).await;
        }
    }
}

fn looks_like_cache_file(name: &str) -> bool {
    let hash = name.get(..64).unwrap_or("");
    let rest = &name[hash.len()..];
    hash.len() == 64
        && hash.chars().all(|c| c.is_ascii_hexdigit())
        && (rest.is_empty() || rest.starts_with('_'))
}
