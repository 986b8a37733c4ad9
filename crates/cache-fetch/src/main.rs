//! cache-fetch - load URIs through a persistent file cache
//!
//! Each URI given on the command line is loaded through the cache-aware
//! loader. Remote content is cached under `CACHE_DIR` and served from there
//! on later runs.

mod config;
mod error;

use crate::config::{FetchConfig, OutputMode};
use crate::error::{CliError, Result};
use content_loader::{ContentLoader, DefaultContentLoader, HttpContentLoader};
use file_cache::{CacheAwareLoader, CacheService, FileCacheStore};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("cache_fetch=info".parse()?)
        .add_directive("file_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let uris: Vec<String> = std::env::args().skip(1).collect();
    if uris.is_empty() {
        return Err(CliError::Config("usage: cache-fetch <uri>...".to_string()));
    }

    let config = FetchConfig::from_env();
    if config.output == OutputMode::Body && uris.len() != 1 {
        return Err(CliError::Config(
            "CACHE_FETCH_OUTPUT=body takes exactly one URI".to_string(),
        ));
    }

    let mut stdout = std::io::stdout().lock();
    let failures = run(&config, &uris, &mut stdout).await?;
    stdout.flush()?;

    if failures > 0 {
        return Err(CliError::LoadFailed(failures));
    }
    Ok(())
}

/// Load every URI and report to `out`, returning how many failed
async fn run(config: &FetchConfig, uris: &[String], out: &mut impl Write) -> Result<usize> {
    let http = HttpContentLoader::with_config(config.http_timeout, &config.user_agent)?;
    let raw: Arc<dyn ContentLoader> = Arc::new(DefaultContentLoader::with_http(http));

    let store = if config.cache_enabled {
        match FileCacheStore::open(config.cache.clone(), raw.clone()).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(
                    cache_dir = %config.cache.cache_dir.display(),
                    error = %e,
                    "Cache unavailable, loading directly"
                );
                None
            }
        }
    } else {
        info!("Cache disabled");
        None
    };

    let cache = store
        .clone()
        .map(|store| store as Arc<dyn CacheService>);
    let loader = CacheAwareLoader::new(cache, raw);

    let responses = futures::future::join_all(uris.iter().map(|uri| loader.load(uri))).await;

    let mut failures = 0;
    for (uri, response) in uris.iter().zip(&responses) {
        if !response.success {
            failures += 1;
        }

        match config.output {
            OutputMode::Body if response.success => out.write_all(&response.content)?,
            _ if response.success => {
                writeln!(out, "OK\t{}\t{}", response.content.len(), uri)?;
            }
            _ => {
                let message = response.error_message.as_deref().unwrap_or("unknown error");
                writeln!(out, "FAILED\t{}\t{}", uri, message)?;
            }
        }
    }

    if let Some(store) = store {
        let stats = store.stats().await;
        info!(
            entries = stats.entries,
            total_size = stats.total_size,
            hits = stats.hits,
            misses = stats.misses,
            fetches = stats.fetches,
            "Cache stats"
        );
    }

    Ok(failures)
}
