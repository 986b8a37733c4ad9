use content_loader::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use file_cache::{parse_bool, CacheConfig};
use std::env;
use std::time::Duration;

/// What to print for each loaded URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One status line per URI
    Summary,
    /// The raw content of a single URI on stdout
    Body,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "summary" => Some(Self::Summary),
            "body" => Some(Self::Body),
            _ => None,
        }
    }
}

/// Configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub cache: CacheConfig,
    pub cache_enabled: bool,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub output: OutputMode,
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let cache_enabled = !env::var("CACHE_DISABLED")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(false);

        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let user_agent =
            env::var("HTTP_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let output = env::var("CACHE_FETCH_OUTPUT")
            .ok()
            .and_then(|s| OutputMode::parse(&s))
            .unwrap_or(OutputMode::Summary);

        Self {
            cache: CacheConfig::from_env(),
            cache_enabled,
            http_timeout,
            user_agent,
            output,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            cache_enabled: true,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output: OutputMode::Summary,
        }
    }
}
