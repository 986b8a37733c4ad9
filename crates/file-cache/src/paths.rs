//! Derivation of cache file names from keys

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

const MAX_SUFFIX_LEN: usize = 64;
const PARTIAL_SUFFIX: &str = ".part";

/// Derive a filesystem-safe, collision-free file name for a cache key
///
/// The name is the SHA-256 of the key in hex, followed by `_` and a
/// sanitized copy of the URI's last path segment when there is one.
pub fn derive_file_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = hex::encode(hasher.finalize());

    match last_segment(key).and_then(|s| sanitize(&s)) {
        Some(suffix) => format!("{}_{}", hash, suffix),
        None => hash,
    }
}

/// Path of the in-progress download for a final cache path
pub(crate) fn partial_path_for(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Whether a file name is a leftover in-progress download
pub(crate) fn is_partial_file_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX)
}

fn last_segment(key: &str) -> Option<String> {
    let raw = match Url::parse(key) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| s.to_string()),
        Err(_) => key
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .last()
            .map(|s| s.to_string()),
    }?;

    let decoded = urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    Some(decoded)
}

fn sanitize(segment: &str) -> Option<String> {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.chars().all(|c| c == '_' || c == '.') {
        return None;
    }

    // Keep the tail so the extension survives truncation
    let start = trimmed.len().saturating_sub(MAX_SUFFIX_LEN);
    Some(trimmed[start..].to_string())
}
