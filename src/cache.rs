//! Provider response cache.
//!
//! Sits beneath every provider call site: entries are keyed by
//! (provider, normalized subject) and stored as JSON files with a fixed
//! TTL. A hit skips the network call and counts toward savings metrics;
//! entries are never updated in place, only superseded after expiry.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Current cache entry format version - bump when making breaking changes
pub const CACHE_VERSION: u32 = 1;

/// One cached provider response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_version: u32,
    pub provider: String,
    pub subject: String,
    /// Unix timestamp when the entry was stored
    pub stored_at: u64,
    pub ttl_secs: u64,
    pub payload: serde_json::Value,
}

impl CacheEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.stored_at) > self.ttl_secs
    }
}

/// File-backed response cache with hit/miss counters
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn entry_path(&self, provider: &str, subject: &str) -> PathBuf {
        let key = format!("{}__{}", sanitize(provider), sanitize(subject));
        self.dir.join(format!("{}.json", key))
    }

    /// Read a live entry for (provider, subject); expired or unreadable
    /// entries count as misses.
    pub async fn get(&self, provider: &str, subject: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(provider, subject);
        let content = tokio::fs::read_to_string(&path).await.ok()?;

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Invalid cache entry at {:?}: {}", path, e);
                return None;
            }
        };

        if entry.cache_version != CACHE_VERSION {
            debug!("Cache version mismatch for {}/{}, ignoring", provider, subject);
            return None;
        }

        if entry.is_expired(unix_now()) {
            debug!("Cache entry expired for {}/{}", provider, subject);
            return None;
        }

        Some(entry.payload)
    }

    /// Store a payload for (provider, subject) using atomic write
    /// (temp file then rename, so an interrupt never corrupts an entry)
    pub async fn put(&self, provider: &str, subject: &str, payload: serde_json::Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create cache directory")?;

        let entry = CacheEntry {
            cache_version: CACHE_VERSION,
            provider: provider.to_string(),
            subject: subject.to_string(),
            stored_at: unix_now(),
            ttl_secs: self.ttl.as_secs(),
            payload,
        };

        let path = self.entry_path(provider, subject);
        let temp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(&entry)?;

        tokio::fs::write(&temp_path, content)
            .await
            .context("Failed to write cache entry")?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .context("Failed to finalize cache entry")?;

        Ok(())
    }

    /// Fetch-through: return the cached payload when live, otherwise run
    /// the fetch, cache its result, and return it. Counts hits and misses.
    pub async fn get_or_fetch<T, F, Fut>(&self, provider: &str, subject: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(payload) = self.get(provider, subject).await {
            if let Ok(value) = serde_json::from_value::<T>(payload) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}/{}", provider, subject);
                return Ok(value);
            }
            warn!("Cache payload for {}/{} failed to deserialize, refetching", provider, subject);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = fetch().await?;

        if let Ok(payload) = serde_json::to_value(&value) {
            if let Err(e) = self.put(provider, subject, payload).await {
                warn!("Failed to cache response for {}/{}: {}", provider, subject, e);
            }
        }

        Ok(value)
    }

    /// List all entries (provider, subject, stored_at, expired)
    pub async fn list_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut infos = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .context("Failed to read cache directory")?;

        let now = unix_now();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(cached) = serde_json::from_str::<CacheEntry>(&content) else {
                continue;
            };
            let expired = cached.is_expired(now);
            infos.push(CacheEntryInfo {
                provider: cached.provider,
                subject: cached.subject,
                stored_at: cached.stored_at,
                expired,
            });
        }

        infos.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        Ok(infos)
    }

    /// Remove all entries for a subject across providers. Returns the
    /// number of entries removed.
    pub async fn clear_subject(&self, subject: &str) -> Result<usize> {
        let target = sanitize(subject);
        let mut removed = 0;

        if !self.dir.exists() {
            return Ok(0);
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.ends_with(&format!("__{}", target)) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Remove every cache entry. Returns the number of entries removed.
    pub async fn clear_all(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Summary of one cache entry for the `cache list` command
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub provider: String,
    pub subject: String,
    pub stored_at: u64,
    pub expired: bool,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Make a key component filesystem-safe
fn sanitize(component: &str) -> String {
    component
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
