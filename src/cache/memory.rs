//! moka-backed store
//!
//! Entries remember the TTL they were written with and a moka `Expiry`
//! honours it, so bodies cached with different lifetimes share one bounded
//! store.

use anyhow::Result;
use async_trait::async_trait;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{glob, CacheLayer};

const DEFAULT_MAX_ENTRIES: u64 = 10_000;
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
struct Entry {
    body: Arc<str>,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    // A rewrite starts a fresh lifetime
    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

pub struct MemoryCache {
    entries: moka::future::Cache<String, Entry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_entries: u64, default_ttl: Duration) -> Self {
        let entries = moka::future::Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryTtl)
            .build();
        Self {
            entries,
            default_ttl,
        }
    }

    /// Approximate; pending evictions may not be counted yet
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Run moka's deferred housekeeping now
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.body.to_string()))
    }

    async fn store(&self, key: &str, body: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            body: Arc::from(body),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    /// Scans every key; fine at the sizes this store is bounded to.
    async fn purge(&self, pattern: &str) -> Result<u64> {
        let doomed: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(key, _)| glob::matches(pattern, key))
            .map(|(key, _)| key)
            .collect();

        for key in &doomed {
            self.entries.invalidate(key.as_str()).await;
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Option<Duration> = Some(Duration::from_secs(60));

    #[tokio::test]
    async fn test_store_and_fetch() {
        let cache = MemoryCache::new();
        assert_eq!(cache.fetch("resp:1:/api/tasks").await.unwrap(), None);

        cache.store("resp:1:/api/tasks", r#"{"success":true}"#, MINUTE).await.unwrap();
        assert_eq!(
            cache.fetch("resp:1:/api/tasks").await.unwrap().as_deref(),
            Some(r#"{"success":true}"#)
        );
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let cache = MemoryCache::new();
        cache.store("k", "old", MINUTE).await.unwrap();
        cache.store("k", "new", MINUTE).await.unwrap();
        assert_eq!(cache.fetch("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_entries_expire_on_their_own_ttl() {
        let cache = MemoryCache::new();
        cache.store("short", "a", Some(Duration::from_millis(20))).await.unwrap();
        cache.store("long", "b", MINUTE).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.sync().await;

        assert_eq!(cache.fetch("short").await.unwrap(), None);
        assert_eq!(cache.fetch("long").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_default_ttl_applies_without_explicit_ttl() {
        let cache = MemoryCache::with_capacity_and_ttl(100, Duration::from_millis(20));
        cache.store("k", "v", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.sync().await;

        assert_eq!(cache.fetch("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rewrite_restarts_ttl() {
        let cache = MemoryCache::new();
        cache.store("k", "old", Some(Duration::from_millis(20))).await.unwrap();
        cache.store("k", "new", MINUTE).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.sync().await;

        assert_eq!(cache.fetch("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_purge() {
        let cache = MemoryCache::new();
        cache.store("resp:1:/api/tasks", "a", MINUTE).await.unwrap();
        cache.store("resp:2:/api/tasks?mood=happy", "b", MINUTE).await.unwrap();
        cache.store("resp:anon:/api/blogs", "c", MINUTE).await.unwrap();

        assert_eq!(cache.purge("*/api/tasks*").await.unwrap(), 2);
        assert_eq!(cache.fetch("resp:1:/api/tasks").await.unwrap(), None);
        assert_eq!(cache.fetch("resp:anon:/api/blogs").await.unwrap().as_deref(), Some("c"));

        assert_eq!(cache.purge("*").await.unwrap(), 1);
        assert_eq!(cache.fetch("resp:anon:/api/blogs").await.unwrap(), None);
    }
}
