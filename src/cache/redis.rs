//! Redis-backed store (`redis-cache` feature)
//!
//! Keys live under `taskly:` so purges never reach other applications'
//! data. Purges walk the keyspace with `SCAN MATCH`, which speaks the same
//! glob dialect as [`super::glob`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use super::CacheLayer;

const KEY_PREFIX: &str = "taskly:";
const SCAN_BATCH: usize = 100;

pub struct RedisCache {
    conn: MultiplexedConnection,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    pub async fn connect(url: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", url))?;
        tracing::debug!("Connected to Redis");
        Ok(Self { conn, default_ttl })
    }

    fn prefixed(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(Self::prefixed(key))
            .await
            .context("Redis GET failed")
    }

    async fn store(&self, key: &str, body: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        // SETEX counts whole seconds and rejects zero
        let seconds = ttl.unwrap_or(self.default_ttl).as_secs().max(1);
        let _: () = conn
            .set_ex(Self::prefixed(key), body, seconds)
            .await
            .context("Redis SETEX failed")?;
        Ok(())
    }

    async fn purge(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let pattern = Self::prefixed(pattern);
        let mut removed = 0u64;
        let mut cursor = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .context("Redis SCAN failed")?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(&keys).await.context("Redis DEL failed")?;
                removed += deleted;
            }

            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::glob;

    // cargo test --features redis-cache -- --ignored
    async fn connect() -> RedisCache {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisCache::connect(&url, Duration::from_secs(60)).await.unwrap()
    }

    #[test]
    fn test_prefixed() {
        assert_eq!(RedisCache::prefixed("resp:1:/api/tasks"), "taskly:resp:1:/api/tasks");
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_store_fetch_purge() {
        let cache = connect().await;
        cache.store("test:resp:1:/api/tasks", "a", None).await.unwrap();
        cache.store("test:resp:1:/api/tasks?page=2", "b", None).await.unwrap();
        cache.store("test:resp:1:/api/blogs", "c", None).await.unwrap();

        assert_eq!(
            cache.fetch("test:resp:1:/api/tasks").await.unwrap().as_deref(),
            Some("a")
        );

        let removed = cache.purge(&glob::contains_pattern("/api/tasks")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            cache.fetch("test:resp:1:/api/blogs").await.unwrap().as_deref(),
            Some("c")
        );

        cache.purge("test:*").await.unwrap();
    }
}
