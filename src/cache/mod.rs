//! Response body store
//!
//! Holds rendered JSON bodies keyed by `resp:{user}:{uri}`. Two drivers:
//! - In-memory (moka), the default for a single instance
//! - Redis, behind the `redis-cache` feature, so several instances share
//!   one cache and one invalidation
//!
//! Keys are purged by glob (see [`glob`]); callers that want a substring
//! purge build the glob with [`glob::contains_pattern`].

pub mod glob;
pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Operations every driver provides
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Stored body, if present and not expired
    async fn fetch(&self, key: &str) -> Result<Option<String>>;

    /// Store a body. `None` uses the driver's default TTL.
    async fn store(&self, key: &str, body: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove every key matching the glob and return how many went
    async fn purge(&self, pattern: &str) -> Result<u64>;
}

/// Driver picked from `cache.driver` at startup
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

impl Cache {
    pub fn driver_name(&self) -> &'static str {
        match self {
            Cache::Memory(_) => "memory",
            #[cfg(feature = "redis-cache")]
            Cache::Redis(_) => "redis",
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        match self {
            Cache::Memory(cache) => cache.fetch(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.fetch(key).await,
        }
    }

    async fn store(&self, key: &str, body: &str, ttl: Option<Duration>) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.store(key, body, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.store(key, body, ttl).await,
        }
    }

    async fn purge(&self, pattern: &str) -> Result<u64> {
        match self {
            Cache::Memory(cache) => cache.purge(pattern).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.purge(pattern).await,
        }
    }
}

/// Build the configured driver.
///
/// # Errors
///
/// Fails when Redis is selected without a URL, when the connection fails,
/// or when the binary was built without the `redis-cache` feature.
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let default_ttl = Duration::from_secs(config.ttl_seconds);

    let cache = match config.driver {
        CacheDriver::Memory => {
            Cache::Memory(MemoryCache::with_capacity_and_ttl(config.max_entries, default_ttl))
        }
        #[cfg(feature = "redis-cache")]
        CacheDriver::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "cache.redis_url (or TASKLY_CACHE_REDIS_URL) is required for the redis driver"
                )
            })?;
            Cache::Redis(RedisCache::connect(url, default_ttl).await?)
        }
        #[cfg(not(feature = "redis-cache"))]
        CacheDriver::Redis => anyhow::bail!(
            "cache.driver is redis but this build lacks the 'redis-cache' feature; \
             rebuild with `--features redis-cache` or use the memory driver"
        ),
    };

    Ok(Arc::new(cache))
}
