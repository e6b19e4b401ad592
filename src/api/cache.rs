//! Response cache
//!
//! Successful `GET` responses are stored per user and URL for a fixed TTL.
//! Hits are replayed byte for byte with `X-Cache: HIT`; fresh responses
//! carry `X-Cache: MISS`. Writes invalidate by substring through
//! [`ResponseCache::clear_cache`].

use anyhow::Result;
use axum::{
    body::{self, Body},
    extract::{OriginalUri, Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;

use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::responses::ApiError;
use crate::cache::{glob, Cache, CacheLayer};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Bodies larger than this are served but not stored
const MAX_CACHED_BODY: usize = 1024 * 1024;

/// TTL cache of rendered JSON responses
pub struct ResponseCache {
    cache: Arc<Cache>,
    /// `None` defers to the driver's default TTL
    ttl: Option<Duration>,
}

impl ResponseCache {
    /// A zero `ttl` falls back to the driver's default
    pub fn new(cache: Arc<Cache>, ttl: Duration) -> Self {
        let ttl = (!ttl.is_zero()).then_some(ttl);
        Self { cache, ttl }
    }

    /// `resp:{user id or anon}:{path and query}`
    pub fn key_for(user_id: Option<i64>, uri: &str) -> String {
        match user_id {
            Some(id) => format!("resp:{}:{}", id, uri),
            None => format!("resp:anon:{}", uri),
        }
    }

    pub fn driver_name(&self) -> &'static str {
        self.cache.driver_name()
    }

    /// Stored body for a key. Cache failures read as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.cache.fetch(key).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(key, "Response cache read failed: {:#}", e);
                None
            }
        }
    }

    pub async fn put(&self, key: &str, body: &str) {
        if let Err(e) = self.cache.store(key, body, self.ttl).await {
            tracing::warn!(key, "Response cache write failed: {:#}", e);
        }
    }

    /// Remove every cached response whose key contains `pattern`.
    ///
    /// An empty pattern clears everything.
    pub async fn clear_cache(&self, pattern: &str) -> Result<u64> {
        let removed = self
            .cache
            .purge(&glob::contains_pattern(pattern))
            .await?;
        tracing::debug!(pattern, removed, "Cleared cached responses");
        Ok(removed)
    }

    /// Invalidate after a write; failures are logged, not returned
    pub async fn invalidate(&self, pattern: &str) {
        if let Err(e) = self.clear_cache(pattern).await {
            tracing::warn!(pattern, "Response cache invalidation failed: {:#}", e);
        }
    }
}

fn replay(body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (X_CACHE, HeaderValue::from_static("HIT")),
        ],
        body,
    )
        .into_response()
}

/// Serve and store `GET` responses.
///
/// Must run inside the auth layer so the key can include the user.
pub async fn response_cache_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|auth| auth.user.id);
    // Nested routers see a stripped URI; key on the full one
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| request.uri());
    let uri = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let key = ResponseCache::key_for(user_id, &uri);

    if let Some(body) = state.response_cache.get(&key).await {
        tracing::debug!(key, "Response cache hit");
        return replay(body);
    }
    tracing::debug!(key, "Response cache miss");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => return ApiError::internal(e).into_response(),
    };

    if bytes.len() <= MAX_CACHED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            state.response_cache.put(&key, text).await;
        }
    }

    parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn response_cache() -> ResponseCache {
        ResponseCache::new(
            Arc::new(Cache::Memory(MemoryCache::new())),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_key_for() {
        assert_eq!(ResponseCache::key_for(Some(7), "/api/tasks?page=2"), "resp:7:/api/tasks?page=2");
        assert_eq!(ResponseCache::key_for(None, "/api/blogs"), "resp:anon:/api/blogs");
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = response_cache();
        let key = ResponseCache::key_for(Some(1), "/api/tasks");
        assert!(cache.get(&key).await.is_none());

        cache.put(&key, r#"{"success":true}"#).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some(r#"{"success":true}"#));
    }

    #[tokio::test]
    async fn test_clear_cache_by_substring() {
        let cache = response_cache();
        for (user, uri) in [
            (Some(1), "/api/tasks"),
            (Some(2), "/api/tasks?mood=happy"),
            (Some(1), "/api/tasks/stats"),
            (None, "/api/blogs"),
        ] {
            cache.put(&ResponseCache::key_for(user, uri), "{}").await;
        }

        assert_eq!(cache.clear_cache("/api/tasks").await.unwrap(), 3);
        assert!(cache.get(&ResponseCache::key_for(None, "/api/blogs")).await.is_some());
        assert!(cache.get(&ResponseCache::key_for(Some(1), "/api/tasks")).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_treats_glob_characters_literally() {
        let cache = response_cache();
        cache.put(&ResponseCache::key_for(Some(1), "/api/tasks?search=a*b"), "{}").await;
        cache.put(&ResponseCache::key_for(Some(1), "/api/tasks?search=aXb"), "{}").await;

        assert_eq!(cache.clear_cache("a*b").await.unwrap(), 1);
        assert!(cache
            .get(&ResponseCache::key_for(Some(1), "/api/tasks?search=aXb"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_empty_pattern_clears_everything() {
        let cache = response_cache();
        cache.put("resp:1:/a", "{}").await;
        cache.put("resp:anon:/b", "{}").await;
        assert_eq!(cache.clear_cache("").await.unwrap(), 2);
    }
}
