//! Failed-login throttling
//!
//! Counts failed logins per identifier (username or email, case-insensitive)
//! inside a sliding window. Once the limit is reached further attempts are
//! refused until old failures age out or a login succeeds.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::AuthConfig;

/// Sliding-window failed-login counter
pub struct LoginThrottle {
    attempts: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginThrottle {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.max_login_attempts, Duration::minutes(config.lockout_minutes))
    }

    fn key(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// Whether the identifier has used up its failed attempts
    pub async fn is_locked(&self, identifier: &str) -> bool {
        self.is_locked_at(identifier, Utc::now()).await
    }

    pub async fn is_locked_at(&self, identifier: &str, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        let attempts = self.attempts.read().await;
        attempts
            .get(&Self::key(identifier))
            .map(|times| times.iter().filter(|t| **t > cutoff).count() >= self.max_attempts)
            .unwrap_or(false)
    }

    pub async fn record_failure(&self, identifier: &str) {
        self.record_failure_at(identifier, Utc::now()).await
    }

    pub async fn record_failure_at(&self, identifier: &str, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let mut attempts = self.attempts.write().await;
        let times = attempts.entry(Self::key(identifier)).or_default();
        times.retain(|t| *t > cutoff);
        times.push(now);
    }

    /// Forget failures after a successful login
    pub async fn clear(&self, identifier: &str) {
        self.attempts.write().await.remove(&Self::key(identifier));
    }

    /// Drop entries with no failures inside the window, returning how many were removed
    pub async fn cleanup(&self) -> usize {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        before - attempts.len()
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}
