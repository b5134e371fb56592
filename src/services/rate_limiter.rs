//! Sliding-window limits for the admin login endpoints.
//!
//! Two windows are tracked: failed attempts per username (5 per 15 minutes)
//! and login requests per client IP (10 per minute). Both the CMS admin and
//! the shop admin share one limiter.

use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

pub const USERNAME_MAX_ATTEMPTS: usize = 5;
pub const USERNAME_WINDOW_MINUTES: i64 = 15;
pub const IP_MAX_REQUESTS: usize = 10;
pub const IP_WINDOW_MINUTES: i64 = 1;

/// Seconds a rejected login is told to wait, the longer of the two windows
pub const LOGIN_RETRY_AFTER_SECS: u64 = (USERNAME_WINDOW_MINUTES * 60) as u64;

/// Timestamps of recent events per key, trimmed to a fixed window.
struct Window<K> {
    limit: usize,
    span: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> Window<K> {
    fn new(limit: usize, span: Duration) -> Self {
        Self {
            limit,
            span,
            events: RwLock::new(HashMap::new()),
        }
    }

    async fn is_limited(&self, key: K) -> bool {
        let cutoff = Utc::now() - self.span;
        let mut events = self.events.write().await;
        let times = events.entry(key).or_default();
        times.retain(|t| *t > cutoff);
        times.len() >= self.limit
    }

    async fn record(&self, key: K) {
        self.events
            .write()
            .await
            .entry(key)
            .or_default()
            .push(Utc::now());
    }

    async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    /// Drop expired timestamps and empty keys; returns keys still tracked.
    async fn prune(&self) -> usize {
        let cutoff = Utc::now() - self.span;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
        events.len()
    }
}

/// Login throttling for both admin panels.
pub struct LoginRateLimiter {
    usernames: Window<String>,
    ips: Window<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            usernames: Window::new(
                USERNAME_MAX_ATTEMPTS,
                Duration::minutes(USERNAME_WINDOW_MINUTES),
            ),
            ips: Window::new(IP_MAX_REQUESTS, Duration::minutes(IP_WINDOW_MINUTES)),
        }
    }

    /// Usernames are compared case-insensitively.
    pub async fn is_username_limited(&self, username: &str) -> bool {
        self.usernames.is_limited(username.to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        self.usernames.record(username.to_lowercase()).await;
    }

    pub async fn clear_username_attempts(&self, username: &str) {
        self.usernames.clear(&username.to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_limited(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.record(ip).await;
    }

    /// Check and record one login request; `true` means the caller must reject it.
    pub async fn check_login(&self, ip: Option<IpAddr>, username: &str) -> bool {
        if let Some(ip) = ip {
            if self.is_ip_limited(ip).await {
                return true;
            }
            self.record_ip_request(ip).await;
        }
        self.is_username_limited(username).await
    }

    /// Called from the periodic maintenance task.
    pub async fn cleanup(&self) {
        let users = self.usernames.prune().await;
        let ips = self.ips.prune().await;
        tracing::debug!("Rate limiter tracking {} usernames, {} addresses", users, ips);
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_limit_after_five_failures() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_username_limited("imam").await);
            limiter.record_failed_attempt("imam").await;
        }
        limiter.record_failed_attempt("imam").await;
        assert!(limiter.is_username_limited("imam").await);

        limiter.clear_username_attempts("imam").await;
        assert!(!limiter.is_username_limited("imam").await);
    }

    #[tokio::test]
    async fn test_username_is_case_insensitive() {
        let limiter = LoginRateLimiter::new();
        for name in ["Imam", "IMAM", "imam", "iMaM", "imaM"] {
            limiter.record_failed_attempt(name).await;
        }
        assert!(limiter.is_username_limited("imam").await);
    }

    #[tokio::test]
    async fn test_ip_limit_through_check_login() {
        let limiter = LoginRateLimiter::new();
        let ip: IpAddr = "10.0.0.7".parse().unwrap();

        for _ in 0..IP_MAX_REQUESTS {
            assert!(!limiter.check_login(Some(ip), "someone").await);
        }
        assert!(limiter.check_login(Some(ip), "someone").await);

        let other: IpAddr = "10.0.0.8".parse().unwrap();
        assert!(!limiter.check_login(Some(other), "someone").await);
    }

    #[test]
    fn test_fresh_limiter_allows_everyone() {
        let limiter = LoginRateLimiter::default();
        let ip: IpAddr = "192.168.1.20".parse().unwrap();
        let limited = tokio_test::block_on(async {
            limiter.is_username_limited("imam").await || limiter.is_ip_limited(ip).await
        });
        assert!(!limited);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_entries() {
        let limiter = LoginRateLimiter::new();
        for _ in 0..USERNAME_MAX_ATTEMPTS {
            limiter.record_failed_attempt("admin").await;
        }
        limiter.cleanup().await;
        assert!(limiter.is_username_limited("admin").await);
    }
}
