//! In-memory cache backed by moka
//!
//! Values are stored as JSON strings so any serializable type fits. Every
//! entry carries its own TTL, capped by the cache-wide default.

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CacheLayer;

#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Glob match supporting `*` (any run) and `?` (one character)
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ki));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ki = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => {
                let value = serde_json::from_str(&entry.data)
                    .context("Failed to deserialize cache value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let entry = CacheEntry {
            data: Arc::new(json),
            ttl: ttl.min(self.default_ttl),
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| glob_match(pattern, key.as_str()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache() -> MemoryCache {
        MemoryCache::with_capacity_and_ttl(100, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = cache();
        cache.set("a", &"one".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get::<String>("a").await.unwrap(), Some("one".to_string()));

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get::<String>("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = cache();
        cache.set("short", &1, Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.cache.run_pending_tasks().await;
        assert_eq!(cache.get::<i32>("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        cache.set("content:article:list:1", &1, ttl).await.unwrap();
        cache.set("content:article:slug:sabr", &2, ttl).await.unwrap();
        cache.set("content:sermon:list:1", &3, ttl).await.unwrap();
        cache.cache.run_pending_tasks().await;

        cache.delete_pattern("content:article:*").await.unwrap();
        assert_eq!(cache.get::<i32>("content:article:list:1").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("content:article:slug:sabr").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("content:sermon:list:1").await.unwrap(), Some(3));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("content:*", "content:article:1"));
        assert!(glob_match("user:?:profile", "user:1:profile"));
        assert!(glob_match("*:list:*", "content:video:list:3"));
        assert!(!glob_match("user:?:profile", "user:12:profile"));
        assert!(!glob_match("content:*", "products:1"));
        assert!(glob_match("*", ""));
    }

    proptest! {
        #[test]
        fn prop_star_suffix_matches_any_extension(prefix in "[a-z:]{0,12}", rest in "[a-z0-9:]{0,12}") {
            let pattern = format!("{}*", prefix);
            let key = format!("{}{}", prefix, rest);
            prop_assert!(glob_match(&pattern, &key));
        }

        #[test]
        fn prop_literal_pattern_matches_only_itself(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
            prop_assert_eq!(glob_match(&a, &b), a == b);
        }
    }
}
