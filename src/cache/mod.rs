//! Cache layer
//!
//! Public reads are cached as JSON. The in-process moka cache is the
//! default; Redis can be selected for multi-instance deployments when the
//! `redis-cache` feature is compiled in.
//!
//! ```rust,ignore
//! use minbar::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache).await?;
//! cache.set("content:article:list", &page, cache.default_ttl()).await?;
//! cache.delete_pattern("content:article:*").await?;
//! ```

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Operations every cache backend provides.
///
/// The generic methods make the trait unusable as `dyn CacheLayer`; the
/// `Cache` enum provides runtime selection instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// The configured cache backend
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

impl Cache {
    /// TTL applied to entries written without a more specific one
    pub fn default_ttl(&self) -> Duration {
        match self {
            Cache::Memory(cache) => cache.default_ttl(),
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.default_ttl(),
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.clear().await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.clear().await,
        }
    }
}

/// Build the cache selected by `config.driver`.
///
/// Fails when Redis is selected without a URL, when the `redis-cache`
/// feature is not compiled in, or when the Redis connection fails.
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let ttl = Duration::from_secs(config.ttl_seconds);

    match config.driver {
        CacheDriver::Memory => Ok(Arc::new(Cache::Memory(MemoryCache::with_capacity_and_ttl(
            10_000, ttl,
        )))),
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the Redis cache driver. \
                         Set 'redis_url' in the cache section or MINBAR_CACHE_REDIS_URL."
                    )
                })?;
                let cache = RedisCache::with_ttl(redis_url, ttl).await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis cache driver is configured but the 'redis-cache' feature is not enabled. \
                     Rebuild with `--features redis-cache` or use the 'memory' driver."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_cache() {
        let config = CacheConfig {
            ttl_seconds: 120,
            ..Default::default()
        };
        let cache = create_cache(&config).await.unwrap();
        assert_eq!(cache.default_ttl(), Duration::from_secs(120));

        cache.set("k", &vec![1, 2, 3], Duration::from_secs(60)).await.unwrap();
        let value: Option<Vec<i32>> = cache.get("k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[cfg(not(feature = "redis-cache"))]
    #[tokio::test]
    async fn test_redis_driver_without_feature() {
        let config = CacheConfig {
            driver: CacheDriver::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
            ttl_seconds: 300,
        };
        let err = create_cache(&config).await.unwrap_err().to_string();
        assert!(err.contains("redis-cache"));
    }
}
