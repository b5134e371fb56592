//! Redis cache for multi-instance deployments
//!
//! Values are stored as JSON with `SETEX`; pattern deletion walks the
//! keyspace with `SCAN` so large databases are never blocked by `KEYS`.
//! All keys live under the `minbar:` namespace.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::CacheLayer;

const NAMESPACE: &str = "minbar:";
const SCAN_COUNT: usize = 100;

pub struct RedisCache {
    connection: MultiplexedConnection,
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
    pub async fn with_ttl(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", NAMESPACE, key)
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let result: Option<String> = conn
            .get(Self::namespaced(key))
            .await
            .context("Failed to get value from Redis")?;

        result
            .map(|json| serde_json::from_str(&json).context("Failed to deserialize cached value"))
            .transpose()
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let ttl_secs = ttl.min(self.default_ttl).as_secs().max(1);

        let _: () = conn
            .set_ex(Self::namespaced(key), json, ttl_secs)
            .await
            .context("Failed to set value in Redis")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(Self::namespaced(key))
            .await
            .context("Failed to delete key from Redis")?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let pattern = Self::namespaced(pattern);
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan keys in Redis")?;

            if !keys.is_empty() {
                let _: () = conn
                    .del(&keys)
                    .await
                    .context("Failed to delete keys from Redis")?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.delete_pattern("*").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_set_get_and_pattern_delete() {
        let cache = RedisCache::with_ttl(&redis_url(), Duration::from_secs(60)).await.unwrap();
        let ttl = Duration::from_secs(30);

        cache.set("test:content:1", &"one".to_string(), ttl).await.unwrap();
        cache.set("test:product:1", &"two".to_string(), ttl).await.unwrap();
        assert_eq!(cache.get::<String>("test:content:1").await.unwrap(), Some("one".to_string()));

        cache.delete_pattern("test:content:*").await.unwrap();
        assert_eq!(cache.get::<String>("test:content:1").await.unwrap(), None);
        assert_eq!(cache.get::<String>("test:product:1").await.unwrap(), Some("two".to_string()));

        cache.delete("test:product:1").await.unwrap();
    }
}
