//! Settings repository
//!
//! Key/value storage for site-wide settings such as the footer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{with_pool, DynDatabasePool};

/// A setting key-value pair
#[derive(Debug, Clone, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    async fn get_all(&self) -> Result<Vec<Setting>>;

    /// Values of the requested keys that exist
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Insert or overwrite a setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        let sql = "SELECT `key`, value, updated_at FROM settings WHERE `key` = ?";
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Setting>(sql)
            .bind(key)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn get_all(&self) -> Result<Vec<Setting>> {
        let sql = "SELECT `key`, value, updated_at FROM settings ORDER BY `key`";
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Setting>(sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let wanted: std::collections::HashSet<&str> = keys.iter().copied().collect();
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|s| wanted.contains(s.key.as_str()))
            .map(|s| (s.key, s.value))
            .collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let sql = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                "INSERT INTO settings (`key`, value, updated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(`key`) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"
            }
            DatabaseDriver::Mysql => {
                "INSERT INTO settings (`key`, value, updated_at) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE value = VALUES(value), updated_at = VALUES(updated_at)"
            }
        };
        with_pool!(self.pool, |p| {
            sqlx::query(sql)
                .bind(key)
                .bind(value)
                .bind(Utc::now())
                .execute(p)
                .await
                .with_context(|| format!("Failed to save setting {}", key))?;
        });
        Ok(())
    }

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()> {
        for (key, value) in settings {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM settings WHERE `key` = ?")
                .bind(key)
                .execute(p)
                .await?;
        });
        Ok(())
    }
}
