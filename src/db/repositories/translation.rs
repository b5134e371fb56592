//! Admin UI translation repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{with_pool, DynDatabasePool};
use crate::models::Translation;

const COLUMNS: &str = "id, locale, msg_key, value, updated_at";

#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// All entries, or those of one locale, ordered by locale then key
    async fn list(&self, locale: Option<&str>) -> Result<Vec<Translation>>;

    /// Insert or overwrite the value of `(locale, key)`
    async fn upsert(&self, locale: &str, key: &str, value: &str) -> Result<Translation>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTranslationRepository {
    pool: DynDatabasePool,
}

impl SqlxTranslationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TranslationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TranslationRepository for SqlxTranslationRepository {
    async fn list(&self, locale: Option<&str>) -> Result<Vec<Translation>> {
        let filter = if locale.is_some() { "WHERE locale = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM translations {} ORDER BY locale, msg_key",
            COLUMNS, filter
        );
        let rows = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, Translation>(&sql);
            if let Some(locale) = locale {
                query = query.bind(locale);
            }
            query.fetch_all(p).await?
        });
        Ok(rows)
    }

    async fn upsert(&self, locale: &str, key: &str, value: &str) -> Result<Translation> {
        let sql = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                "INSERT INTO translations (locale, msg_key, value, updated_at) VALUES (?, ?, ?, ?) \
                 ON CONFLICT(locale, msg_key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"
            }
            DatabaseDriver::Mysql => {
                "INSERT INTO translations (locale, msg_key, value, updated_at) VALUES (?, ?, ?, ?) \
                 ON DUPLICATE KEY UPDATE value = VALUES(value), updated_at = VALUES(updated_at)"
            }
        };
        with_pool!(self.pool, |p| {
            sqlx::query(sql)
                .bind(locale)
                .bind(key)
                .bind(value)
                .bind(Utc::now())
                .execute(p)
                .await
                .context("Failed to save translation")?;
        });

        let select = format!("SELECT {} FROM translations WHERE locale = ? AND msg_key = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Translation>(&select)
            .bind(locale)
            .bind(key)
            .fetch_one(p)
            .await
            .context("Translation not found after upsert")?);
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM translations WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete translation")?
            .rows_affected());
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_key() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxTranslationRepository::new(pool);

        let first = repo.upsert("ar", "nav.home", "الرئيسية").await.unwrap();
        let second = repo.upsert("ar", "nav.home", "البداية").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "البداية");

        repo.upsert("en", "nav.home", "Home").await.unwrap();
        assert_eq!(repo.list(Some("ar")).await.unwrap().len(), 1);
        assert_eq!(repo.list(None).await.unwrap().len(), 2);

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());
    }
}
