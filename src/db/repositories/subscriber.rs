//! Newsletter subscriber repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::Subscriber;

const COLUMNS: &str = "id, email, name, active, created_at";

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert a subscriber. A duplicate email fails with the database's
    /// unique-constraint error in the chain.
    async fn create(&self, email: &str, name: Option<&str>) -> Result<Subscriber>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>>;

    /// Mark the subscriber with `email` inactive; false if unknown
    async fn deactivate(&self, email: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Subscriber>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count_active(&self) -> Result<i64>;
}

pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, email: &str, name: Option<&str>) -> Result<Subscriber> {
        let sql = "INSERT INTO subscribers (email, name, active, created_at) VALUES (?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(email)
            .bind(name)
            .bind(true)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert subscriber")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Subscriber not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>> {
        let sql = format!("SELECT {} FROM subscribers WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Subscriber>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn deactivate(&self, email: &str) -> Result<bool> {
        // MySQL reports zero affected rows when the value is unchanged, so
        // existence is checked by a separate lookup.
        let sql = format!("SELECT {} FROM subscribers WHERE email = ?", COLUMNS);
        let existing = with_pool!(self.pool, |p| sqlx::query_as::<_, Subscriber>(&sql)
            .bind(email)
            .fetch_optional(p)
            .await?);
        if existing.is_none() {
            return Ok(false);
        }

        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE subscribers SET active = ? WHERE email = ?")
                .bind(false)
                .bind(email)
                .execute(p)
                .await
                .context("Failed to deactivate subscriber")?;
        });
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Subscriber>> {
        let sql = format!("SELECT {} FROM subscribers ORDER BY created_at DESC, id DESC", COLUMNS);
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Subscriber>(&sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete subscriber")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn count_active(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscribers WHERE active = ?"
        )
        .bind(true)
        .fetch_one(p)
        .await?);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    async fn setup_repo() -> SqlxSubscriberRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSubscriberRepository::new(pool)
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let repo = setup_repo().await;
        repo.create("amina@example.com", Some("Amina")).await.unwrap();

        let err = repo.create("amina@example.com", None).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let repo = setup_repo().await;
        repo.create("amina@example.com", None).await.unwrap();

        assert!(repo.deactivate("amina@example.com").await.unwrap());
        assert!(repo.deactivate("amina@example.com").await.unwrap());
        assert!(!repo.deactivate("nobody@example.com").await.unwrap());
        assert_eq!(repo.count_active().await.unwrap(), 0);
    }
}
