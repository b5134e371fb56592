//! Product review repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{CreateReviewInput, Review};

const COLUMNS: &str = "id, product_id, author_name, rating, body, approved, created_at";

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert an unapproved review
    async fn create(&self, product_id: i64, input: &CreateReviewInput) -> Result<Review>;

    async fn list_approved(&self, product_id: i64) -> Result<Vec<Review>>;

    async fn list_pending(&self) -> Result<Vec<Review>>;

    async fn approve(&self, id: i64) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxReviewRepository {
    pool: DynDatabasePool,
}

impl SqlxReviewRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReviewRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReviewRepository for SqlxReviewRepository {
    async fn create(&self, product_id: i64, input: &CreateReviewInput) -> Result<Review> {
        let sql = "INSERT INTO reviews (product_id, author_name, rating, body, approved, created_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(product_id)
            .bind(input.author_name.trim())
            .bind(input.rating)
            .bind(input.body.trim())
            .bind(false)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert review")?
            .insert_id());

        let select = format!("SELECT {} FROM reviews WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Review>(&select)
            .bind(id)
            .fetch_one(p)
            .await?);
        Ok(row)
    }

    async fn list_approved(&self, product_id: i64) -> Result<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE product_id = ? AND approved = ? ORDER BY created_at DESC, id DESC",
            COLUMNS
        );
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .bind(true)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn list_pending(&self) -> Result<Vec<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE approved = ? ORDER BY created_at, id",
            COLUMNS
        );
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Review>(&sql)
            .bind(false)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn approve(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE reviews SET approved = ? WHERE id = ?")
                .bind(true)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to approve review")?;
        });
        // MySQL counts unchanged rows as unaffected, so existence is read back.
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE id = ?"
        )
        .bind(id)
        .fetch_one(p)
        .await?);
        Ok(count > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete review")?
            .rows_affected());
        Ok(affected > 0)
    }
}
