//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{Comment, CreateCommentInput};

const COLUMNS: &str = "id, content_id, author_name, email, body, approved, created_at";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert an unapproved comment
    async fn create(&self, content_id: i64, input: &CreateCommentInput) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Approved comments of a content row, oldest first
    async fn list_approved(&self, content_id: i64) -> Result<Vec<Comment>>;

    /// Moderation queue, newest first
    async fn list(&self, pending_only: bool) -> Result<Vec<Comment>>;

    async fn approve(&self, id: i64) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count_pending(&self) -> Result<i64>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, content_id: i64, input: &CreateCommentInput) -> Result<Comment> {
        let sql = "INSERT INTO comments (content_id, author_name, email, body, approved, created_at) \
                   VALUES (?, ?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(content_id)
            .bind(&input.author_name)
            .bind(&input.email)
            .bind(&input.body)
            .bind(false)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert comment")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Comment not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn list_approved(&self, content_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE content_id = ? AND approved = ? ORDER BY created_at ASC, id ASC",
            COLUMNS
        );
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Comment>(&sql)
            .bind(content_id)
            .bind(true)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn list(&self, pending_only: bool) -> Result<Vec<Comment>> {
        let filter = if pending_only { "WHERE approved = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM comments {} ORDER BY created_at DESC, id DESC",
            COLUMNS, filter
        );
        let rows = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, Comment>(&sql);
            if pending_only {
                query = query.bind(false);
            }
            query.fetch_all(p).await?
        });
        Ok(rows)
    }

    async fn approve(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE comments SET approved = ? WHERE id = ?")
                .bind(true)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to approve comment")?;
        });
        // MySQL counts unchanged rows as unaffected, so existence is read back.
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE id = ?"
        )
        .bind(id)
        .fetch_one(p)
        .await?);
        Ok(count > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete comment")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn count_pending(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE approved = ?"
        )
        .bind(false)
        .fetch_one(p)
        .await?);
        Ok(count)
    }
}
