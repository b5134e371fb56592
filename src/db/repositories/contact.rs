//! Contact message repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{ContactInput, ContactMessage};

const COLUMNS: &str = "id, name, email, phone, subject, message, is_read, created_at";

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>>;

    async fn list(&self) -> Result<Vec<ContactMessage>>;

    async fn mark_read(&self, id: i64) -> Result<Option<ContactMessage>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count_unread(&self) -> Result<i64>;
}

pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage> {
        let sql = "INSERT INTO contact_messages (name, email, phone, subject, message, is_read, created_at) \
                   VALUES (?, ?, ?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.subject)
            .bind(&input.message)
            .bind(false)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert contact message")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Contact message not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>> {
        let sql = format!("SELECT {} FROM contact_messages WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<ContactMessage>> {
        let sql = format!(
            "SELECT {} FROM contact_messages ORDER BY created_at DESC, id DESC",
            COLUMNS
        );
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, ContactMessage>(&sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn mark_read(&self, id: i64) -> Result<Option<ContactMessage>> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE contact_messages SET is_read = ? WHERE id = ?")
                .bind(true)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to mark contact message read")?;
        });
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM contact_messages WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete contact message")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn count_unread(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM contact_messages WHERE is_read = ?"
        )
        .bind(false)
        .fetch_one(p)
        .await?);
        Ok(count)
    }
}
