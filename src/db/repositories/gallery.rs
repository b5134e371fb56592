//! Gallery image repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{CreateGalleryImageInput, GalleryImage};

const COLUMNS: &str = "id, title, image_url, sort_order, created_at";

#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn create(&self, input: &CreateGalleryImageInput) -> Result<GalleryImage>;

    /// Ordered by `sort_order`, then insertion
    async fn list(&self) -> Result<Vec<GalleryImage>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxGalleryRepository {
    pool: DynDatabasePool,
}

impl SqlxGalleryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GalleryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GalleryRepository for SqlxGalleryRepository {
    async fn create(&self, input: &CreateGalleryImageInput) -> Result<GalleryImage> {
        let sql = "INSERT INTO gallery_images (title, image_url, sort_order, created_at) VALUES (?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(input.title.trim())
            .bind(input.image_url.trim())
            .bind(input.sort_order)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert gallery image")?
            .insert_id());

        let select = format!("SELECT {} FROM gallery_images WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, GalleryImage>(&select)
            .bind(id)
            .fetch_one(p)
            .await?);
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<GalleryImage>> {
        let sql = format!("SELECT {} FROM gallery_images ORDER BY sort_order, id", COLUMNS);
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, GalleryImage>(&sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM gallery_images WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete gallery image")?
            .rows_affected());
        Ok(affected > 0)
    }
}
