//! Shop gallery images.

use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::GalleryRepository;
use crate::models::{CreateGalleryImageInput, GalleryImage};
use crate::services::validation::required;

#[derive(Debug, Error)]
pub enum GalleryServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct GalleryService {
    repo: Arc<dyn GalleryRepository>,
}

impl GalleryService {
    pub fn new(repo: Arc<dyn GalleryRepository>) -> Self {
        Self { repo }
    }

    /// Images ordered by `sort_order`
    pub async fn list(&self) -> Result<Vec<GalleryImage>, GalleryServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn create(&self, input: CreateGalleryImageInput) -> Result<GalleryImage, GalleryServiceError> {
        let image_url = required(&input.image_url, "Image URL is required").map_err(GalleryServiceError::Validation)?;
        let image = self
            .repo
            .create(&CreateGalleryImageInput {
                title: input.title.trim().to_string(),
                image_url,
                sort_order: input.sort_order,
            })
            .await?;
        Ok(image)
    }

    pub async fn delete(&self, id: i64) -> Result<(), GalleryServiceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(GalleryServiceError::NotFound("Image not found".to_string()))
        }
    }
}
