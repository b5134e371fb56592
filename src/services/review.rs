//! Product reviews, moderated like comments.

use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::{ProductRepository, ReviewRepository};
use crate::models::{CreateReviewInput, Review};
use crate::services::validation::{max_chars, required};

const MAX_BODY_CHARS: usize = 3000;

#[derive(Debug, Error)]
pub enum ReviewServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct ReviewService {
    repo: Arc<dyn ReviewRepository>,
    products: Arc<dyn ProductRepository>,
}

impl ReviewService {
    pub fn new(repo: Arc<dyn ReviewRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { repo, products }
    }

    async fn ensure_active_product(&self, product_id: i64) -> Result<(), ReviewServiceError> {
        match self.products.get_by_id(product_id).await? {
            Some(product) if product.active => Ok(()),
            _ => Err(ReviewServiceError::NotFound("Product not found".to_string())),
        }
    }

    pub async fn list_approved(&self, product_id: i64) -> Result<Vec<Review>, ReviewServiceError> {
        self.ensure_active_product(product_id).await?;
        Ok(self.repo.list_approved(product_id).await?)
    }

    /// Store a review for moderation.
    pub async fn submit(&self, product_id: i64, input: CreateReviewInput) -> Result<Review, ReviewServiceError> {
        let invalid = ReviewServiceError::Validation;
        let author_name = required(&input.author_name, "Name is required").map_err(invalid)?;
        let body = required(&input.body, "Review is required").map_err(invalid)?;
        max_chars(&body, MAX_BODY_CHARS, "Review").map_err(invalid)?;
        if !(1..=5).contains(&input.rating) {
            return Err(invalid("Rating must be between 1 and 5".to_string()));
        }

        self.ensure_active_product(product_id).await?;
        let review = self
            .repo
            .create(
                product_id,
                &CreateReviewInput {
                    author_name,
                    rating: input.rating,
                    body,
                },
            )
            .await?;

        tracing::info!("Review {} awaiting approval on product {}", review.id, product_id);
        Ok(review)
    }

    pub async fn list_pending(&self) -> Result<Vec<Review>, ReviewServiceError> {
        Ok(self.repo.list_pending().await?)
    }

    pub async fn approve(&self, id: i64) -> Result<(), ReviewServiceError> {
        if self.repo.approve(id).await? {
            Ok(())
        } else {
            Err(review_not_found())
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ReviewServiceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(review_not_found())
        }
    }
}

fn review_not_found() -> ReviewServiceError {
    ReviewServiceError::NotFound("Review not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxProductRepository, SqlxReviewRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateProductInput;

    async fn setup() -> (ReviewService, Arc<dyn ProductRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let products = SqlxProductRepository::boxed(pool.clone());
        (ReviewService::new(SqlxReviewRepository::boxed(pool), products.clone()), products)
    }

    async fn product(repo: &Arc<dyn ProductRepository>, active: bool) -> i64 {
        repo.create(&CreateProductInput {
            name: "Orchid".to_string(),
            price_cents: 4200,
            stock: 3,
            active: Some(active),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }

    fn review(rating: i64) -> CreateReviewInput {
        CreateReviewInput {
            author_name: "Huda".to_string(),
            rating,
            body: "Arrived fresh and beautiful".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_approve() {
        let (service, products) = setup().await;
        let id = product(&products, true).await;

        let r = service.submit(id, review(5)).await.unwrap();
        assert!(!r.approved);
        assert!(service.list_approved(id).await.unwrap().is_empty());
        assert_eq!(service.list_pending().await.unwrap().len(), 1);

        service.approve(r.id).await.unwrap();
        assert_eq!(service.list_approved(id).await.unwrap().len(), 1);
        assert!(service.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let (service, products) = setup().await;
        let id = product(&products, true).await;

        for rating in [0, 6, -1] {
            assert!(matches!(
                service.submit(id, review(rating)).await.unwrap_err(),
                ReviewServiceError::Validation(_)
            ));
        }
        assert!(service.submit(id, review(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let (service, products) = setup().await;
        let id = product(&products, false).await;
        assert!(matches!(service.submit(id, review(4)).await.unwrap_err(), ReviewServiceError::NotFound(_)));
        assert!(matches!(service.submit(999, review(4)).await.unwrap_err(), ReviewServiceError::NotFound(_)));
    }
}
