//! Shop catalogue: products.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::ProductRepository;
use crate::models::{CreateProductInput, Product, ProductFilter, UpdateProductInput};
use crate::services::validation::{max_chars, optional};

const MAX_NAME_CHARS: usize = 200;

const CACHE_KEY_PREFIX: &str = "shop:products:";
const LIST_CACHE_TTL_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ProductServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    cache: Arc<Cache>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Active products for the storefront, featured first
    pub async fn list_active(&self, filter: ProductFilter) -> Result<Vec<Product>, ProductServiceError> {
        let filter = ProductFilter {
            category: optional(filter.category.as_deref()),
            q: optional(filter.q.as_deref()),
            featured: filter.featured,
            include_inactive: false,
        };

        let cache_key = filter.q.is_none().then(|| {
            format!(
                "{}list:{}:{:?}",
                CACHE_KEY_PREFIX,
                filter.category.as_deref().unwrap_or(""),
                filter.featured
            )
        });
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get::<Vec<Product>>(key).await.ok().flatten() {
                return Ok(cached);
            }
        }

        let products = self.repo.list(&filter).await?;
        if let Some(key) = &cache_key {
            let _ = self
                .cache
                .set(key, &products, Duration::from_secs(LIST_CACHE_TTL_SECS))
                .await;
        }
        Ok(products)
    }

    /// A product visible on the storefront
    pub async fn get_active(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(product_not_found)
    }

    /// Every product, active or not
    pub async fn list_all(&self, filter: ProductFilter) -> Result<Vec<Product>, ProductServiceError> {
        Ok(self
            .repo
            .list(&ProductFilter {
                include_inactive: true,
                ..filter
            })
            .await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.repo.get_by_id(id).await?.ok_or_else(product_not_found)
    }

    pub async fn create(&self, input: CreateProductInput) -> Result<Product, ProductServiceError> {
        validate(&input.name, input.price_cents, input.stock)?;

        let product = self
            .repo
            .create(&CreateProductInput {
                name: input.name.trim().to_string(),
                description: optional(input.description.as_deref()),
                image_url: optional(input.image_url.as_deref()),
                category: optional(input.category.as_deref()),
                ..input
            })
            .await?;

        tracing::info!("Created product {} ({})", product.id, product.name);
        self.invalidate().await;
        Ok(product)
    }

    pub async fn update(&self, id: i64, input: UpdateProductInput) -> Result<Product, ProductServiceError> {
        let mut product = self.get_by_id(id).await?;

        if let Some(name) = input.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = input.price_cents {
            product.price_cents = price;
        }
        if let Some(image_url) = input.image_url {
            product.image_url = optional(Some(image_url.as_str()));
        }
        if let Some(category) = input.category {
            product.category = category.trim().to_string();
        }
        if let Some(stock) = input.stock {
            product.stock = stock;
        }
        if let Some(featured) = input.featured {
            product.featured = featured;
        }
        if let Some(active) = input.active {
            product.active = active;
        }
        validate(&product.name, product.price_cents, product.stock)?;

        let product = self.repo.update(&product).await?;
        self.invalidate().await;
        Ok(product)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProductServiceError> {
        if !self.repo.delete(id).await? {
            return Err(product_not_found());
        }
        tracing::info!("Deleted product {}", id);
        self.invalidate().await;
        Ok(())
    }

    async fn invalidate(&self) {
        let pattern = format!("{}*", CACHE_KEY_PREFIX);
        if let Err(e) = self.cache.delete_pattern(&pattern).await {
            tracing::warn!("Failed to invalidate {}: {}", pattern, e);
        }
    }
}

fn validate(name: &str, price_cents: i64, stock: i64) -> Result<(), ProductServiceError> {
    let invalid = ProductServiceError::Validation;
    if name.trim().is_empty() {
        return Err(invalid("Name is required".to_string()));
    }
    max_chars(name.trim(), MAX_NAME_CHARS, "Name").map_err(invalid)?;
    if price_cents < 0 {
        return Err(invalid("Price cannot be negative".to_string()));
    }
    if stock < 0 {
        return Err(invalid("Stock cannot be negative".to_string()));
    }
    Ok(())
}

fn product_not_found() -> ProductServiceError {
    ProductServiceError::NotFound("Product not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxProductRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> ProductService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default()).await.unwrap();
        ProductService::new(SqlxProductRepository::boxed(pool), cache)
    }

    fn bouquet(name: &str, price_cents: i64) -> CreateProductInput {
        CreateProductInput {
            name: name.to_string(),
            price_cents,
            stock: 10,
            category: Some("bouquets".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_validation() {
        let service = setup().await;
        for (input, message) in [
            (bouquet(" ", 100), "Name is required"),
            (bouquet("Tulips", -1), "Price cannot be negative"),
            (CreateProductInput { stock: -5, ..bouquet("Tulips", 100) }, "Stock cannot be negative"),
        ] {
            let err = service.create(input).await.unwrap_err();
            assert!(matches!(err, ProductServiceError::Validation(ref m) if m == message));
        }
    }

    #[tokio::test]
    async fn test_inactive_hidden_from_storefront() {
        let service = setup().await;
        let roses = service.create(bouquet("Roses", 2500)).await.unwrap();
        let lilies = service.create(bouquet("Lilies", 1800)).await.unwrap();

        assert_eq!(service.list_active(ProductFilter::default()).await.unwrap().len(), 2);

        service
            .update(lilies.id, UpdateProductInput { active: Some(false), ..Default::default() })
            .await
            .unwrap();

        let visible = service.list_active(ProductFilter::default()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, roses.id);
        assert!(matches!(service.get_active(lilies.id).await.unwrap_err(), ProductServiceError::NotFound(_)));
        assert_eq!(service.list_all(ProductFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup().await;
        let p = service.create(bouquet("Peonies", 3000)).await.unwrap();

        let updated = service
            .update(p.id, UpdateProductInput { price_cents: Some(3500), featured: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 3500);
        assert!(updated.featured);

        let err = service
            .update(p.id, UpdateProductInput { stock: Some(-1), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ProductServiceError::Validation(_)));

        service.delete(p.id).await.unwrap();
        assert!(matches!(service.delete(p.id).await.unwrap_err(), ProductServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cached_storefront_follows_writes() {
        let service = setup().await;
        let p = service.create(bouquet("Freesias", 1200)).await.unwrap();

        // warm the list cache
        assert_eq!(service.list_active(ProductFilter::default()).await.unwrap()[0].price_cents, 1200);

        service
            .update(p.id, UpdateProductInput { price_cents: Some(1400), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(service.list_active(ProductFilter::default()).await.unwrap()[0].price_cents, 1400);

        service.delete(p.id).await.unwrap();
        assert!(service.list_active(ProductFilter::default()).await.unwrap().is_empty());
    }
}
