//! Product repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{like_pattern, with_pool, DynDatabasePool, InsertId};
use crate::models::{CreateProductInput, Product, ProductFilter};

const COLUMNS: &str = "id, name, description, price_cents, image_url, category, stock, featured, \
     active, created_at, updated_at";

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, input: &CreateProductInput) -> Result<Product>;

    /// Overwrite every editable column
    async fn update(&self, product: &Product) -> Result<Product>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Featured first, then newest
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create(&self, input: &CreateProductInput) -> Result<Product> {
        let now = Utc::now();
        let sql = "INSERT INTO products (name, description, price_cents, image_url, category, stock, \
                   featured, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(input.name.trim())
            .bind(input.description.as_deref().unwrap_or(""))
            .bind(input.price_cents)
            .bind(&input.image_url)
            .bind(input.category.as_deref().unwrap_or(""))
            .bind(input.stock)
            .bind(input.featured)
            .bind(input.active.unwrap_or(true))
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to insert product")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Product not found after insert")
    }

    async fn update(&self, product: &Product) -> Result<Product> {
        let sql = "UPDATE products SET name = ?, description = ?, price_cents = ?, image_url = ?, \
                   category = ?, stock = ?, featured = ?, active = ?, updated_at = ? WHERE id = ?";
        with_pool!(self.pool, |p| {
            sqlx::query(sql)
                .bind(&product.name)
                .bind(&product.description)
                .bind(product.price_cents)
                .bind(&product.image_url)
                .bind(&product.category)
                .bind(product.stock)
                .bind(product.featured)
                .bind(product.active)
                .bind(Utc::now())
                .bind(product.id)
                .execute(p)
                .await
                .context("Failed to update product")?;
        });

        self.get_by_id(product.id)
            .await?
            .context("Product not found after update")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut conditions: Vec<&str> = Vec::new();
        if !filter.include_inactive {
            conditions.push("active = ?");
        }
        if filter.category.is_some() {
            conditions.push("category = ?");
        }
        if filter.featured.is_some() {
            conditions.push("featured = ?");
        }
        if filter.q.is_some() {
            conditions.push("(LOWER(name) LIKE LOWER(?) ESCAPE '!' OR LOWER(description) LIKE LOWER(?) ESCAPE '!')");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM products {} ORDER BY featured DESC, created_at DESC, id DESC",
            COLUMNS, where_clause
        );
        let pattern = filter.q.as_deref().map(like_pattern);

        let rows = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, Product>(&sql);
            if !filter.include_inactive {
                query = query.bind(true);
            }
            if let Some(category) = filter.category.as_deref() {
                query = query.bind(category);
            }
            if let Some(featured) = filter.featured {
                query = query.bind(featured);
            }
            if let Some(pattern) = pattern.as_deref() {
                query = query.bind(pattern).bind(pattern);
            }
            query.fetch_all(p).await?
        });
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete product")?
            .rows_affected());
        Ok(affected > 0)
    }
}
