//! Shop catalogue models: products, gallery images and reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A product of the flower shop. Prices are stored in cents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub category: String,
    pub stock: i64,
    pub featured: bool,
    /// Inactive products are hidden from the storefront
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock: i64,
    pub featured: bool,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

/// Catalogue filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
    /// Admin listings include inactive products
    #[serde(skip)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GalleryImage {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateGalleryImageInput {
    pub title: String,
    pub image_url: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub author_name: String,
    /// 1..=5
    pub rating: i64,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateReviewInput {
    pub author_name: String,
    pub rating: i64,
    pub body: String,
}
