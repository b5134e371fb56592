//! Flower shop endpoints
//!
//! Public:
//! - GET  /api/v1/shop/products
//! - GET  /api/v1/shop/products/{id}
//! - GET  /api/v1/shop/products/{id}/reviews
//! - POST /api/v1/shop/products/{id}/reviews
//! - GET  /api/v1/shop/gallery
//! - POST /api/v1/shop/orders
//!
//! Shop admin (session cookie):
//! - GET/POST       /api/v1/shop/admin/products
//! - GET/PUT/DELETE /api/v1/shop/admin/products/{id}
//! - POST           /api/v1/shop/admin/gallery
//! - DELETE         /api/v1/shop/admin/gallery/{id}
//! - GET            /api/v1/shop/admin/reviews
//! - PUT            /api/v1/shop/admin/reviews/{id}/approve
//! - DELETE         /api/v1/shop/admin/reviews/{id}
//! - GET            /api/v1/shop/admin/orders?status=pending
//! - GET            /api/v1/shop/admin/orders/{id}
//! - PUT            /api/v1/shop/admin/orders/{id}/status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::SuccessResponse;
use crate::models::{
    CreateGalleryImageInput, CreateProductInput, CreateReviewInput, GalleryImage, Order,
    OrderStatus, PlaceOrderInput, Product, ProductFilter, Review, UpdateProductInput,
};

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", get(list_reviews).post(submit_review))
        .route("/gallery", get(list_gallery))
        .route("/orders", post(place_order))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin_list_products).post(admin_create_product))
        .route(
            "/products/{id}",
            get(admin_get_product)
                .put(admin_update_product)
                .delete(admin_delete_product),
        )
        .route("/gallery", post(admin_create_image))
        .route("/gallery/{id}", delete(admin_delete_image))
        .route("/reviews", get(admin_pending_reviews))
        .route("/reviews/{id}/approve", put(admin_approve_review))
        .route("/reviews/{id}", delete(admin_delete_review))
        .route("/orders", get(admin_list_orders))
        .route("/orders/{id}", get(admin_get_order))
        .route("/orders/{id}/status", put(admin_update_order_status))
}

// ============================================================================
// Storefront
// ============================================================================

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.product_service.list_active(filter).await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.product_service.get_active(id).await?))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.review_service.list_approved(id).await?))
}

async fn submit_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateReviewInput>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state.review_service.submit(id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn list_gallery(State(state): State<AppState>) -> Result<Json<Vec<GalleryImage>>, ApiError> {
    Ok(Json(state.gallery_service.list().await?))
}

/// Any total sent by the client is ignored
async fn place_order(
    State(state): State<AppState>,
    Json(input): Json<PlaceOrderInput>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.order_service.place(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

// ============================================================================
// Shop admin
// ============================================================================

async fn admin_list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.product_service.list_all(filter).await?))
}

async fn admin_create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.product_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn admin_get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.product_service.get_by_id(id).await?))
}

async fn admin_update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.product_service.update(id, input).await?))
}

async fn admin_delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.product_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_create_image(
    State(state): State<AppState>,
    Json(input): Json<CreateGalleryImageInput>,
) -> Result<(StatusCode, Json<GalleryImage>), ApiError> {
    let image = state.gallery_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn admin_delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.gallery_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_pending_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.review_service.list_pending().await?))
}

async fn admin_approve_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.review_service.approve(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn admin_delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.review_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.order_service.list(query.status).await?))
}

async fn admin_get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.get(id).await?))
}

async fn admin_update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<OrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.update_status(id, body.status).await?))
}
