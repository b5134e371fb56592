//! Newsletter endpoints
//!
//! - POST   /api/v1/subscribers              - Subscribe
//! - POST   /api/v1/subscribers/unsubscribe  - Unsubscribe by email
//! - GET    /api/v1/admin/subscribers
//! - DELETE /api/v1/admin/subscribers/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::SuccessResponse;
use crate::models::{SubscribeInput, Subscriber};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnsubscribeRequest {
    pub email: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers))
        .route("/{id}", delete(delete_subscriber))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(input): Json<SubscribeInput>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    let subscriber = state.subscriber_service.subscribe(input).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.subscriber_service.unsubscribe(&body.email).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn list_subscribers(State(state): State<AppState>) -> Result<Json<Vec<Subscriber>>, ApiError> {
    Ok(Json(state.subscriber_service.list().await?))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.subscriber_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
