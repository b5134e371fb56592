//! Contact form endpoints
//!
//! - POST   /api/v1/contact
//! - GET    /api/v1/admin/contact
//! - PUT    /api/v1/admin/contact/{id}/read
//! - DELETE /api/v1/admin/contact/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ContactInput, ContactMessage};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages))
        .route("/{id}/read", put(mark_read))
        .route("/{id}", delete(delete_message))
}

async fn submit(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    let message = state.contact_service.submit(input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    Ok(Json(state.contact_service.list().await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContactMessage>, ApiError> {
    Ok(Json(state.contact_service.mark_read(id).await?))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
