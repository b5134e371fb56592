//! Comment moderation endpoints
//!
//! - GET    /api/v1/admin/comments?pending=true
//! - PUT    /api/v1/admin/comments/{id}/approve
//! - DELETE /api/v1/admin/comments/{id}
//!
//! Public comment reads and submissions live with the content routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::Comment;

#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    #[serde(default)]
    pub pending: bool,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments))
        .route("/{id}/approve", put(approve_comment))
        .route("/{id}", delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.comment_service.list(query.pending).await?))
}

async fn approve_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.comment_service.approve(id).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
