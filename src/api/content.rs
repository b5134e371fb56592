//! Content API endpoints
//!
//! Public:
//! - GET  /api/v1/content/{kind}                     - Published list
//! - GET  /api/v1/content/{kind}/categories          - Categories in use
//! - GET  /api/v1/content/{kind}/{slug}              - Detail, counts a view
//! - GET  /api/v1/content/{kind}/{slug}/pdf          - PDF download
//! - GET  /api/v1/content/{kind}/{slug}/comments     - Approved comments
//! - POST /api/v1/content/{kind}/{slug}/comments     - Submit a comment
//!
//! Admin:
//! - GET    /api/v1/admin/content/{kind}             - Any status
//! - POST   /api/v1/admin/content/{kind}             - Create
//! - GET    /api/v1/admin/content/{kind}/{id}
//! - PUT    /api/v1/admin/content/{kind}/{id}        - Partial update
//! - PUT    /api/v1/admin/content/{kind}/{id}/status - Publish / unpublish
//! - DELETE /api/v1/admin/content/{kind}/{id}

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ContentSummary, PagedResponse};
use crate::models::{
    Comment, Content, ContentKind, CreateCommentInput, CreateContentInput, ListParams,
    PublicComment, PublishStatus, UpdateContentInput,
};
use crate::services::export::{content_pdf, pdf_filename};

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    fn params(&self) -> ListParams {
        ListParams::from_query(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: PublishStatus,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(list_published))
        .route("/{kind}/categories", get(categories))
        .route("/{kind}/{slug}", get(detail))
        .route("/{kind}/{slug}/pdf", get(download_pdf))
        .route("/{kind}/{slug}/comments", get(list_comments).post(submit_comment))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(admin_list).post(admin_create))
        .route("/{kind}/{id}", get(admin_get).put(admin_update).delete(admin_delete))
        .route("/{kind}/{id}/status", put(admin_set_status))
}

/// Map a route segment (`articles`, `community`, ...) to its kind
pub fn parse_kind(segment: &str) -> Result<ContentKind, ApiError> {
    ContentKind::from_route_slug(segment)
        .ok_or_else(|| ApiError::not_found(format!("Unknown content type: {}", segment)))
}

async fn list_published(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedResponse<ContentSummary>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let result = state
        .content_service
        .list_published(kind, query.category.as_deref(), query.q.as_deref(), &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn categories(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.content_service.categories(kind).await?))
}

/// Counts the view before loading, so a missing or draft slug is a 404 either way
async fn detail(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Result<Json<Content>, ApiError> {
    let kind = parse_kind(&kind)?;
    state.content_service.record_view(kind, &slug).await?;
    Ok(Json(state.content_service.get_published(kind, &slug).await?))
}

async fn download_pdf(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind)?;
    let content = state.content_service.get_published(kind, &slug).await?;

    let pdf = content_pdf(&content, &state.markdown).map_err(ApiError::internal)?;
    let disposition = format!("attachment; filename=\"{}\"", pdf_filename(&content));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

async fn list_comments(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Result<Json<Vec<PublicComment>>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.comment_service.list_approved(kind, &slug).await?))
}

async fn submit_comment(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let kind = parse_kind(&kind)?;
    let comment = state.comment_service.submit(kind, &slug, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// ============================================================================
// Admin
// ============================================================================

/// Load a row and check it belongs to the kind in the path
async fn content_of_kind(state: &AppState, kind: &str, id: i64) -> Result<Content, ApiError> {
    let kind = parse_kind(kind)?;
    let content = state.content_service.get_by_id(id).await?;
    if content.kind != kind {
        return Err(ApiError::not_found("Content not found"));
    }
    Ok(content)
}

async fn admin_list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedResponse<ContentSummary>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let result = state
        .content_service
        .list_all(kind, query.category.as_deref(), query.q.as_deref(), &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn admin_create(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<CreateContentInput>,
) -> Result<(StatusCode, Json<Content>), ApiError> {
    let kind = parse_kind(&kind)?;
    let content = state.content_service.create(kind, input).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

async fn admin_get(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<Content>, ApiError> {
    Ok(Json(content_of_kind(&state, &kind, id).await?))
}

async fn admin_update(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(input): Json<UpdateContentInput>,
) -> Result<Json<Content>, ApiError> {
    content_of_kind(&state, &kind, id).await?;
    Ok(Json(state.content_service.update(id, input).await?))
}

async fn admin_set_status(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Content>, ApiError> {
    content_of_kind(&state, &kind, id).await?;
    Ok(Json(state.content_service.set_status(id, body.status).await?))
}

async fn admin_delete(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    content_of_kind(&state, &kind, id).await?;
    state.content_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
