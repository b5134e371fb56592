//! Upload endpoint, mounted under both admin trees
//!
//! - POST /api/v1/admin/upload
//! - POST /api/v1/shop/admin/upload
//!
//! Accepts multipart/form-data with a single field named `file`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::StoredUpload;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(limit))
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredUpload>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // reject before reading any of the body
        state.upload_service.check_type(&content_type)?;

        let stored = state.upload_service.store(&content_type, field).await?;
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(ApiError::validation_error("No file provided"))
}
