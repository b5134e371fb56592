//! Site settings and admin UI translations
//!
//! - GET    /api/v1/site/footer
//! - GET    /api/v1/translations/{locale}
//! - PUT    /api/v1/admin/site/footer
//! - GET    /api/v1/admin/translations?locale=xx
//! - PUT    /api/v1/admin/translations        - Insert or replace one key
//! - DELETE /api/v1/admin/translations/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Translation, UpsertTranslationInput};
use crate::services::FooterSettings;

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/site/footer", get(get_footer))
        .route("/translations/{locale}", get(get_translations))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/site/footer", put(update_footer))
        .route("/translations", get(list_translations).put(upsert_translation))
        .route("/translations/{id}", delete(delete_translation))
}

async fn get_footer(State(state): State<AppState>) -> Result<Json<FooterSettings>, ApiError> {
    Ok(Json(state.settings_service.footer().await?))
}

async fn update_footer(
    State(state): State<AppState>,
    Json(footer): Json<FooterSettings>,
) -> Result<Json<FooterSettings>, ApiError> {
    Ok(Json(state.settings_service.update_footer(&footer).await?))
}

async fn get_translations(
    State(state): State<AppState>,
    Path(locale): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.translation_service.for_locale(&locale).await?))
}

async fn list_translations(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Vec<Translation>>, ApiError> {
    let locale = query.locale.as_deref().filter(|l| !l.is_empty());
    Ok(Json(state.translation_service.list(locale).await?))
}

async fn upsert_translation(
    State(state): State<AppState>,
    Json(input): Json<UpsertTranslationInput>,
) -> Result<Json<Translation>, ApiError> {
    Ok(Json(state.translation_service.upsert(input).await?))
}

async fn delete_translation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.translation_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
