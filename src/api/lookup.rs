//! Read-only lookups
//!
//! - GET /api/v1/search?q=...&kind=articles
//! - GET /api/v1/oembed/youtube?url=...

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::content::parse_kind;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ContentSummary;
use crate::services::VideoEmbed;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Route segment of a kind (`articles`, `videos`, ...)
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OEmbedQuery {
    #[serde(default)]
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/oembed/youtube", get(youtube))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ContentSummary>>, ApiError> {
    let kind = match query.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(segment) => Some(parse_kind(segment)?),
        None => None,
    };
    let results = state.search_service.search(&query.q, kind).await?;
    Ok(Json(results.into_iter().map(ContentSummary::from).collect()))
}

async fn youtube(
    State(state): State<AppState>,
    Query(query): Query<OEmbedQuery>,
) -> Result<Json<VideoEmbed>, ApiError> {
    Ok(Json(state.oembed_client.youtube(&query.url).await?))
}
