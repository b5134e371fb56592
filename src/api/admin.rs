//! Admin dashboard
//!
//! - GET /api/v1/admin/dashboard - Row counts and request stats

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::middleware::{ApiError, AppState};
use crate::models::ContentKind;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Rows per kind, keyed by route segment, any status
    pub content: BTreeMap<&'static str, i64>,
    pub pending_comments: i64,
    pub active_subscribers: i64,
    pub unread_messages: i64,
    pub requests: RequestStatsResponse,
}

#[derive(Debug, Serialize)]
pub struct RequestStatsResponse {
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    pub uptime_seconds: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let (counts, pending_comments, active_subscribers, unread_messages) = tokio::try_join!(
        async { state.content_service.count_by_kind().await.map_err(ApiError::from) },
        async { state.comment_service.count_pending().await.map_err(ApiError::from) },
        async { state.subscriber_service.count_active().await.map_err(ApiError::from) },
        async { state.contact_service.count_unread().await.map_err(ApiError::from) },
    )?;

    let content = ContentKind::ALL
        .iter()
        .map(|kind| (kind.route_slug(), counts.get(kind).copied().unwrap_or(0)))
        .collect();

    let stats = &state.request_stats;
    Ok(Json(DashboardResponse {
        content,
        pending_comments,
        active_subscribers,
        unread_messages,
        requests: RequestStatsResponse {
            total_requests: stats.total_requests(),
            avg_response_time_ms: (stats.avg_response_time_ms() * 100.0).round() / 100.0,
            uptime_seconds: stats.uptime_seconds(),
        },
    }))
}
