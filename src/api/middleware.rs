//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its conversions from service errors
//! - CMS admin authentication (JWT in `admin_token` cookie or Bearer header)
//! - Shop admin authentication (`shop_session` cookie)
//! - Request statistics

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::models::{AdminRole, ShopAccount};
use crate::services::{
    Claims, CommentService, CommentServiceError, ContactService, ContactServiceError,
    ContentService, ContentServiceError, GalleryService, GalleryServiceError, JwtManager,
    LoginRateLimiter, MarkdownRenderer, OEmbedClient, OEmbedError, OrderService,
    OrderServiceError, ProductService, ProductServiceError, ReviewService, ReviewServiceError, SearchService,
    SearchServiceError, SettingsService, SettingsServiceError, ShopAuthError, ShopAuthService,
    SubscriberService, SubscriberServiceError, TokenError, TranslationService,
    TranslationServiceError, UploadError, UploadService, UserService, UserServiceError,
    rate_limiter::LOGIN_RETRY_AFTER_SECS,
};
use crate::views::PageRenderer;

pub const ADMIN_COOKIE: &str = "admin_token";
pub const SHOP_COOKIE: &str = "shop_session";

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in milliseconds
    pub fn avg_response_time_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64 / 1000.0
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub markdown: MarkdownRenderer,
    pub content_service: Arc<ContentService>,
    pub search_service: Arc<SearchService>,
    pub comment_service: Arc<CommentService>,
    pub subscriber_service: Arc<SubscriberService>,
    pub contact_service: Arc<ContactService>,
    pub settings_service: Arc<SettingsService>,
    pub translation_service: Arc<TranslationService>,
    pub user_service: Arc<UserService>,
    pub jwt: Arc<JwtManager>,
    pub shop_auth_service: Arc<ShopAuthService>,
    pub upload_service: Arc<UploadService>,
    pub oembed_client: Arc<OEmbedClient>,
    pub product_service: Arc<ProductService>,
    pub gallery_service: Arc<GalleryService>,
    pub review_service: Arc<ReviewService>,
    pub order_service: Arc<OrderService>,
    pub pages: Arc<PageRenderer>,
    pub request_stats: Arc<RequestStats>,
    /// Shared by both login endpoints
    pub rate_limiter: Arc<LoginRateLimiter>,
}

// ============================================================================
// Error envelope
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    fn retry_after(&self) -> Option<u64> {
        self.error.details.as_ref()?.get("retry_after")?.as_u64()
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.retry_after() {
            Some(secs) => (self.status(), [(header::RETRY_AFTER, secs.to_string())], Json(self)).into_response(),
            None => (self.status(), Json(self)).into_response(),
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(err: ContentServiceError) -> Self {
        match err {
            ContentServiceError::Validation(msg) => ApiError::validation_error(msg),
            ContentServiceError::NotFound(msg) => ApiError::not_found(msg),
            ContentServiceError::Conflict(msg) => ApiError::conflict(msg),
            ContentServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<SearchServiceError> for ApiError {
    fn from(err: SearchServiceError) -> Self {
        match err {
            SearchServiceError::Validation(msg) => ApiError::validation_error(msg),
            SearchServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::Validation(msg) => ApiError::validation_error(msg),
            CommentServiceError::NotFound(msg) => ApiError::not_found(msg),
            CommentServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<SubscriberServiceError> for ApiError {
    fn from(err: SubscriberServiceError) -> Self {
        match err {
            SubscriberServiceError::Validation(msg) => ApiError::validation_error(msg),
            SubscriberServiceError::NotFound(msg) => ApiError::not_found(msg),
            SubscriberServiceError::Conflict(msg) => ApiError::conflict(msg),
            SubscriberServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<ContactServiceError> for ApiError {
    fn from(err: ContactServiceError) -> Self {
        match err {
            ContactServiceError::Validation(msg) => ApiError::validation_error(msg),
            ContactServiceError::NotFound(msg) => ApiError::not_found(msg),
            ContactServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::Validation(msg) => ApiError::validation_error(msg),
            SettingsServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<TranslationServiceError> for ApiError {
    fn from(err: TranslationServiceError) -> Self {
        match err {
            TranslationServiceError::Validation(msg) => ApiError::validation_error(msg),
            TranslationServiceError::NotFound(msg) => ApiError::not_found(msg),
            TranslationServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(msg) => ApiError::validation_error(msg),
            UserServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            UserServiceError::RateLimited => ApiError::rate_limited(err.to_string(), LOGIN_RETRY_AFTER_SECS),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::Conflict(msg) => ApiError::conflict(msg),
            UserServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<ShopAuthError> for ApiError {
    fn from(err: ShopAuthError) -> Self {
        match err {
            ShopAuthError::Validation(msg) => ApiError::validation_error(msg),
            ShopAuthError::InvalidCredentials | ShopAuthError::InvalidSession => {
                ApiError::unauthorized(err.to_string())
            }
            ShopAuthError::RateLimited => ApiError::rate_limited(err.to_string(), LOGIN_RETRY_AFTER_SECS),
            ShopAuthError::Forbidden(msg) => ApiError::forbidden(msg),
            ShopAuthError::Conflict(msg) => ApiError::conflict(msg),
            ShopAuthError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Internal(e) => ApiError::internal(e),
            other => ApiError::validation_error(other.to_string()),
        }
    }
}

impl From<OEmbedError> for ApiError {
    fn from(err: OEmbedError) -> Self {
        match err {
            OEmbedError::InvalidUrl => ApiError::validation_error(err.to_string()),
            OEmbedError::Upstream(ref cause) => {
                tracing::warn!("YouTube oEmbed lookup failed: {}", cause);
                ApiError::upstream("Could not fetch video details from YouTube")
            }
        }
    }
}

impl From<ProductServiceError> for ApiError {
    fn from(err: ProductServiceError) -> Self {
        match err {
            ProductServiceError::Validation(msg) => ApiError::validation_error(msg),
            ProductServiceError::NotFound(msg) => ApiError::not_found(msg),
            ProductServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<GalleryServiceError> for ApiError {
    fn from(err: GalleryServiceError) -> Self {
        match err {
            GalleryServiceError::Validation(msg) => ApiError::validation_error(msg),
            GalleryServiceError::NotFound(msg) => ApiError::not_found(msg),
            GalleryServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<ReviewServiceError> for ApiError {
    fn from(err: ReviewServiceError) -> Self {
        match err {
            ReviewServiceError::Validation(msg) => ApiError::validation_error(msg),
            ReviewServiceError::NotFound(msg) => ApiError::not_found(msg),
            ReviewServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<OrderServiceError> for ApiError {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::Validation(msg) => ApiError::validation_error(msg),
            OrderServiceError::NotFound(msg) => ApiError::not_found(msg),
            OrderServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

// ============================================================================
// Request helpers
// ============================================================================

/// Value of a named cookie
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// Admin token: `Authorization: Bearer` first, then the `admin_token` cookie
fn extract_admin_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| read_cookie(headers, ADMIN_COOKIE))
}

/// Client address as reported by a fronting proxy
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().and_then(|s| s.trim().parse().ok()) {
            return Some(ip);
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// `Set-Cookie` value for a session cookie
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_secs
    )
}

/// `Set-Cookie` value that removes a cookie
pub fn expired_cookie(name: &str) -> String {
    session_cookie(name, "", 0)
}

// ============================================================================
// CMS admin authentication
// ============================================================================

/// Verified admin token claims
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Claims);

impl AuthenticatedAdmin {
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.0
            .user_id()
            .ok_or_else(|| ApiError::unauthorized("Invalid token subject"))
    }
}

/// Reject requests without a valid admin JWT
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_admin_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let claims = state.jwt.verify(&token).map_err(|e| match e {
        TokenError::Expired => ApiError::unauthorized("Token has expired"),
        _ => ApiError::unauthorized("Invalid token"),
    })?;

    request.extensions_mut().insert(AuthenticatedAdmin(claims));
    Ok(next.run(request).await)
}

/// Admin-role gate, layered inside `require_auth`
pub async fn require_admin_role(request: Request, next: Next) -> Result<Response, ApiError> {
    let admin = request
        .extensions()
        .get::<AuthenticatedAdmin>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if admin.0.role != AdminRole::Admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAdmin>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// ============================================================================
// Shop admin authentication
// ============================================================================

/// Shop account behind a valid `shop_session` cookie
#[derive(Debug, Clone)]
pub struct ShopAdmin {
    pub account: ShopAccount,
    pub token: String,
}

/// Reject requests without a live shop session
pub async fn require_shop_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = read_cookie(request.headers(), SHOP_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("Not signed in"))?;

    let account = state.shop_auth_service.authenticate(&token).await?;

    request.extensions_mut().insert(ShopAdmin { account, token });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for ShopAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ShopAdmin>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not signed in"))
    }
}

/// Request statistics middleware
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}
