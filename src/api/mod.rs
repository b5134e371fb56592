//! API layer - HTTP handlers and routing
//!
//! JSON endpoints live under `/api/v1`:
//! - Public content, comments, search, newsletter, contact, footer, translations
//! - CMS auth and the CMS admin tree (`/admin`, JWT)
//! - Shop storefront, shop auth and the shop admin tree (`/shop/admin`, session)
//!
//! HTML pages, uploads, the sitemap and robots.txt are mounted by
//! `build_router` next to the API.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod contact;
pub mod content;
pub mod lookup;
pub mod middleware;
pub mod responses;
pub mod shop;
pub mod shop_auth;
pub mod site;
pub mod subscribers;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let max_upload = state.upload_service.max_file_size();

    // CMS admin routes that need the admin role
    let admin_only = Router::new()
        .nest("/admin/users", auth::users_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin_role));

    // CMS admin routes (any signed-in admin user)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .nest("/admin", site::admin_router())
        .nest("/admin/content", content::admin_router())
        .nest("/admin/comments", comments::admin_router())
        .nest("/admin/subscribers", subscribers::admin_router())
        .nest("/admin/contact", contact::admin_router())
        .nest("/admin/upload", upload::router(max_upload))
        .nest("/auth", auth::protected_router())
        .merge(admin_only)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Shop admin routes
    let shop_admin_routes = Router::new()
        .nest("/shop/admin", shop::admin_router())
        .nest("/shop/admin/upload", upload::router(max_upload))
        .nest("/shop/auth", shop_auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_shop_session,
        ));

    // Public routes
    Router::new()
        .nest("/content", content::public_router())
        .nest("/subscribers", subscribers::public_router())
        .nest("/contact", contact::public_router())
        .nest("/auth", auth::public_router())
        .nest("/shop", shop::public_router())
        .nest("/shop/auth", shop_auth::public_router())
        .merge(site::public_router())
        .merge(lookup::router())
        .merge(admin_routes)
        .merge(shop_admin_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin: {}", cors_origin),
    }

    let uploads = ServeDir::new(state.upload_service.dir());

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()).fallback(api_not_found))
        .nest_service("/uploads", uploads)
        .merge(crate::views::router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Request stats (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}
