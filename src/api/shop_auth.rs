//! Shop admin authentication endpoints
//!
//! - GET  /api/v1/shop/auth/has-account
//! - POST /api/v1/shop/auth/setup   - Create the first shop account
//! - POST /api/v1/shop/auth/login   - Open a session, set `shop_session`
//! - POST /api/v1/shop/auth/logout  - Delete the session
//! - GET  /api/v1/shop/auth/me      - Requires a session

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{
    client_ip, expired_cookie, read_cookie, session_cookie, ApiError, AppState, ShopAdmin,
    SHOP_COOKIE,
};
use crate::api::responses::SuccessResponse;
use crate::models::{CreateShopAccountInput, ShopAccount, ShopLoginInput};

#[derive(Debug, Serialize)]
pub struct ShopLoginResponse {
    pub account: ShopAccount,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct HasAccountResponse {
    pub has_account: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/has-account", get(has_account))
        .route("/setup", post(setup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

async fn has_account(State(state): State<AppState>) -> Result<Json<HasAccountResponse>, ApiError> {
    Ok(Json(HasAccountResponse {
        has_account: state.shop_auth_service.has_account().await?,
    }))
}

async fn setup(
    State(state): State<AppState>,
    Json(input): Json<CreateShopAccountInput>,
) -> Result<(StatusCode, Json<ShopAccount>), ApiError> {
    let account = state.shop_auth_service.setup(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ShopLoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (account, session) = state
        .shop_auth_service
        .login(input, client_ip(&headers))
        .await?;

    let max_age = state.shop_auth_service.session_ttl().num_seconds();
    let cookie = session_cookie(SHOP_COOKIE, &session.id, max_age);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ShopLoginResponse {
            account,
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

/// Works without a valid session so a stale cookie can always be cleared
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = read_cookie(&headers, SHOP_COOKIE) {
        state.shop_auth_service.logout(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, expired_cookie(SHOP_COOKIE))],
        Json(SuccessResponse::ok()),
    ))
}

async fn me(admin: ShopAdmin) -> Json<ShopAccount> {
    Json(admin.account)
}
