//! CMS admin authentication endpoints
//!
//! Public:
//! - GET  /api/v1/auth/has-admin - Whether first-run setup is done
//! - POST /api/v1/auth/setup     - Create the first admin
//! - POST /api/v1/auth/login     - Issue a JWT and set the `admin_token` cookie
//! - POST /api/v1/auth/logout    - Clear the cookie
//!
//! Protected:
//! - GET  /api/v1/auth/me
//!
//! Admin role only:
//! - GET    /api/v1/admin/users
//! - POST   /api/v1/admin/users
//! - DELETE /api/v1/admin/users/{id}

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{
    client_ip, expired_cookie, session_cookie, ApiError, AppState, AuthenticatedAdmin,
    ADMIN_COOKIE,
};
use crate::api::responses::SuccessResponse;
use crate::models::{AdminUser, CreateAdminUserInput, LoginInput};

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: AdminUser,
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct HasAdminResponse {
    pub has_admin: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/has-admin", get(has_admin))
        .route("/setup", post(setup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", delete(delete_user))
}

async fn has_admin(State(state): State<AppState>) -> Result<Json<HasAdminResponse>, ApiError> {
    Ok(Json(HasAdminResponse {
        has_admin: state.user_service.has_admin().await?,
    }))
}

/// POST /api/v1/auth/setup - only while no admin exists
async fn setup(
    State(state): State<AppState>,
    Json(input): Json<CreateAdminUserInput>,
) -> Result<(StatusCode, Json<AdminUser>), ApiError> {
    let user = state.user_service.setup(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.user_service.login(input, client_ip(&headers)).await?;

    let max_age = state.jwt.ttl().num_seconds();
    let cookie = session_cookie(ADMIN_COOKIE, &outcome.token, max_age);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: outcome.user,
            token: outcome.token,
            expires_in: max_age,
        }),
    ))
}

/// Tokens are stateless; logging out only drops the cookie
async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_cookie(ADMIN_COOKIE))],
        Json(SuccessResponse::ok()),
    )
}

async fn me(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
) -> Result<Json<AdminUser>, ApiError> {
    let id = admin.user_id()?;
    // a deleted user's token is still signed, so check the row
    let user = state
        .user_service
        .get_by_id(id)
        .await
        .map_err(|_| ApiError::unauthorized("User no longer exists"))?;
    Ok(Json(user))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<AdminUser>>, ApiError> {
    Ok(Json(state.user_service.list().await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateAdminUserInput>,
) -> Result<(StatusCode, Json<AdminUser>), ApiError> {
    let user = state.user_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete(id, admin.user_id()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
