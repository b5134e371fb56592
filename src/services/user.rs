//! CMS admin users and login.
//!
//! The first admin is created through the one-time setup endpoint; after
//! that only admins can add or remove users.

use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::db::is_unique_violation;
use crate::db::repositories::AdminUserRepository;
use crate::models::{AdminRole, AdminUser, CreateAdminUserInput, LoginInput};
use crate::services::jwt::{JwtManager, TokenError};
use crate::services::password::{hash_password, password_problem, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::validation::{is_valid_email, required};

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Too many login attempts, please try again later")]
    RateLimited,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for UserServiceError {
    fn from(err: TokenError) -> Self {
        UserServiceError::Internal(anyhow::anyhow!(err))
    }
}

/// A successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: AdminUser,
    pub token: String,
}

pub struct UserService {
    repo: Arc<dyn AdminUserRepository>,
    jwt: Arc<JwtManager>,
    limiter: Arc<LoginRateLimiter>,
}

impl UserService {
    pub fn new(repo: Arc<dyn AdminUserRepository>, jwt: Arc<JwtManager>, limiter: Arc<LoginRateLimiter>) -> Self {
        Self { repo, jwt, limiter }
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown usernames and wrong passwords give the same error.
    pub async fn login(&self, input: LoginInput, ip: Option<IpAddr>) -> Result<LoginOutcome, UserServiceError> {
        let username = input.username.trim();
        if username.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::Validation("Username and password are required".to_string()));
        }

        if self.limiter.check_login(ip, username).await {
            tracing::warn!("Login rate limit hit for {} from {:?}", username, ip);
            return Err(UserServiceError::RateLimited);
        }

        let user = match self.repo.get_by_username(username).await? {
            Some(user) if verify_password(&input.password, &user.password_hash)? => user,
            _ => {
                self.limiter.record_failed_attempt(username).await;
                tracing::info!("Failed admin login for {}", username);
                return Err(UserServiceError::InvalidCredentials);
            }
        };

        self.limiter.clear_username_attempts(username).await;
        let token = self.jwt.issue(&user)?;
        tracing::info!("Admin {} logged in", user.username);
        Ok(LoginOutcome { user, token })
    }

    pub async fn has_admin(&self) -> Result<bool, UserServiceError> {
        Ok(self.repo.count_admins().await? > 0)
    }

    /// Create the first admin. Refused once any admin exists.
    pub async fn setup(&self, input: CreateAdminUserInput) -> Result<AdminUser, UserServiceError> {
        if self.has_admin().await? {
            return Err(UserServiceError::Forbidden("Setup has already been completed".to_string()));
        }
        self.create(CreateAdminUserInput {
            role: Some(AdminRole::Admin),
            ..input
        })
        .await
    }

    pub async fn create(&self, input: CreateAdminUserInput) -> Result<AdminUser, UserServiceError> {
        let invalid = UserServiceError::Validation;

        let username = required(&input.username, "Username is required").map_err(invalid)?;
        if username.chars().count() < 3 || username.chars().count() > 50 {
            return Err(invalid("Username must be 3-50 characters".to_string()));
        }
        if !username.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')) {
            return Err(invalid("Username may only contain letters, digits, '.', '_' and '-'".to_string()));
        }
        let email = required(&input.email, "Email is required").map_err(invalid)?;
        if !is_valid_email(&email) {
            return Err(invalid("Invalid email address".to_string()));
        }
        if let Some(problem) = password_problem(&input.password) {
            return Err(invalid(problem));
        }

        let hash = hash_password(&input.password)?;
        let role = input.role.unwrap_or_default();

        match self.repo.create(&username, &email, &hash, role).await {
            Ok(user) => {
                tracing::info!("Created {} account {}", user.role, user.username);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(UserServiceError::Conflict("Username is already taken".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<AdminUser, UserServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound("User not found".to_string()))
    }

    pub async fn list(&self) -> Result<Vec<AdminUser>, UserServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Delete a user. Nobody deletes their own account or the last admin.
    pub async fn delete(&self, id: i64, acting_user_id: i64) -> Result<(), UserServiceError> {
        if id == acting_user_id {
            return Err(UserServiceError::Forbidden("You cannot delete your own account".to_string()));
        }

        let target = self.get_by_id(id).await?;
        if target.is_admin() && self.repo.count_admins().await? <= 1 {
            return Err(UserServiceError::Forbidden("The last admin cannot be deleted".to_string()));
        }

        self.repo.delete(id).await?;
        tracing::info!("Deleted admin user {}", target.username);
        Ok(())
    }
}
