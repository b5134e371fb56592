//! Shop admin accounts and server-side sessions.
//!
//! Unlike the CMS admin, the shop admin holds an opaque token in the
//! `shop_session` cookie that is looked up in `shop_sessions` on every
//! request, so logging out revokes it immediately.

use chrono::{Duration, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::db::is_unique_violation;
use crate::db::repositories::ShopAccountRepository;
use crate::models::{CreateShopAccountInput, ShopAccount, ShopLoginInput, ShopSession};
use crate::services::password::{hash_password, password_problem, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::validation::{is_valid_email, optional, required};

/// Length of a session token in hex characters
pub const SESSION_TOKEN_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ShopAuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session expired or invalid")]
    InvalidSession,

    #[error("Too many login attempts, please try again later")]
    RateLimited,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 64 hex characters from two v4 UUIDs (244 random bits)
pub fn generate_session_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

pub struct ShopAuthService {
    repo: Arc<dyn ShopAccountRepository>,
    limiter: Arc<LoginRateLimiter>,
    session_ttl: Duration,
}

impl ShopAuthService {
    pub fn new(repo: Arc<dyn ShopAccountRepository>, limiter: Arc<LoginRateLimiter>, session_days: i64) -> Self {
        Self {
            repo,
            limiter,
            session_ttl: Duration::days(session_days),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn login(
        &self,
        input: ShopLoginInput,
        ip: Option<IpAddr>,
    ) -> Result<(ShopAccount, ShopSession), ShopAuthError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || input.password.is_empty() {
            return Err(ShopAuthError::Validation("Email and password are required".to_string()));
        }

        if self.limiter.check_login(ip, &email).await {
            tracing::warn!("Shop login rate limit hit for {} from {:?}", email, ip);
            return Err(ShopAuthError::RateLimited);
        }

        let account = match self.repo.get_by_email(&email).await? {
            Some(account) if verify_password(&input.password, &account.password_hash)? => account,
            _ => {
                self.limiter.record_failed_attempt(&email).await;
                return Err(ShopAuthError::InvalidCredentials);
            }
        };
        self.limiter.clear_username_attempts(&email).await;

        let token = generate_session_token();
        let session = self
            .repo
            .create_session(&token, account.id, Utc::now() + self.session_ttl)
            .await?;

        tracing::info!("Shop account {} logged in", account.id);
        Ok((account, session))
    }

    /// Resolve a session token. Expired sessions are deleted on sight.
    pub async fn authenticate(&self, token: &str) -> Result<ShopAccount, ShopAuthError> {
        if token.len() != SESSION_TOKEN_LEN || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ShopAuthError::InvalidSession);
        }

        let session = self
            .repo
            .get_session(token)
            .await?
            .ok_or(ShopAuthError::InvalidSession)?;

        if session.is_expired() {
            self.repo.delete_session(token).await?;
            return Err(ShopAuthError::InvalidSession);
        }

        self.repo
            .get_by_id(session.account_id)
            .await?
            .ok_or(ShopAuthError::InvalidSession)
    }

    pub async fn logout(&self, token: &str) -> Result<(), ShopAuthError> {
        self.repo.delete_session(token).await?;
        Ok(())
    }

    pub async fn has_account(&self) -> Result<bool, ShopAuthError> {
        Ok(self.repo.count().await? > 0)
    }

    /// Create the first shop account. Refused once any account exists.
    pub async fn setup(&self, input: CreateShopAccountInput) -> Result<ShopAccount, ShopAuthError> {
        if self.has_account().await? {
            return Err(ShopAuthError::Forbidden("Setup has already been completed".to_string()));
        }

        let invalid = ShopAuthError::Validation;
        let email = required(&input.email, "Email is required").map_err(invalid)?.to_lowercase();
        if !is_valid_email(&email) {
            return Err(invalid("Invalid email address".to_string()));
        }
        if let Some(problem) = password_problem(&input.password) {
            return Err(invalid(problem));
        }
        let display_name = optional(input.display_name.as_deref()).unwrap_or_else(|| email.clone());

        let hash = hash_password(&input.password)?;
        match self.repo.create(&email, &hash, &display_name).await {
            Ok(account) => {
                tracing::info!("Created shop account {}", account.id);
                Ok(account)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(ShopAuthError::Conflict("This email is already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every expired session; returns how many went.
    pub async fn purge_expired(&self) -> Result<u64, ShopAuthError> {
        let removed = self.repo.delete_expired_sessions().await?;
        if removed > 0 {
            tracing::debug!("Purged {} expired shop sessions", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxShopAccountRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_service() -> (ShopAuthService, Arc<dyn ShopAccountRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxShopAccountRepository::boxed(pool);
        let service = ShopAuthService::new(repo.clone(), Arc::new(LoginRateLimiter::new()), 7);
        (service, repo)
    }

    fn account() -> CreateShopAccountInput {
        CreateShopAccountInput {
            email: "Florist@Example.com".to_string(),
            password: "roses-are-red".to_string(),
            display_name: None,
        }
    }

    fn login(password: &str) -> ShopLoginInput {
        ShopLoginInput {
            email: "florist@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_token_shape() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_LEN);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_setup_login_authenticate_logout() {
        let (service, _) = setup_service().await;
        let created = service.setup(account()).await.unwrap();
        assert_eq!(created.email, "florist@example.com");
        assert!(matches!(service.setup(account()).await.unwrap_err(), ShopAuthError::Forbidden(_)));

        let (acct, session) = service.login(login("roses-are-red"), None).await.unwrap();
        assert_eq!(acct.id, created.id);
        let remaining = session.expires_at - Utc::now();
        assert!(remaining > Duration::days(6) && remaining <= Duration::days(7));

        assert_eq!(service.authenticate(&session.id).await.unwrap().id, created.id);

        service.logout(&session.id).await.unwrap();
        assert!(matches!(
            service.authenticate(&session.id).await.unwrap_err(),
            ShopAuthError::InvalidSession
        ));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (service, _) = setup_service().await;
        service.setup(account()).await.unwrap();
        assert!(matches!(
            service.login(login("violets"), None).await.unwrap_err(),
            ShopAuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_purged() {
        let (service, repo) = setup_service().await;
        let created = service.setup(account()).await.unwrap();

        let token = generate_session_token();
        repo.create_session(&token, created.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&token).await.unwrap_err(),
            ShopAuthError::InvalidSession
        ));
        assert!(repo.get_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (service, repo) = setup_service().await;
        let created = service.setup(account()).await.unwrap();

        repo.create_session(&generate_session_token(), created.id, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        let (_, live) = service.login(login("roses-are-red"), None).await.unwrap();

        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(service.authenticate(&live.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let (service, _) = setup_service().await;
        assert!(matches!(service.authenticate("short").await.unwrap_err(), ShopAuthError::InvalidSession));
    }
}
