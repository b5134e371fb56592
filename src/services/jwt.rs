//! Admin session tokens.
//!
//! The CMS admin authenticates with an HS256 JWT carried in the
//! `admin_token` cookie or an `Authorization: Bearer` header.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::{AdminRole, AdminUser};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Admin user id
    pub sub: String,
    pub username: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Build from config; without a configured secret, tokens only live as
    /// long as this process.
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = match config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                tracing::warn!("No JWT secret configured; admin logins will not survive a restart");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };
        Self::new(&secret, Duration::hours(config.jwt_ttl_hours))
    }

    /// Lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &AdminUser) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if at `issued_at`
    pub fn issue_at(&self, user: &AdminUser, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Verify signature and expiry. No leeway is granted past `exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AdminUser {
        AdminUser {
            id: 7,
            username: "imam".to_string(),
            email: "imam@example.com".to_string(),
            password_hash: String::new(),
            role: AdminRole::Admin,
            created_at: Utc::now(),
        }
    }

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-long-enough-for-hs256", Duration::hours(24))
    }

    #[test]
    fn test_issue_and_verify() {
        let jwt = manager();
        let token = jwt.issue(&user()).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.user_id(), Some(7));
        assert_eq!(claims.username, "imam");
        assert_eq!(claims.role, AdminRole::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_token_older_than_ttl_is_expired() {
        let jwt = manager();
        let token = jwt
            .issue_at(&user(), Utc::now() - Duration::hours(24) - Duration::seconds(5))
            .unwrap();
        assert!(matches!(jwt.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_just_inside_ttl_is_valid() {
        let jwt = manager();
        let token = jwt
            .issue_at(&user(), Utc::now() - Duration::hours(23))
            .unwrap();
        assert!(jwt.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let token = manager().issue(&user()).unwrap();
        let other = JwtManager::new("a-different-secret", Duration::hours(24));

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
        assert!(matches!(manager().verify("not.a.jwt"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_generated_secret_still_works() {
        let jwt = JwtManager::from_config(&AuthConfig::default());
        let token = jwt.issue(&user()).unwrap();
        assert!(jwt.verify(&token).is_ok());
    }
}
