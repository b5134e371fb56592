//! Shop admin account and session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account allowed into the shop admin panel
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShopAccount {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side session backing the `shop_session` cookie
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShopSession {
    /// Opaque token, also the cookie value
    pub id: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ShopSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShopLoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateShopAccountInput {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = ShopSession {
            id: "a".repeat(64),
            account_id: 1,
            expires_at: now + Duration::days(7),
            created_at: now,
        };
        assert!(!session.is_expired());

        session.expires_at = now - Duration::seconds(1);
        assert!(session.is_expired());
    }
}
