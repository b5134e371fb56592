//! CMS admin user model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

/// An account allowed into the CMS admin panel
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn is_admin(&self) -> bool {
        self.role == AdminRole::Admin
    }
}

/// Admins manage other users; editors only manage content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    #[default]
    Editor,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::Editor => "editor",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(AdminRole::Admin),
            "editor" => Ok(AdminRole::Editor),
            _ => Err(ParseEnumError::new("admin role", s)),
        }
    }
}

impl TryFrom<String> for AdminRole {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Input for creating an admin user (plaintext password, hashed by the service)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateAdminUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<AdminRole>,
}

/// Login request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}
