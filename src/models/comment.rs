//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Comment entity. New comments start unapproved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content_id: i64,
    pub author_name: String,
    pub email: Option<String>,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Public projection of an approved comment; the email is replaced by its
/// Gravatar URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicComment {
    pub id: i64,
    pub author_name: String,
    pub body: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(comment: Comment) -> Self {
        Self {
            avatar_url: gravatar_url(comment.email.as_deref()),
            id: comment.id,
            author_name: comment.author_name,
            body: comment.body,
            created_at: comment.created_at,
        }
    }
}

/// Gravatar URL for an email, falling back to the mystery-person image
pub fn gravatar_url(email: Option<&str>) -> String {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => {
            let hash = format!("{:x}", md5::compute(e.to_lowercase()));
            format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
        }
        None => "https://www.gravatar.com/avatar/?d=mp&s=80".to_string(),
    }
}

/// Input for submitting a comment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateCommentInput {
    pub author_name: String,
    pub email: Option<String>,
    pub body: String,
}
