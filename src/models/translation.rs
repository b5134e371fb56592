//! Admin UI translation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One translated string of the admin UI
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Translation {
    pub id: i64,
    pub locale: String,
    #[sqlx(rename = "msg_key")]
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpsertTranslationInput {
    pub locale: String,
    pub key: String,
    pub value: String,
}
