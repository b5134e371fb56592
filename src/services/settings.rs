//! Settings service
//!
//! Footer details shown on every public page, stored as key/value rows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::SettingsRepository;
use crate::services::validation::{is_valid_email, max_chars};

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const ABOUT: &str = "about";
    pub const ADDRESS: &str = "address";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const FACEBOOK_URL: &str = "facebook_url";
    pub const YOUTUBE_URL: &str = "youtube_url";
    pub const TELEGRAM_URL: &str = "telegram_url";
    pub const COPYRIGHT: &str = "copyright";

    pub const FOOTER: [&str; 9] = [
        SITE_NAME,
        ABOUT,
        ADDRESS,
        PHONE,
        EMAIL,
        FACEBOOK_URL,
        YOUTUBE_URL,
        TELEGRAM_URL,
        COPYRIGHT,
    ];
}

const CACHE_KEY_FOOTER: &str = "settings:footer";

const MAX_VALUE_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterSettings {
    pub site_name: String,
    pub about: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub facebook_url: String,
    pub youtube_url: String,
    pub telegram_url: String,
    pub copyright: String,
}

impl Default for FooterSettings {
    fn default() -> Self {
        Self {
            site_name: "Minbar".to_string(),
            about: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            facebook_url: String::new(),
            youtube_url: String::new(),
            telegram_url: String::new(),
            copyright: "© Minbar".to_string(),
        }
    }
}

impl FooterSettings {
    fn from_map(mut map: HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let mut take = |key: &str, default: String| map.remove(key).unwrap_or(default);

        Self {
            site_name: take(keys::SITE_NAME, defaults.site_name),
            about: take(keys::ABOUT, defaults.about),
            address: take(keys::ADDRESS, defaults.address),
            phone: take(keys::PHONE, defaults.phone),
            email: take(keys::EMAIL, defaults.email),
            facebook_url: take(keys::FACEBOOK_URL, defaults.facebook_url),
            youtube_url: take(keys::YOUTUBE_URL, defaults.youtube_url),
            telegram_url: take(keys::TELEGRAM_URL, defaults.telegram_url),
            copyright: take(keys::COPYRIGHT, defaults.copyright),
        }
    }

    fn to_map(&self) -> HashMap<String, String> {
        [
            (keys::SITE_NAME, &self.site_name),
            (keys::ABOUT, &self.about),
            (keys::ADDRESS, &self.address),
            (keys::PHONE, &self.phone),
            (keys::EMAIL, &self.email),
            (keys::FACEBOOK_URL, &self.facebook_url),
            (keys::YOUTUBE_URL, &self.youtube_url),
            (keys::TELEGRAM_URL, &self.telegram_url),
            (keys::COPYRIGHT, &self.copyright),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect()
    }
}

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<Cache>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Footer settings, defaults filling any key never saved
    pub async fn footer(&self) -> Result<FooterSettings, SettingsServiceError> {
        if let Some(cached) = self.cache.get::<FooterSettings>(CACHE_KEY_FOOTER).await.ok().flatten() {
            return Ok(cached);
        }

        let stored = self.repo.get_many(&keys::FOOTER).await?;
        let footer = FooterSettings::from_map(stored);

        let _ = self
            .cache
            .set(CACHE_KEY_FOOTER, &footer, self.cache.default_ttl())
            .await;
        Ok(footer)
    }

    /// Overwrite every footer key
    pub async fn update_footer(&self, footer: &FooterSettings) -> Result<FooterSettings, SettingsServiceError> {
        let map = footer.to_map();

        for (key, value) in &map {
            max_chars(value, MAX_VALUE_CHARS, key).map_err(SettingsServiceError::Validation)?;
        }
        if map.get(keys::SITE_NAME).map_or(true, |v| v.is_empty()) {
            return Err(SettingsServiceError::Validation("Site name is required".to_string()));
        }
        if let Some(email) = map.get(keys::EMAIL).filter(|e| !e.is_empty()) {
            if !is_valid_email(email) {
                return Err(SettingsServiceError::Validation("Invalid email address".to_string()));
            }
        }

        self.repo.set_many(&map).await?;
        if let Err(e) = self.cache.delete(CACHE_KEY_FOOTER).await {
            tracing::warn!("Failed to invalidate {}: {}", CACHE_KEY_FOOTER, e);
        }

        tracing::info!("Footer settings updated");
        Ok(FooterSettings::from_map(map))
    }
}
