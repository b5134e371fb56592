//! Admin UI translations.
//!
//! The admin front end fetches one locale as a flat `{key: value}` map.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TranslationRepository;
use crate::models::{Translation, UpsertTranslationInput};

static LOCALE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[A-Z]{2})?$").expect("Invalid locale regex"));

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,191}$").expect("Invalid translation key regex"));

const CACHE_KEY_PREFIX: &str = "translations:";

pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE_RE.is_match(locale)
}

#[derive(Debug, Error)]
pub enum TranslationServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct TranslationService {
    repo: Arc<dyn TranslationRepository>,
    cache: Arc<Cache>,
}

impl TranslationService {
    pub fn new(repo: Arc<dyn TranslationRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// All strings of one locale, sorted by key
    pub async fn for_locale(&self, locale: &str) -> Result<BTreeMap<String, String>, TranslationServiceError> {
        check_locale(locale)?;

        let cache_key = format!("{}{}", CACHE_KEY_PREFIX, locale);
        if let Some(cached) = self
            .cache
            .get::<BTreeMap<String, String>>(&cache_key)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }

        let map: BTreeMap<String, String> = self
            .repo
            .list(Some(locale))
            .await?
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect();

        let _ = self.cache.set(&cache_key, &map, self.cache.default_ttl()).await;
        Ok(map)
    }

    pub async fn list(&self, locale: Option<&str>) -> Result<Vec<Translation>, TranslationServiceError> {
        if let Some(locale) = locale {
            check_locale(locale)?;
        }
        Ok(self.repo.list(locale).await?)
    }

    pub async fn upsert(&self, input: UpsertTranslationInput) -> Result<Translation, TranslationServiceError> {
        let locale = input.locale.trim();
        let key = input.key.trim();
        check_locale(locale)?;
        if !KEY_RE.is_match(key) {
            return Err(TranslationServiceError::Validation(
                "Key must be 1-191 letters, digits, '.', '_' or '-'".to_string(),
            ));
        }

        let saved = self.repo.upsert(locale, key, &input.value).await?;
        self.invalidate(&format!("{}{}", CACHE_KEY_PREFIX, locale)).await;
        Ok(saved)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TranslationServiceError> {
        if !self.repo.delete(id).await? {
            return Err(TranslationServiceError::NotFound("Translation not found".to_string()));
        }
        self.invalidate(&format!("{}*", CACHE_KEY_PREFIX)).await;
        Ok(())
    }

    async fn invalidate(&self, pattern: &str) {
        if let Err(e) = self.cache.delete_pattern(pattern).await {
            tracing::warn!("Failed to invalidate {}: {}", pattern, e);
        }
    }
}

fn check_locale(locale: &str) -> Result<(), TranslationServiceError> {
    if is_valid_locale(locale) {
        Ok(())
    } else {
        Err(TranslationServiceError::Validation(format!("Invalid locale: {}", locale)))
    }
}
