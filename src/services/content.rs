//! Content service
//!
//! Business rules shared by every publishable kind: validation, slugs,
//! Markdown rendering, the publish lifecycle and caching of public reads.
//!
//! Per-kind rules:
//! - Articles, lessons, sermons and community posts need a body
//! - Videos need a YouTube link; the thumbnail defaults to YouTube's
//! - Books need a file link

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{Cache, CacheLayer};
use crate::db::is_unique_violation;
use crate::db::repositories::ContentRepository;
use crate::models::{
    Content, ContentDraft, ContentFilter, ContentKind, CreateContentInput, ListParams,
    PagedResult, PublishStatus, UpdateContentInput,
};
use crate::services::markdown::MarkdownRenderer;
use crate::services::oembed::{extract_youtube_id, youtube_thumbnail};
use crate::services::slug::{candidate, generate_slug};
use crate::services::validation::{max_chars, optional};

pub const MAX_TITLE_CHARS: usize = 255;

/// Summaries derived from the body are cut to this many characters
const AUTO_SUMMARY_CHARS: usize = 200;

/// Lists refresh faster than single rows
const LIST_CACHE_TTL_SECS: u64 = 120;

const CACHE_KEY_PREFIX: &str = "content:";

#[derive(Debug, Error)]
pub enum ContentServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Editable fields after merging an input over the stored row
struct Fields {
    title: String,
    summary: String,
    body: String,
    category: String,
    author_name: String,
    media_url: Option<String>,
    thumbnail: Option<String>,
}

pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepository>, cache: Arc<Cache>, markdown: MarkdownRenderer) -> Self {
        Self { repo, cache, markdown }
    }

    // ---- public reads ----

    /// Published rows of a kind, newest first
    pub async fn list_published(
        &self,
        kind: ContentKind,
        category: Option<&str>,
        q: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Content>, ContentServiceError> {
        let category = optional(category);
        let q = optional(q);

        // free-text queries are too varied to be worth caching
        let cache_key = q.is_none().then(|| {
            format!(
                "{}{}:list:{}:{}:{}",
                CACHE_KEY_PREFIX,
                kind.as_str(),
                params.page,
                params.per_page,
                category.as_deref().unwrap_or("")
            )
        });

        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get::<PagedResult<Content>>(key).await.ok().flatten() {
                return Ok(cached);
            }
        }

        let filter = ContentFilter {
            category,
            q,
            published_only: true,
        };
        let (items, total) = self.repo.list(kind, &filter, params).await?;
        let result = PagedResult::new(items, total, params);

        if let Some(key) = &cache_key {
            let _ = self
                .cache
                .set(key, &result, Duration::from_secs(LIST_CACHE_TTL_SECS))
                .await;
        }

        Ok(result)
    }

    /// The newest `limit` published rows of a kind, for the home page
    pub async fn latest(&self, kind: ContentKind, limit: u32) -> Result<Vec<Content>, ContentServiceError> {
        Ok(self
            .list_published(kind, None, None, &ListParams::new(1, limit))
            .await?
            .items)
    }

    /// A row only if it exists and is published
    pub async fn get_published(&self, kind: ContentKind, slug: &str) -> Result<Content, ContentServiceError> {
        let cache_key = format!("{}{}:slug:{}", CACHE_KEY_PREFIX, kind.as_str(), slug);
        if let Some(content) = self.cache.get::<Content>(&cache_key).await.ok().flatten() {
            return Ok(content);
        }

        let content = self
            .repo
            .get_by_slug(kind, slug)
            .await?
            .filter(Content::is_published)
            .ok_or_else(|| not_found(kind))?;

        let _ = self
            .cache
            .set(&cache_key, &content, self.cache.default_ttl())
            .await;

        Ok(content)
    }

    /// Count one view of a published row.
    ///
    /// The counter is bumped in SQL, so concurrent views are never lost.
    /// Cached copies keep their old count until they expire.
    pub async fn record_view(&self, kind: ContentKind, slug: &str) -> Result<(), ContentServiceError> {
        if self.repo.increment_view(kind, slug).await? {
            Ok(())
        } else {
            Err(not_found(kind))
        }
    }

    pub async fn categories(&self, kind: ContentKind) -> Result<Vec<String>, ContentServiceError> {
        let cache_key = format!("{}{}:categories", CACHE_KEY_PREFIX, kind.as_str());
        if let Some(cached) = self.cache.get::<Vec<String>>(&cache_key).await.ok().flatten() {
            return Ok(cached);
        }

        let categories = self.repo.categories(kind).await?;
        let _ = self
            .cache
            .set(&cache_key, &categories, Duration::from_secs(LIST_CACHE_TTL_SECS))
            .await;
        Ok(categories)
    }

    /// Every published row, for the sitemap
    pub async fn all_published(&self) -> Result<Vec<Content>, ContentServiceError> {
        Ok(self.repo.list_all_published().await?)
    }

    // ---- admin ----

    /// Rows of a kind in any status, newest first
    pub async fn list_all(
        &self,
        kind: ContentKind,
        category: Option<&str>,
        q: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Content>, ContentServiceError> {
        let filter = ContentFilter {
            category: optional(category),
            q: optional(q),
            published_only: false,
        };
        let (items, total) = self.repo.list(kind, &filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Content, ContentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::NotFound("Content not found".to_string()))
    }

    pub async fn count_by_kind(&self) -> Result<HashMap<ContentKind, i64>, ContentServiceError> {
        Ok(self.repo.count_by_kind().await?)
    }

    pub async fn create(&self, kind: ContentKind, input: CreateContentInput) -> Result<Content, ContentServiceError> {
        let fields = self.validate(
            kind,
            Fields {
                title: input.title,
                summary: input.summary.unwrap_or_default(),
                body: input.body.unwrap_or_default(),
                category: input.category.unwrap_or_default(),
                author_name: input.author_name.unwrap_or_default(),
                media_url: optional(input.media_url.as_deref()),
                thumbnail: optional(input.thumbnail.as_deref()),
            },
        )?;

        let slug = match optional(input.slug.as_deref()).map(|s| generate_slug(&s)) {
            Some(slug) if !slug.is_empty() => {
                if self.repo.slug_exists(kind, &slug, None).await? {
                    return Err(slug_taken(&slug));
                }
                slug
            }
            _ => self.unique_slug(kind, &fields.title).await?,
        };

        let status = input.publish_status.unwrap_or_default();
        let published_at = (status == PublishStatus::Published).then(Utc::now);
        let draft = self.draft(kind, slug, fields, status, published_at);

        let content = self.repo.create(&draft).await.map_err(|e| conflict_or_internal(e, &draft.slug))?;

        tracing::info!("Created {} {} ({})", kind.as_str(), content.id, content.slug);
        self.invalidate(kind).await;
        Ok(content)
    }

    /// Partial update. The slug only changes when one is supplied.
    pub async fn update(&self, id: i64, input: UpdateContentInput) -> Result<Content, ContentServiceError> {
        let existing = self.get_by_id(id).await?;
        let kind = existing.kind;

        let fields = self.validate(
            kind,
            Fields {
                title: input.title.unwrap_or(existing.title),
                summary: input.summary.unwrap_or(existing.summary),
                body: input.body.unwrap_or(existing.body),
                category: input.category.unwrap_or(existing.category),
                author_name: input.author_name.unwrap_or(existing.author_name),
                media_url: match input.media_url {
                    Some(url) => optional(Some(&url)),
                    None => existing.media_url,
                },
                thumbnail: match input.thumbnail {
                    Some(url) => optional(Some(&url)),
                    None => existing.thumbnail,
                },
            },
        )?;

        let slug = match input.slug.as_deref().map(generate_slug) {
            Some(slug) if !slug.is_empty() && slug != existing.slug => {
                if self.repo.slug_exists(kind, &slug, Some(id)).await? {
                    return Err(slug_taken(&slug));
                }
                slug
            }
            _ => existing.slug,
        };

        let status = input.publish_status.unwrap_or(existing.publish_status);
        let published_at = publish_stamp(status, existing.published_at);
        let draft = self.draft(kind, slug, fields, status, published_at);

        let content = self
            .repo
            .update(id, &draft)
            .await
            .map_err(|e| conflict_or_internal(e, &draft.slug))?;

        tracing::info!("Updated {} {}", kind.as_str(), id);
        self.invalidate(kind).await;
        Ok(content)
    }

    /// Publish or unpublish. `published_at` is stamped on first publish only.
    pub async fn set_status(&self, id: i64, status: PublishStatus) -> Result<Content, ContentServiceError> {
        self.update(
            id,
            UpdateContentInput {
                publish_status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentServiceError> {
        let existing = self.get_by_id(id).await?;
        self.repo.delete(id).await?;

        tracing::info!("Deleted {} {} ({})", existing.kind.as_str(), id, existing.slug);
        self.invalidate(existing.kind).await;
        Ok(())
    }

    // ---- helpers ----

    fn validate(&self, kind: ContentKind, mut fields: Fields) -> Result<Fields, ContentServiceError> {
        let invalid = ContentServiceError::Validation;

        fields.title = fields.title.trim().to_string();
        if fields.title.is_empty() {
            return Err(invalid("Title is required".to_string()));
        }
        max_chars(&fields.title, MAX_TITLE_CHARS, "Title").map_err(invalid)?;

        if kind.requires_body() && fields.body.trim().is_empty() {
            return Err(invalid("Body is required".to_string()));
        }

        match kind {
            ContentKind::Video => {
                let video_id = fields
                    .media_url
                    .as_deref()
                    .and_then(extract_youtube_id)
                    .ok_or_else(|| invalid("A valid YouTube URL is required for videos".to_string()))?;
                if fields.thumbnail.is_none() {
                    fields.thumbnail = Some(youtube_thumbnail(&video_id));
                }
            }
            ContentKind::Book if fields.media_url.is_none() => {
                return Err(invalid("A file link is required for books".to_string()));
            }
            _ => {}
        }

        fields.summary = fields.summary.trim().to_string();
        if fields.summary.is_empty() && !fields.body.trim().is_empty() {
            fields.summary = self.markdown.excerpt(&fields.body, AUTO_SUMMARY_CHARS);
        }
        fields.category = fields.category.trim().to_string();
        fields.author_name = fields.author_name.trim().to_string();

        Ok(fields)
    }

    fn draft(
        &self,
        kind: ContentKind,
        slug: String,
        fields: Fields,
        publish_status: PublishStatus,
        published_at: Option<chrono::DateTime<Utc>>,
    ) -> ContentDraft {
        ContentDraft {
            kind,
            slug,
            body_html: self.markdown.render(&fields.body),
            title: fields.title,
            summary: fields.summary,
            body: fields.body,
            category: fields.category,
            author_name: fields.author_name,
            media_url: fields.media_url,
            thumbnail: fields.thumbnail,
            publish_status,
            published_at,
        }
    }

    /// First free `slug`, `slug-2`, `slug-3`, ... for a title within a kind
    async fn unique_slug(&self, kind: ContentKind, title: &str) -> Result<String, ContentServiceError> {
        let mut base = generate_slug(title);
        if base.is_empty() {
            base = kind.route_slug().to_string();
        }

        let mut n = 1;
        loop {
            let slug = candidate(&base, n);
            if !self.repo.slug_exists(kind, &slug, None).await? {
                return Ok(slug);
            }
            n += 1;
        }
    }

    /// Drop every cached public read of a kind
    async fn invalidate(&self, kind: ContentKind) {
        let pattern = format!("{}{}:*", CACHE_KEY_PREFIX, kind.as_str());
        if let Err(e) = self.cache.delete_pattern(&pattern).await {
            tracing::warn!("Failed to invalidate {}: {}", pattern, e);
        }
    }
}

fn publish_stamp(
    status: PublishStatus,
    existing: Option<chrono::DateTime<Utc>>,
) -> Option<chrono::DateTime<Utc>> {
    match (status, existing) {
        (PublishStatus::Published, None) => Some(Utc::now()),
        (_, stamp) => stamp,
    }
}

fn not_found(kind: ContentKind) -> ContentServiceError {
    ContentServiceError::NotFound(format!("{} not found", kind.label()))
}

fn slug_taken(slug: &str) -> ContentServiceError {
    ContentServiceError::Conflict(format!("Slug '{}' is already in use", slug))
}

/// A concurrent writer can still claim the slug between check and insert
fn conflict_or_internal(err: anyhow::Error, slug: &str) -> ContentServiceError {
    if is_unique_violation(&err) {
        slug_taken(slug)
    } else {
        ContentServiceError::Internal(err)
    }
}
