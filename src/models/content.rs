//! Content model
//!
//! Every publishable item (article, book, lesson, sermon, video, community
//! post) is a row of the `contents` table, discriminated by `ContentKind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

/// The kind of a content row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Book,
    Lesson,
    Sermon,
    Video,
    CommunityPost,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Article,
        ContentKind::Book,
        ContentKind::Lesson,
        ContentKind::Sermon,
        ContentKind::Video,
        ContentKind::CommunityPost,
    ];

    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Book => "book",
            ContentKind::Lesson => "lesson",
            ContentKind::Sermon => "sermon",
            ContentKind::Video => "video",
            ContentKind::CommunityPost => "community_post",
        }
    }

    /// Path segment used by page and API routes (`/articles`, `/community`, ...)
    pub fn route_slug(&self) -> &'static str {
        match self {
            ContentKind::Article => "articles",
            ContentKind::Book => "books",
            ContentKind::Lesson => "lessons",
            ContentKind::Sermon => "sermons",
            ContentKind::Video => "videos",
            ContentKind::CommunityPost => "community",
        }
    }

    pub fn from_route_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.route_slug() == slug)
    }

    /// Heading shown on list pages
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Article => "Articles",
            ContentKind::Book => "Books",
            ContentKind::Lesson => "Lessons",
            ContentKind::Sermon => "Sermons",
            ContentKind::Video => "Videos",
            ContentKind::CommunityPost => "Community",
        }
    }

    /// Kinds whose markdown body is mandatory
    pub fn requires_body(&self) -> bool {
        matches!(
            self,
            ContentKind::Article | ContentKind::Lesson | ContentKind::Sermon | ContentKind::CommunityPost
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("content kind", s))
    }
}

impl TryFrom<String> for ContentKind {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Publication state gating public visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PublishStatus::Draft),
            "published" => Ok(PublishStatus::Published),
            _ => Err(ParseEnumError::new("publish status", s)),
        }
    }
}

impl TryFrom<String> for PublishStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Content entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Content {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// Markdown source
    pub body: String,
    /// Rendered from `body` on every write
    pub body_html: String,
    pub category: String,
    pub author_name: String,
    /// Book file link or YouTube URL
    pub media_url: Option<String>,
    pub thumbnail: Option<String>,
    #[sqlx(try_from = "String")]
    pub publish_status: PublishStatus,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn is_published(&self) -> bool {
        self.publish_status == PublishStatus::Published
    }
}

/// Input for creating a content row. The kind comes from the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateContentInput {
    pub title: String,
    /// Generated from the title when absent
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub author_name: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail: Option<String>,
    pub publish_status: Option<PublishStatus>,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateContentInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub author_name: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail: Option<String>,
    pub publish_status: Option<PublishStatus>,
}

/// Row values written by the repository after the service has validated
/// and rendered an input.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub body_html: String,
    pub category: String,
    pub author_name: String,
    pub media_url: Option<String>,
    pub thumbnail: Option<String>,
    pub publish_status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
}

/// List filters
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub category: Option<String>,
    /// Substring matched against title, summary and body
    pub q: Option<String>,
    /// Restrict to published rows
    pub published_only: bool,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// 1-indexed
    pub page: u32,
    pub per_page: u32,
}

impl ListParams {
    pub const DEFAULT_PER_PAGE: u32 = 12;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Build from optional query values, applying defaults and clamping
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), per_page.unwrap_or(Self::DEFAULT_PER_PAGE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let total = self.total as u64;
        let per_page = u64::from(self.per_page);
        ((total + per_page - 1) / per_page) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
