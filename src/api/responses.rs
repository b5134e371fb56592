//! Shared API response types
//!
//! Response structures used by more than one group of endpoints.

use serde::Serialize;

use crate::models::{Content, ContentKind, PagedResult, PublishStatus};
use crate::services::sitemap::content_path;

// ============================================================================
// Content Response Types
// ============================================================================

/// Content row without its body, for list views
#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub id: i64,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub author_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub publish_status: PublishStatus,
    pub view_count: i64,
    pub published_at: Option<String>,
    /// Public page of the row
    pub url: String,
}

impl From<Content> for ContentSummary {
    fn from(content: Content) -> Self {
        Self {
            url: content_path(content.kind, &content.slug),
            id: content.id,
            kind: content.kind,
            slug: content.slug,
            title: content.title,
            summary: content.summary,
            category: content.category,
            author_name: content.author_name,
            media_url: content.media_url,
            thumbnail: content.thumbnail,
            publish_status: content.publish_status,
            view_count: content.view_count,
            published_at: content.published_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T, U: From<T>> From<PagedResult<T>> for PagedResponse<U> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            items: result.items.into_iter().map(U::from).collect(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}

/// Body of endpoints that only acknowledge
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;
    use chrono::Utc;

    fn content(slug: &str) -> Content {
        let now = Utc::now();
        Content {
            id: 7,
            kind: ContentKind::Lesson,
            slug: slug.to_string(),
            title: "Patience".to_string(),
            summary: "On sabr".to_string(),
            body: "long body".to_string(),
            body_html: "<p>long body</p>".to_string(),
            category: "tafsir".to_string(),
            author_name: String::new(),
            media_url: None,
            thumbnail: None,
            publish_status: PublishStatus::Published,
            view_count: 3,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summary_carries_url() {
        let summary = ContentSummary::from(content("patience"));
        assert_eq!(summary.url, "/lessons/patience");
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("body").is_none());
        assert!(json.get("thumbnail").is_none());
        assert_eq!(json["kind"], "lesson");
    }

    #[test]
    fn test_paged_response() {
        let params = ListParams::new(2, 1);
        let paged: PagedResponse<ContentSummary> =
            PagedResult::new(vec![content("a")], 3, &params).into();
        assert_eq!(paged.total_pages, 3);
        assert_eq!(paged.page, 2);
        assert_eq!(paged.items.len(), 1);
    }
}
