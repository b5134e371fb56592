//! Site search over published content.

use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::ContentRepository;
use crate::models::{Content, ContentKind};

/// Results returned per query
pub const MAX_RESULTS: i64 = 50;

/// Longer queries are cut rather than rejected
const MAX_QUERY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum SearchServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct SearchService {
    repo: Arc<dyn ContentRepository>,
}

impl SearchService {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }

    /// Case-insensitive substring match on title, summary and body.
    pub async fn search(&self, q: &str, kind: Option<ContentKind>) -> Result<Vec<Content>, SearchServiceError> {
        let term: String = q.trim().chars().take(MAX_QUERY_CHARS).collect();
        if term.is_empty() {
            return Err(SearchServiceError::Validation("Search query is required".to_string()));
        }

        let results = self.repo.search(&term, kind, MAX_RESULTS).await?;
        tracing::debug!("Search {:?} matched {} rows", term, results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxContentRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ContentDraft, PublishStatus};
    use chrono::Utc;

    fn draft(kind: ContentKind, slug: &str, title: &str, status: PublishStatus) -> ContentDraft {
        ContentDraft {
            kind,
            slug: slug.to_string(),
            title: title.to_string(),
            summary: String::new(),
            body: "body text".to_string(),
            body_html: "<p>body text</p>".to_string(),
            category: String::new(),
            author_name: String::new(),
            media_url: None,
            thumbnail: None,
            publish_status: status,
            published_at: (status == PublishStatus::Published).then(Utc::now),
        }
    }

    async fn setup() -> (SearchService, Arc<dyn ContentRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxContentRepository::boxed(pool);
        (SearchService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let (service, _) = setup().await;
        for q in ["", "   ", "\t\n"] {
            let err = service.search(q, None).await.unwrap_err();
            assert!(matches!(err, SearchServiceError::Validation(ref m) if m == "Search query is required"));
        }
    }

    #[tokio::test]
    async fn test_matches_published_only_case_insensitive() {
        let (service, repo) = setup().await;
        repo.create(&draft(ContentKind::Article, "a", "Ramadan Reminders", PublishStatus::Published)).await.unwrap();
        repo.create(&draft(ContentKind::Lesson, "b", "Ramadan Fiqh", PublishStatus::Published)).await.unwrap();
        repo.create(&draft(ContentKind::Article, "c", "Ramadan Draft", PublishStatus::Draft)).await.unwrap();

        assert_eq!(service.search("ramadan", None).await.unwrap().len(), 2);
        assert_eq!(service.search("RAMADAN", Some(ContentKind::Lesson)).await.unwrap().len(), 1);
        assert!(service.search("zakat", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wildcards_are_literal() {
        let (service, repo) = setup().await;
        repo.create(&draft(ContentKind::Article, "a", "Plain title", PublishStatus::Published)).await.unwrap();

        assert!(service.search("%", None).await.unwrap().is_empty());
        assert!(service.search("_", None).await.unwrap().is_empty());
    }
}
