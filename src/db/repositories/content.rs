//! Content repository
//!
//! Storage for every publishable kind in the single `contents` table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{like_pattern, with_pool, DynDatabasePool, InsertId};
use crate::models::{Content, ContentDraft, ContentFilter, ContentKind, ListParams};

const COLUMNS: &str = "id, kind, slug, title, summary, body, body_html, category, author_name, \
     media_url, thumbnail, publish_status, view_count, published_at, created_at, updated_at";

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create(&self, draft: &ContentDraft) -> Result<Content>;

    /// Overwrite every editable column of an existing row
    async fn update(&self, id: i64, draft: &ContentDraft) -> Result<Content>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Content>>;

    async fn get_by_slug(&self, kind: ContentKind, slug: &str) -> Result<Option<Content>>;

    /// Whether `slug` is taken within `kind`, ignoring row `exclude_id`
    async fn slug_exists(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Page through a kind. Published listings sort by `published_at`,
    /// admin listings by `created_at`, newest first.
    async fn list(&self, kind: ContentKind, filter: &ContentFilter, params: &ListParams) -> Result<(Vec<Content>, i64)>;

    /// Published rows of any (or one) kind whose title, summary or body
    /// contains `term`
    async fn search(&self, term: &str, kind: Option<ContentKind>, limit: i64) -> Result<Vec<Content>>;

    /// Every published row, for the sitemap
    async fn list_all_published(&self) -> Result<Vec<Content>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Atomically bump the view counter of a published row.
    /// Returns false when no published row matched.
    async fn increment_view(&self, kind: ContentKind, slug: &str) -> Result<bool>;

    /// Distinct non-empty categories of published rows
    async fn categories(&self, kind: ContentKind) -> Result<Vec<String>>;

    /// Row count per kind, any status
    async fn count_by_kind(&self) -> Result<HashMap<ContentKind, i64>>;
}

pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

/// WHERE clause and ordering shared by the listing and count queries
fn list_clauses(filter: &ContentFilter) -> (String, &'static str) {
    let mut clause = String::from("kind = ?");
    if filter.published_only {
        clause.push_str(" AND publish_status = 'published'");
    }
    if filter.category.is_some() {
        clause.push_str(" AND category = ?");
    }
    if filter.q.is_some() {
        clause.push_str(
            " AND (LOWER(title) LIKE LOWER(?) ESCAPE '!' OR LOWER(summary) LIKE LOWER(?) ESCAPE '!' \
             OR LOWER(body) LIKE LOWER(?) ESCAPE '!')",
        );
    }
    let order = if filter.published_only {
        "published_at DESC, id DESC"
    } else {
        "created_at DESC, id DESC"
    };
    (clause, order)
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create(&self, draft: &ContentDraft) -> Result<Content> {
        let now = Utc::now();
        let sql = "INSERT INTO contents (kind, slug, title, summary, body, body_html, category, author_name, \
                   media_url, thumbnail, publish_status, view_count, published_at, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(draft.kind.as_str())
            .bind(&draft.slug)
            .bind(&draft.title)
            .bind(&draft.summary)
            .bind(&draft.body)
            .bind(&draft.body_html)
            .bind(&draft.category)
            .bind(&draft.author_name)
            .bind(&draft.media_url)
            .bind(&draft.thumbnail)
            .bind(draft.publish_status.as_str())
            .bind(draft.published_at)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to insert content")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Content not found after insert")
    }

    async fn update(&self, id: i64, draft: &ContentDraft) -> Result<Content> {
        let sql = "UPDATE contents SET slug = ?, title = ?, summary = ?, body = ?, body_html = ?, \
                   category = ?, author_name = ?, media_url = ?, thumbnail = ?, publish_status = ?, \
                   published_at = ?, updated_at = ? WHERE id = ?";
        with_pool!(self.pool, |p| {
            sqlx::query(sql)
                .bind(&draft.slug)
                .bind(&draft.title)
                .bind(&draft.summary)
                .bind(&draft.body)
                .bind(&draft.body_html)
                .bind(&draft.category)
                .bind(&draft.author_name)
                .bind(&draft.media_url)
                .bind(&draft.thumbnail)
                .bind(draft.publish_status.as_str())
                .bind(draft.published_at)
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update content")?;
        });

        self.get_by_id(id)
            .await?
            .context("Content not found after update")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Content>> {
        let sql = format!("SELECT {} FROM contents WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Content>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn get_by_slug(&self, kind: ContentKind, slug: &str) -> Result<Option<Content>> {
        let sql = format!("SELECT {} FROM contents WHERE kind = ? AND slug = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, Content>(&sql)
            .bind(kind.as_str())
            .bind(slug)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn slug_exists(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM contents WHERE kind = ? AND slug = ? AND id <> ?";
        let count: i64 = with_pool!(self.pool, |p| sqlx::query_scalar(sql)
            .bind(kind.as_str())
            .bind(slug)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(p)
            .await?);
        Ok(count > 0)
    }

    async fn list(&self, kind: ContentKind, filter: &ContentFilter, params: &ListParams) -> Result<(Vec<Content>, i64)> {
        let (clause, order) = list_clauses(filter);
        let pattern = filter.q.as_deref().map(like_pattern);
        let count_sql = format!("SELECT COUNT(*) FROM contents WHERE {}", clause);
        let list_sql = format!(
            "SELECT {} FROM contents WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            COLUMNS, clause, order
        );

        let (items, total) = with_pool!(self.pool, |p| {
            let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(kind.as_str());
            let mut list_query = sqlx::query_as::<_, Content>(&list_sql).bind(kind.as_str());
            if let Some(category) = filter.category.as_deref() {
                count_query = count_query.bind(category);
                list_query = list_query.bind(category);
            }
            if let Some(pattern) = pattern.as_deref() {
                count_query = count_query.bind(pattern).bind(pattern).bind(pattern);
                list_query = list_query.bind(pattern).bind(pattern).bind(pattern);
            }
            let total = count_query.fetch_one(p).await?;
            let items = list_query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(p)
                .await?;
            (items, total)
        });

        Ok((items, total))
    }

    async fn search(&self, term: &str, kind: Option<ContentKind>, limit: i64) -> Result<Vec<Content>> {
        let pattern = like_pattern(term);
        let kind_clause = if kind.is_some() { " AND kind = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM contents WHERE publish_status = 'published'{} \
             AND (LOWER(title) LIKE LOWER(?) ESCAPE '!' OR LOWER(summary) LIKE LOWER(?) ESCAPE '!' \
             OR LOWER(body) LIKE LOWER(?) ESCAPE '!') \
             ORDER BY published_at DESC, id DESC LIMIT ?",
            COLUMNS, kind_clause
        );

        let rows = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, Content>(&sql);
            if let Some(kind) = kind {
                query = query.bind(kind.as_str());
            }
            query
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .fetch_all(p)
                .await?
        });
        Ok(rows)
    }

    async fn list_all_published(&self) -> Result<Vec<Content>> {
        let sql = format!(
            "SELECT {} FROM contents WHERE publish_status = 'published' ORDER BY kind, published_at DESC",
            COLUMNS
        );
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, Content>(&sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM contents WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete content")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn increment_view(&self, kind: ContentKind, slug: &str) -> Result<bool> {
        let sql = "UPDATE contents SET view_count = view_count + 1 \
                   WHERE kind = ? AND slug = ? AND publish_status = 'published'";
        let affected = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(kind.as_str())
            .bind(slug)
            .execute(p)
            .await
            .context("Failed to record view")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn categories(&self, kind: ContentKind) -> Result<Vec<String>> {
        let sql = "SELECT DISTINCT category FROM contents \
                   WHERE kind = ? AND publish_status = 'published' AND category <> '' \
                   ORDER BY category";
        let rows = with_pool!(self.pool, |p| sqlx::query_scalar::<_, String>(sql)
            .bind(kind.as_str())
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn count_by_kind(&self) -> Result<HashMap<ContentKind, i64>> {
        let sql = "SELECT kind, COUNT(*) FROM contents GROUP BY kind";
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, (String, i64)>(sql)
            .fetch_all(p)
            .await?);

        let mut counts: HashMap<ContentKind, i64> =
            ContentKind::ALL.into_iter().map(|k| (k, 0)).collect();
        for (kind, count) in rows {
            let kind: ContentKind = kind.parse()?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::PublishStatus;

    async fn setup_repo() -> SqlxContentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxContentRepository::new(pool)
    }

    fn draft(kind: ContentKind, slug: &str, status: PublishStatus) -> ContentDraft {
        ContentDraft {
            kind,
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            summary: String::new(),
            body: "Patience is half of faith".to_string(),
            body_html: "<p>Patience is half of faith</p>".to_string(),
            category: "aqeedah".to_string(),
            author_name: "Sheikh".to_string(),
            media_url: None,
            thumbnail: None,
            publish_status: status,
            published_at: (status == PublishStatus::Published).then(Utc::now),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let repo = setup_repo().await;
        let created = repo
            .create(&draft(ContentKind::Article, "sabr", PublishStatus::Published))
            .await
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.kind, ContentKind::Article);
        assert_eq!(created.view_count, 0);

        let found = repo.get_by_slug(ContentKind::Article, "sabr").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(created.id));
        assert!(repo.get_by_slug(ContentKind::Sermon, "sabr").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_only_filters_drafts() {
        let repo = setup_repo().await;
        repo.create(&draft(ContentKind::Lesson, "one", PublishStatus::Published)).await.unwrap();
        repo.create(&draft(ContentKind::Lesson, "two", PublishStatus::Draft)).await.unwrap();
        repo.create(&draft(ContentKind::Article, "three", PublishStatus::Published)).await.unwrap();

        let filter = ContentFilter {
            published_only: true,
            ..Default::default()
        };
        let (items, total) = repo
            .list(ContentKind::Lesson, &filter, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].slug, "one");

        let (_, total) = repo
            .list(ContentKind::Lesson, &ContentFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards() {
        let repo = setup_repo().await;
        let mut with_percent = draft(ContentKind::Article, "zakat", PublishStatus::Published);
        with_percent.title = "Zakat is 2.5% of savings".to_string();
        repo.create(&with_percent).await.unwrap();
        repo.create(&draft(ContentKind::Article, "other", PublishStatus::Published)).await.unwrap();

        let hits = repo.search("5%", None, 50).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "zakat");

        let hits = repo.search("PATIENCE", Some(ContentKind::Article), 50).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_increment_view_only_published() {
        let repo = setup_repo().await;
        repo.create(&draft(ContentKind::Sermon, "live", PublishStatus::Published)).await.unwrap();
        repo.create(&draft(ContentKind::Sermon, "hidden", PublishStatus::Draft)).await.unwrap();

        assert!(repo.increment_view(ContentKind::Sermon, "live").await.unwrap());
        assert!(repo.increment_view(ContentKind::Sermon, "live").await.unwrap());
        assert!(!repo.increment_view(ContentKind::Sermon, "hidden").await.unwrap());
        assert!(!repo.increment_view(ContentKind::Sermon, "missing").await.unwrap());

        let row = repo.get_by_slug(ContentKind::Sermon, "live").await.unwrap().unwrap();
        assert_eq!(row.view_count, 2);
    }

    #[tokio::test]
    async fn test_slug_exists_excludes_self() {
        let repo = setup_repo().await;
        let row = repo
            .create(&draft(ContentKind::Book, "riyad", PublishStatus::Draft))
            .await
            .unwrap();

        assert!(repo.slug_exists(ContentKind::Book, "riyad", None).await.unwrap());
        assert!(!repo.slug_exists(ContentKind::Book, "riyad", Some(row.id)).await.unwrap());
        assert!(!repo.slug_exists(ContentKind::Video, "riyad", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_categories_and_counts() {
        let repo = setup_repo().await;
        let mut fiqh = draft(ContentKind::Article, "a", PublishStatus::Published);
        fiqh.category = "fiqh".to_string();
        repo.create(&fiqh).await.unwrap();
        repo.create(&draft(ContentKind::Article, "b", PublishStatus::Published)).await.unwrap();
        let mut hidden = draft(ContentKind::Article, "c", PublishStatus::Draft);
        hidden.category = "hidden".to_string();
        repo.create(&hidden).await.unwrap();

        let categories = repo.categories(ContentKind::Article).await.unwrap();
        assert_eq!(categories, vec!["aqeedah".to_string(), "fiqh".to_string()]);

        let counts = repo.count_by_kind().await.unwrap();
        assert_eq!(counts[&ContentKind::Article], 3);
        assert_eq!(counts[&ContentKind::Video], 0);
    }
}
