//! Comment service
//!
//! Readers comment on published content; comments stay hidden until an
//! admin approves them.

use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::{CommentRepository, ContentRepository};
use crate::models::{Comment, Content, ContentKind, CreateCommentInput, PublicComment};
use crate::services::validation::{is_valid_email, max_chars, optional, required};

const MAX_NAME_CHARS: usize = 100;
const MAX_BODY_CHARS: usize = 5000;

#[derive(Debug, Error)]
pub enum CommentServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    content_repo: Arc<dyn ContentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, content_repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo, content_repo }
    }

    async fn published_content(&self, kind: ContentKind, slug: &str) -> Result<Content, CommentServiceError> {
        self.content_repo
            .get_by_slug(kind, slug)
            .await?
            .filter(Content::is_published)
            .ok_or_else(|| CommentServiceError::NotFound(format!("{} not found", kind.label())))
    }

    /// Store a reader comment for moderation.
    pub async fn submit(
        &self,
        kind: ContentKind,
        slug: &str,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let invalid = CommentServiceError::Validation;

        let author_name = required(&input.author_name, "Name is required").map_err(invalid)?;
        max_chars(&author_name, MAX_NAME_CHARS, "Name").map_err(invalid)?;
        let body = required(&input.body, "Comment is required").map_err(invalid)?;
        max_chars(&body, MAX_BODY_CHARS, "Comment").map_err(invalid)?;

        let email = optional(input.email.as_deref());
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(invalid("Invalid email address".to_string()));
            }
        }

        let content = self.published_content(kind, slug).await?;
        let comment = self
            .repo
            .create(
                content.id,
                &CreateCommentInput {
                    author_name,
                    email,
                    body,
                },
            )
            .await?;

        tracing::info!("Comment {} awaiting approval on content {}", comment.id, content.id);
        Ok(comment)
    }

    /// Approved comments on a published row, oldest first
    pub async fn list_approved(&self, kind: ContentKind, slug: &str) -> Result<Vec<PublicComment>, CommentServiceError> {
        let content = self.published_content(kind, slug).await?;
        let comments = self.repo.list_approved(content.id).await?;
        Ok(comments.into_iter().map(PublicComment::from).collect())
    }

    pub async fn list(&self, pending_only: bool) -> Result<Vec<Comment>, CommentServiceError> {
        Ok(self.repo.list(pending_only).await?)
    }

    pub async fn approve(&self, id: i64) -> Result<Comment, CommentServiceError> {
        if !self.repo.approve(id).await? {
            return Err(comment_not_found());
        }
        self.repo.get_by_id(id).await?.ok_or_else(comment_not_found)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(comment_not_found())
        }
    }

    pub async fn count_pending(&self) -> Result<i64, CommentServiceError> {
        Ok(self.repo.count_pending().await?)
    }
}

fn comment_not_found() -> CommentServiceError {
    CommentServiceError::NotFound("Comment not found".to_string())
}
