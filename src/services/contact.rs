//! Contact form messages.

use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::ContactRepository;
use crate::models::{ContactInput, ContactMessage};
use crate::services::validation::{is_valid_email, max_chars, optional, required};

const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Error)]
pub enum ContactServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a message. Fields are checked in form order so the
    /// first missing one is reported.
    pub async fn submit(&self, input: ContactInput) -> Result<ContactMessage, ContactServiceError> {
        let invalid = ContactServiceError::Validation;

        let name = required(&input.name, "Name is required").map_err(invalid)?;
        let email = required(&input.email, "Email is required").map_err(invalid)?;
        if !is_valid_email(&email) {
            return Err(invalid("Invalid email address".to_string()));
        }
        let message = required(&input.message, "Message is required").map_err(invalid)?;
        max_chars(&message, MAX_MESSAGE_CHARS, "Message").map_err(invalid)?;

        let stored = self
            .repo
            .create(&ContactInput {
                name,
                email,
                phone: optional(input.phone.as_deref()),
                subject: optional(input.subject.as_deref()),
                message,
            })
            .await?;

        tracing::info!("Contact message {} received", stored.id);
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<ContactMessage>, ContactServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn mark_read(&self, id: i64) -> Result<ContactMessage, ContactServiceError> {
        self.repo.mark_read(id).await?.ok_or_else(message_not_found)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContactServiceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(message_not_found())
        }
    }

    pub async fn count_unread(&self) -> Result<i64, ContactServiceError> {
        Ok(self.repo.count_unread().await?)
    }
}

fn message_not_found() -> ContactServiceError {
    ContactServiceError::NotFound("Message not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxContactRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> ContactService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        ContactService::new(SqlxContactRepository::boxed(pool))
    }

    fn valid() -> ContactInput {
        ContactInput {
            name: "Maryam".to_string(),
            email: "maryam@example.com".to_string(),
            phone: Some("  ".to_string()),
            subject: Some("Question".to_string()),
            message: "When is the next halaqa?".to_string(),
        }
    }

    async fn rejection(service: &ContactService, input: ContactInput) -> String {
        match service.submit(input).await.unwrap_err() {
            ContactServiceError::Validation(msg) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_fields_are_named() {
        let service = setup().await;

        assert_eq!(rejection(&service, ContactInput { name: " ".into(), ..valid() }).await, "Name is required");
        assert_eq!(rejection(&service, ContactInput { email: "".into(), ..valid() }).await, "Email is required");
        assert_eq!(rejection(&service, ContactInput { message: "".into(), ..valid() }).await, "Message is required");
        assert_eq!(
            rejection(&service, ContactInput { email: "not-an-email".into(), ..valid() }).await,
            "Invalid email address"
        );
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_and_mark_read() {
        let service = setup().await;
        let msg = service.submit(valid()).await.unwrap();

        assert!(!msg.is_read);
        assert_eq!(msg.phone, None);
        assert_eq!(service.count_unread().await.unwrap(), 1);

        let read = service.mark_read(msg.id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(service.count_unread().await.unwrap(), 0);

        service.delete(msg.id).await.unwrap();
        assert!(matches!(service.mark_read(msg.id).await.unwrap_err(), ContactServiceError::NotFound(_)));
    }
}
