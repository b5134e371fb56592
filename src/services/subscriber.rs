//! Newsletter subscriptions.

use std::sync::Arc;
use thiserror::Error;

use crate::db::is_unique_violation;
use crate::db::repositories::SubscriberRepository;
use crate::models::{SubscribeInput, Subscriber};
use crate::services::validation::{is_valid_email, optional, required};

#[derive(Debug, Error)]
pub enum SubscriberServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct SubscriberService {
    repo: Arc<dyn SubscriberRepository>,
}

impl SubscriberService {
    pub fn new(repo: Arc<dyn SubscriberRepository>) -> Self {
        Self { repo }
    }

    /// Add an address to the list.
    ///
    /// Duplicates are detected by the unique index, not by a prior lookup.
    pub async fn subscribe(&self, input: SubscribeInput) -> Result<Subscriber, SubscriberServiceError> {
        let email = normalize_email(&input.email)?;
        let name = optional(input.name.as_deref());

        match self.repo.create(&email, name.as_deref()).await {
            Ok(subscriber) => {
                tracing::info!("New subscriber {}", subscriber.id);
                Ok(subscriber)
            }
            Err(e) if is_unique_violation(&e) => Err(SubscriberServiceError::Conflict(
                "This email is already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<(), SubscriberServiceError> {
        let email = normalize_email(email)?;
        if self.repo.deactivate(&email).await? {
            Ok(())
        } else {
            Err(SubscriberServiceError::NotFound("Subscriber not found".to_string()))
        }
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>, SubscriberServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), SubscriberServiceError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(SubscriberServiceError::NotFound("Subscriber not found".to_string()))
        }
    }

    pub async fn count_active(&self) -> Result<i64, SubscriberServiceError> {
        Ok(self.repo.count_active().await?)
    }
}

fn normalize_email(email: &str) -> Result<String, SubscriberServiceError> {
    let email = required(email, "Email is required")
        .map_err(SubscriberServiceError::Validation)?
        .to_lowercase();
    if !is_valid_email(&email) {
        return Err(SubscriberServiceError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSubscriberRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SubscriberService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SubscriberService::new(SqlxSubscriberRepository::boxed(pool))
    }

    fn input(email: &str) -> SubscribeInput {
        SubscribeInput {
            email: email.to_string(),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = setup().await;
        service.subscribe(input("reader@example.com")).await.unwrap();

        let err = service.subscribe(input("  Reader@Example.com ")).await.unwrap_err();
        match err {
            SubscriberServiceError::Conflict(msg) => assert_eq!(msg, "This email is already registered"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribe_validation() {
        let service = setup().await;
        assert!(matches!(
            service.subscribe(input("")).await.unwrap_err(),
            SubscriberServiceError::Validation(ref m) if m == "Email is required"
        ));
        assert!(matches!(
            service.subscribe(input("nope")).await.unwrap_err(),
            SubscriberServiceError::Validation(ref m) if m == "Invalid email address"
        ));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let service = setup().await;
        service.subscribe(input("a@example.com")).await.unwrap();
        assert_eq!(service.count_active().await.unwrap(), 1);

        service.unsubscribe("A@example.com").await.unwrap();
        assert_eq!(service.count_active().await.unwrap(), 0);

        assert!(matches!(
            service.unsubscribe("ghost@example.com").await.unwrap_err(),
            SubscriberServiceError::NotFound(_)
        ));
    }
}
