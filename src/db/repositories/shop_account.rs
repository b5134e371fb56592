//! Shop admin accounts and their server-side sessions

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{ShopAccount, ShopSession};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, display_name, created_at";

#[async_trait]
pub trait ShopAccountRepository: Send + Sync {
    async fn create(&self, email: &str, password_hash: &str, display_name: &str) -> Result<ShopAccount>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ShopAccount>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<ShopAccount>>;

    async fn count(&self) -> Result<i64>;

    async fn create_session(&self, token: &str, account_id: i64, expires_at: DateTime<Utc>) -> Result<ShopSession>;

    async fn get_session(&self, token: &str) -> Result<Option<ShopSession>>;

    async fn delete_session(&self, token: &str) -> Result<()>;

    /// Remove sessions past their expiry; returns how many were removed
    async fn delete_expired_sessions(&self) -> Result<u64>;
}

pub struct SqlxShopAccountRepository {
    pool: DynDatabasePool,
}

impl SqlxShopAccountRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShopAccountRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShopAccountRepository for SqlxShopAccountRepository {
    async fn create(&self, email: &str, password_hash: &str, display_name: &str) -> Result<ShopAccount> {
        let sql = "INSERT INTO shop_accounts (email, password_hash, display_name, created_at) VALUES (?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(email)
            .bind(password_hash)
            .bind(display_name)
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert shop account")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Shop account not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShopAccount>> {
        let sql = format!("SELECT {} FROM shop_accounts WHERE id = ?", ACCOUNT_COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, ShopAccount>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<ShopAccount>> {
        let sql = format!("SELECT {} FROM shop_accounts WHERE email = ?", ACCOUNT_COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, ShopAccount>(&sql)
            .bind(email)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop_accounts")
            .fetch_one(p)
            .await?);
        Ok(count)
    }

    async fn create_session(&self, token: &str, account_id: i64, expires_at: DateTime<Utc>) -> Result<ShopSession> {
        let session = ShopSession {
            id: token.to_string(),
            account_id,
            expires_at,
            created_at: Utc::now(),
        };
        with_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO shop_sessions (id, account_id, expires_at, created_at) VALUES (?, ?, ?, ?)"
            )
            .bind(&session.id)
            .bind(session.account_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(p)
            .await
            .context("Failed to insert shop session")?;
        });
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> Result<Option<ShopSession>> {
        let sql = "SELECT id, account_id, expires_at, created_at FROM shop_sessions WHERE id = ?";
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, ShopSession>(sql)
            .bind(token)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM shop_sessions WHERE id = ?")
                .bind(token)
                .execute(p)
                .await?;
        });
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> Result<u64> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM shop_sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(p)
            .await?
            .rows_affected());
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    #[tokio::test]
    async fn test_sessions_lifecycle() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxShopAccountRepository::new(pool);

        let account = repo.create("florist@example.com", "hash", "Florist").await.unwrap();
        let live = "a".repeat(64);
        let stale = "b".repeat(64);
        repo.create_session(&live, account.id, Utc::now() + Duration::days(7)).await.unwrap();
        repo.create_session(&stale, account.id, Utc::now() - Duration::hours(1)).await.unwrap();

        assert_eq!(repo.delete_expired_sessions().await.unwrap(), 1);
        assert!(repo.get_session(&stale).await.unwrap().is_none());

        let session = repo.get_session(&live).await.unwrap().unwrap();
        assert_eq!(session.account_id, account.id);

        repo.delete_session(&live).await.unwrap();
        assert!(repo.get_session(&live).await.unwrap().is_none());
    }
}
