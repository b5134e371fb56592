//! CMS admin user repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, InsertId};
use crate::models::{AdminRole, AdminUser};

const COLUMNS: &str = "id, username, email, password_hash, role, created_at";

#[async_trait]
pub trait AdminUserRepository: Send + Sync {
    async fn create(&self, username: &str, email: &str, password_hash: &str, role: AdminRole) -> Result<AdminUser>;

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminUser>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>>;

    async fn list(&self) -> Result<Vec<AdminUser>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn count_admins(&self) -> Result<i64>;
}

pub struct SqlxAdminUserRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminUserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AdminUserRepository for SqlxAdminUserRepository {
    async fn create(&self, username: &str, email: &str, password_hash: &str, role: AdminRole) -> Result<AdminUser> {
        let sql = "INSERT INTO admin_users (username, email, password_hash, role, created_at) \
                   VALUES (?, ?, ?, ?, ?)";
        let id = with_pool!(self.pool, |p| sqlx::query(sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .bind(Utc::now())
            .execute(p)
            .await
            .context("Failed to insert admin user")?
            .insert_id());

        self.get_by_id(id)
            .await?
            .context("Admin user not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminUser>> {
        let sql = format!("SELECT {} FROM admin_users WHERE id = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let sql = format!("SELECT {} FROM admin_users WHERE username = ?", COLUMNS);
        let row = with_pool!(self.pool, |p| sqlx::query_as::<_, AdminUser>(&sql)
            .bind(username)
            .fetch_optional(p)
            .await?);
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<AdminUser>> {
        let sql = format!("SELECT {} FROM admin_users ORDER BY id", COLUMNS);
        let rows = with_pool!(self.pool, |p| sqlx::query_as::<_, AdminUser>(&sql)
            .fetch_all(p)
            .await?);
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |p| sqlx::query("DELETE FROM admin_users WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete admin user")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_users")
            .fetch_one(p)
            .await?);
        Ok(count)
    }

    async fn count_admins(&self) -> Result<i64> {
        let count = with_pool!(self.pool, |p| sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM admin_users WHERE role = ?"
        )
        .bind(AdminRole::Admin.as_str())
        .fetch_one(p)
        .await?);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxAdminUserRepository::new(pool);

        let user = repo
            .create("imam", "imam@example.com", "$argon2id$hash", AdminRole::Admin)
            .await
            .unwrap();
        assert_eq!(user.role, AdminRole::Admin);

        let found = repo.get_by_username("imam").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "$argon2id$hash");
        assert_eq!(repo.count_admins().await.unwrap(), 1);

        let err = repo
            .create("imam", "other@example.com", "x", AdminRole::Editor)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
