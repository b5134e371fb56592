//! Database layer
//!
//! SQLite is the default backend (single-binary deployment); MySQL is
//! supported for hosted setups. Both sit behind the `DatabasePool` trait so
//! repositories never name a concrete backend outside of `with_pool!`.
//!
//! # Usage
//!
//! ```ignore
//! use minbar::config::DatabaseConfig;
//! use minbar::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

use sqlx::mysql::MySqlQueryResult;
use sqlx::sqlite::SqliteQueryResult;

/// Run the same query body against whichever backend the pool wraps.
///
/// The body is expanded once per backend with `$p` bound to the concrete
/// pool, so any `sqlx` call that compiles for both drivers can be shared.
macro_rules! with_pool {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $p = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool is not available"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $p = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool is not available"))?;
                $body
            }
        }
    };
}

pub(crate) use with_pool;

/// Uniform access to the id generated by an `INSERT`.
pub trait InsertId {
    fn insert_id(&self) -> i64;
}

impl InsertId for SqliteQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertId for MySqlQueryResult {
    fn insert_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

/// Whether an error chain contains a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}

/// Wrap user input in a `LIKE` pattern, escaping wildcards with `!`.
///
/// Queries using it must add `ESCAPE '!'`, which both backends accept.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unique_violation_detected_through_context() {
        use anyhow::Context;

        let pool = create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE t (email TEXT NOT NULL UNIQUE)").await.unwrap();
        pool.execute("INSERT INTO t (email) VALUES ('a@b.c')").await.unwrap();

        let err = pool
            .execute("INSERT INTO t (email) VALUES ('a@b.c')")
            .await
            .context("insert failed")
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let other = anyhow::anyhow!("something else");
        assert!(!is_unique_violation(&other));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("fiqh"), "%fiqh%");
        assert_eq!(like_pattern("50%_off!"), "%50!%!_off!!%");
    }
}
