//! Connection pools for the two supported backends
//!
//! `create_pool` picks SQLite or MySQL from `DatabaseConfig::driver` and
//! hands back a `DynDatabasePool`. Repositories reach the concrete pool
//! through `with_pool!`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 16;
const MYSQL_MAX_CONNECTIONS: u32 = 24;

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows, answering the affected count
    async fn execute(&self, sql: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let target = SqliteTarget::parse(url);

        if let Some(parent) = target.file.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
            }
        }

        // each connection to `:memory:` opens a separate database
        let max_connections = if target.in_memory { 1 } else { SQLITE_MAX_CONNECTIONS };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&target.url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute: {}", sql))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&url)
            .await
            .context("Failed to connect to MySQL database")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute: {}", sql))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Where a configured SQLite url points
#[derive(Debug, PartialEq)]
struct SqliteTarget {
    /// Connection string handed to sqlx
    url: String,
    /// Database file on disk, absent for in-memory databases
    file: Option<std::path::PathBuf>,
    in_memory: bool,
}

impl SqliteTarget {
    /// Accepts `:memory:`, bare paths and `sqlite:` urls. File databases are
    /// opened in create mode unless the url already carries options.
    fn parse(url: &str) -> Self {
        if url == ":memory:" || url.starts_with("sqlite::memory:") {
            let url = if url == ":memory:" { "sqlite::memory:" } else { url };
            return Self {
                url: url.to_string(),
                file: None,
                in_memory: true,
            };
        }

        let path = url.strip_prefix("sqlite:").unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);
        let url = match (url.starts_with("sqlite:"), url.contains('?')) {
            (true, true) => url.to_string(),
            (true, false) => format!("{}?mode=rwc", url),
            (false, _) => format!("sqlite:{}?mode=rwc", url),
        };

        Self {
            url,
            file: Some(path.trim_start_matches("//").into()),
            in_memory: false,
        }
    }
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    Ok(match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(&config.url).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(&config.url).await?),
    })
}

/// In-memory SQLite pool for unit and integration tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_target_memory() {
        let target = SqliteTarget::parse(":memory:");
        assert_eq!(target.url, "sqlite::memory:");
        assert!(target.in_memory);
        assert!(target.file.is_none());
    }

    #[test]
    fn test_sqlite_target_paths() {
        let bare = SqliteTarget::parse("data/minbar.db");
        assert_eq!(bare.url, "sqlite:data/minbar.db?mode=rwc");
        assert_eq!(bare.file.unwrap(), Path::new("data/minbar.db"));

        let prefixed = SqliteTarget::parse("sqlite:data/minbar.db");
        assert_eq!(prefixed.url, "sqlite:data/minbar.db?mode=rwc");

        let with_options = SqliteTarget::parse("sqlite:data/minbar.db?mode=ro");
        assert_eq!(with_options.url, "sqlite:data/minbar.db?mode=ro");
        assert_eq!(with_options.file.unwrap(), Path::new("data/minbar.db"));
    }

    #[tokio::test]
    async fn test_memory_pool() {
        let pool = create_test_pool().await.unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.unwrap();

        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)").await.unwrap();
        assert_eq!(pool.execute("INSERT INTO t (name) VALUES ('x')").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("minbar.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        })
        .await
        .unwrap();
        pool.ping().await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/minbar_test".to_string());
        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.unwrap();
    }
}
