//! Database migrations
//!
//! Schema changes are embedded in the binary as SQL strings, one pair per
//! backend, and applied in version order at startup. Applied versions are
//! recorded in `_migrations`.
//!
//! ```ignore
//! use minbar::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{with_pool, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number, unique and increasing
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

/// Row of the `_migrations` tracking table
#[derive(Debug, Clone, FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_admin_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'editor',
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'editor',
                created_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    // One table for every publishable kind; `kind` discriminates.
    Migration {
        version: 2,
        name: "create_contents",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind VARCHAR(20) NOT NULL,
                slug VARCHAR(255) NOT NULL,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                body_html TEXT NOT NULL DEFAULT '',
                category VARCHAR(100) NOT NULL DEFAULT '',
                author_name VARCHAR(100) NOT NULL DEFAULT '',
                media_url VARCHAR(500),
                thumbnail VARCHAR(500),
                publish_status VARCHAR(20) NOT NULL DEFAULT 'draft',
                view_count INTEGER NOT NULL DEFAULT 0,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                UNIQUE (kind, slug)
            );
            CREATE INDEX IF NOT EXISTS idx_contents_listing ON contents(kind, publish_status, published_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contents (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                kind VARCHAR(20) NOT NULL,
                slug VARCHAR(255) NOT NULL,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL,
                body MEDIUMTEXT NOT NULL,
                body_html MEDIUMTEXT NOT NULL,
                category VARCHAR(100) NOT NULL DEFAULT '',
                author_name VARCHAR(100) NOT NULL DEFAULT '',
                media_url VARCHAR(500),
                thumbnail VARCHAR(500),
                publish_status VARCHAR(20) NOT NULL DEFAULT 'draft',
                view_count BIGINT NOT NULL DEFAULT 0,
                published_at DATETIME,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE KEY uq_contents_kind_slug (kind, slug),
                INDEX idx_contents_listing (kind, publish_status, published_at)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 3,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id INTEGER NOT NULL,
                author_name VARCHAR(100) NOT NULL,
                email VARCHAR(255),
                body TEXT NOT NULL,
                approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (content_id) REFERENCES contents(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_content ON comments(content_id, approved);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                content_id BIGINT NOT NULL,
                author_name VARCHAR(100) NOT NULL,
                email VARCHAR(255),
                body TEXT NOT NULL,
                approved BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL,
                INDEX idx_comments_content (content_id, approved),
                FOREIGN KEY (content_id) REFERENCES contents(id) ON DELETE CASCADE
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 4,
        name: "create_subscribers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(100),
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(100),
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 5,
        name: "create_contact_messages",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                subject VARCHAR(255),
                message TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                subject VARCHAR(255),
                message TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 6,
        name: "create_settings",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS settings (
                `key` VARCHAR(100) PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO settings (`key`, value) VALUES ('site_name', 'Minbar');
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS settings (
                `key` VARCHAR(100) PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
            INSERT IGNORE INTO settings (`key`, value) VALUES ('site_name', 'Minbar');
        "#,
    },
    Migration {
        version: 7,
        name: "create_translations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                locale VARCHAR(16) NOT NULL,
                msg_key VARCHAR(191) NOT NULL,
                value TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                UNIQUE (locale, msg_key)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS translations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                locale VARCHAR(16) NOT NULL,
                msg_key VARCHAR(191) NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE KEY uq_translations_locale_key (locale, msg_key)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 8,
        name: "create_shop_accounts_and_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS shop_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL
            );
            CREATE TABLE IF NOT EXISTS shop_sessions (
                id VARCHAR(64) PRIMARY KEY,
                account_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (account_id) REFERENCES shop_accounts(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_shop_sessions_expires ON shop_sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS shop_accounts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100) NOT NULL,
                created_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
            CREATE TABLE IF NOT EXISTS shop_sessions (
                id VARCHAR(64) PRIMARY KEY,
                account_id BIGINT NOT NULL,
                expires_at DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                INDEX idx_shop_sessions_expires (expires_at),
                FOREIGN KEY (account_id) REFERENCES shop_accounts(id) ON DELETE CASCADE
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 9,
        name: "create_products",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price_cents INTEGER NOT NULL,
                image_url VARCHAR(500),
                category VARCHAR(100) NOT NULL DEFAULT '',
                stock INTEGER NOT NULL DEFAULT 0,
                featured BOOLEAN NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                price_cents BIGINT NOT NULL,
                image_url VARCHAR(500),
                category VARCHAR(100) NOT NULL DEFAULT '',
                stock BIGINT NOT NULL DEFAULT 0,
                featured BOOLEAN NOT NULL DEFAULT FALSE,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    // Line items are snapshotted into `items` as JSON.
    Migration {
        version: 10,
        name: "create_orders",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50) NOT NULL,
                address TEXT NOT NULL,
                note TEXT,
                items TEXT NOT NULL,
                total_cents INTEGER NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS orders (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                customer_name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50) NOT NULL,
                address TEXT NOT NULL,
                note TEXT,
                items TEXT NOT NULL,
                total_cents BIGINT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                INDEX idx_orders_status (status)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 11,
        name: "create_gallery_images",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS gallery_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL DEFAULT '',
                image_url VARCHAR(500) NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS gallery_images (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL DEFAULT '',
                image_url VARCHAR(500) NOT NULL,
                sort_order BIGINT NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 12,
        name: "create_reviews",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                author_name VARCHAR(100) NOT NULL,
                rating INTEGER NOT NULL,
                body TEXT NOT NULL,
                approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_product ON reviews(product_id, approved);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                product_id BIGINT NOT NULL,
                author_name VARCHAR(100) NOT NULL,
                rating BIGINT NOT NULL,
                body TEXT NOT NULL,
                approved BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL,
                INDEX idx_reviews_product (product_id, approved),
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
];

/// Apply every migration not yet recorded in `_migrations`.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied_versions.contains(&i64::from(migration.version)) {
            continue;
        }
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    let sql = "SELECT version, name, applied_at FROM _migrations ORDER BY version";
    let records = with_pool!(pool, |p| sqlx::query_as::<_, MigrationRecord>(sql)
        .fetch_all(p)
        .await?);
    Ok(records)
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let script = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    for statement in split_sql_statements(script) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    with_pool!(pool, |p| {
        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(p)
            .await?;
    });

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a script into statements on `;`, dropping comment-only fragments.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Whether every embedded migration has been applied.
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use sqlx::Row;

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());
        assert!(!is_up_to_date(&pool).await.unwrap());

        run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
        assert!(is_up_to_date(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_all_tables_created() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let sqlite = pool.as_sqlite().unwrap();
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(sqlite)
            .await
            .unwrap();
        let tables: Vec<String> = rows.iter().map(|r| r.get("name")).collect();

        for table in [
            "admin_users",
            "contents",
            "comments",
            "subscribers",
            "contact_messages",
            "settings",
            "translations",
            "shop_accounts",
            "shop_sessions",
            "products",
            "orders",
            "gallery_images",
            "reviews",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_content_slug_unique_per_kind() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let insert = |kind: &'static str| {
            format!(
                "INSERT INTO contents (kind, slug, title, created_at, updated_at) \
                 VALUES ('{}', 'tawhid', 'Tawhid', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
                kind
            )
        };
        pool.execute(&insert("article")).await.unwrap();
        pool.execute(&insert("sermon")).await.unwrap();
        assert!(pool.execute(&insert("article")).await.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INTEGER);\n-- only a comment\n;\nINSERT INTO a VALUES (1)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE a (id INTEGER)", "INSERT INTO a VALUES (1)"]);
    }

    #[test]
    fn test_migration_versions_increase() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }
}
