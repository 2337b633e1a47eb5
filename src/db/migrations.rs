//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! backend. Applied versions are recorded in `_migrations`, so running the
//! migrator on every startup only applies what is new.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};
use std::collections::HashSet;

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique, sequential version number
    pub version: i64,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users_and_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                is_verified BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                is_verified BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 2,
        name: "create_profiles_and_follows",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id INTEGER PRIMARY KEY,
                first_name VARCHAR(30) NOT NULL DEFAULT '',
                last_name VARCHAR(30) NOT NULL DEFAULT '',
                bio VARCHAR(500) NOT NULL DEFAULT '',
                image VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS follows (
                follower_id INTEGER NOT NULL,
                followee_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (follower_id, followee_id),
                CHECK (follower_id <> followee_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (followee_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_follows_followee_id ON follows(followee_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id BIGINT PRIMARY KEY,
                first_name VARCHAR(30) NOT NULL DEFAULT '',
                last_name VARCHAR(30) NOT NULL DEFAULT '',
                bio VARCHAR(500) NOT NULL DEFAULT '',
                image VARCHAR(500),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS follows (
                follower_id BIGINT NOT NULL,
                followee_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (follower_id, followee_id),
                FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (followee_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_follows_followee_id ON follows(followee_id);
        "#,
    },
    Migration {
        version: 3,
        name: "create_articles_and_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(300) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                description VARCHAR(255) NOT NULL,
                body TEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                author_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id);
            CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at);
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id ON article_tags(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(300) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                description VARCHAR(255) NOT NULL,
                body LONGTEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                author_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_articles_author_id ON articles(author_id);
            CREATE INDEX idx_articles_created_at ON articles(created_at);
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                position INT NOT NULL DEFAULT 0,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_article_tags_tag_id ON article_tags(tag_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_article_reactions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS article_votes (
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                value INTEGER NOT NULL CHECK (value IN (-1, 1)),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_votes_article_id ON article_votes(article_id);
            CREATE TABLE IF NOT EXISTS ratings (
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_ratings_article_id ON ratings(article_id);
            CREATE TABLE IF NOT EXISTS favorites (
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_favorites_article_id ON favorites(article_id);
            CREATE TABLE IF NOT EXISTS bookmarks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS article_votes (
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                value SMALLINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_article_votes_article_id ON article_votes(article_id);
            CREATE TABLE IF NOT EXISTS ratings (
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                score SMALLINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_ratings_article_id ON ratings(article_id);
            CREATE TABLE IF NOT EXISTS favorites (
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_favorites_article_id ON favorites(article_id);
            CREATE TABLE IF NOT EXISTS bookmarks (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_bookmarks_user_article (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                parent_id INTEGER,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_article_id ON comments(article_id);
            CREATE INDEX IF NOT EXISTS idx_comments_parent_id ON comments(parent_id);
            CREATE TABLE IF NOT EXISTS comment_votes (
                user_id INTEGER NOT NULL,
                comment_id INTEGER NOT NULL,
                value INTEGER NOT NULL CHECK (value IN (-1, 1)),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, comment_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comment_votes_comment_id ON comment_votes(comment_id);
            CREATE TABLE IF NOT EXISTS comment_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_id INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comment_history_comment_id ON comment_history(comment_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                article_id BIGINT NOT NULL,
                author_id BIGINT NOT NULL,
                parent_id BIGINT,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comments_article_id ON comments(article_id);
            CREATE INDEX idx_comments_parent_id ON comments(parent_id);
            CREATE TABLE IF NOT EXISTS comment_votes (
                user_id BIGINT NOT NULL,
                comment_id BIGINT NOT NULL,
                value SMALLINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, comment_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comment_votes_comment_id ON comment_votes(comment_id);
            CREATE TABLE IF NOT EXISTS comment_history (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                comment_id BIGINT NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comment_history_comment_id ON comment_history(comment_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_highlights",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS highlights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                field VARCHAR(20) NOT NULL,
                start_index INTEGER NOT NULL,
                end_index INTEGER NOT NULL,
                comment TEXT,
                highlighted_text TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_highlights_user_article ON highlights(user_id, article_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS highlights (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                field VARCHAR(20) NOT NULL,
                start_index BIGINT NOT NULL,
                end_index BIGINT NOT NULL,
                comment TEXT,
                highlighted_text TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_highlights_user_article ON highlights(user_id, article_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_notifications",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL,
                actor_id INTEGER,
                verb VARCHAR(50) NOT NULL,
                description TEXT NOT NULL,
                resource_url VARCHAR(500),
                unread BOOLEAN NOT NULL DEFAULT 1,
                emailed BOOLEAN NOT NULL DEFAULT 0,
                deleted BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (actor_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, deleted, unread);
            CREATE TABLE IF NOT EXISTS notification_preferences (
                user_id INTEGER PRIMARY KEY,
                email_notifications BOOLEAN NOT NULL DEFAULT 1,
                in_app_notifications BOOLEAN NOT NULL DEFAULT 1,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                recipient_id BIGINT NOT NULL,
                actor_id BIGINT,
                verb VARCHAR(50) NOT NULL,
                description TEXT NOT NULL,
                resource_url VARCHAR(500),
                unread BOOLEAN NOT NULL DEFAULT TRUE,
                emailed BOOLEAN NOT NULL DEFAULT FALSE,
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (actor_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_notifications_recipient ON notifications(recipient_id, deleted, unread);
            CREATE TABLE IF NOT EXISTS notification_preferences (
                user_id BIGINT PRIMARY KEY,
                email_notifications BOOLEAN NOT NULL DEFAULT TRUE,
                in_app_notifications BOOLEAN NOT NULL DEFAULT TRUE,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 8,
        name: "create_escalations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS escalations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reporter_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                reason VARCHAR(32) NOT NULL,
                description VARCHAR(128) NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (reporter_id, article_id, reason),
                FOREIGN KEY (reporter_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_escalations_article_id ON escalations(article_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS escalations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                reporter_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                reason VARCHAR(32) NOT NULL,
                description VARCHAR(128) NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_escalations_reporter_article_reason (reporter_id, article_id, reason),
                FOREIGN KEY (reporter_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_escalations_article_id ON escalations(article_id);
        "#,
    },
];

/// Apply every pending migration in version order.
///
/// Returns the number of migrations applied by this call.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let pending = pending_migrations(pool).await?;

    for migration in &pending {
        tracing::info!("Applying migration {} ({})", migration.version, migration.name);
        let result = match pool.driver() {
            DatabaseDriver::Sqlite => apply_sqlite(pool.as_sqlite().unwrap(), migration).await,
            DatabaseDriver::Mysql => apply_mysql(pool.as_mysql().unwrap(), migration).await,
        };
        result.with_context(|| format!("Migration {} failed", migration.name))?;
    }

    match pending.len() {
        0 => tracing::debug!("Schema is up to date"),
        n => tracing::info!("Applied {} migration(s)", n),
    }
    Ok(pending.len())
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    Ok(pending_migrations(pool).await?.len())
}

async fn pending_migrations(pool: &DynDatabasePool) -> Result<Vec<&'static Migration>> {
    // Same DDL is valid in both dialects
    pool.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version BIGINT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .await?;

    let sql = "SELECT version FROM _migrations";
    let applied: HashSet<i64> = match pool.driver() {
        DatabaseDriver::Sqlite => sqlx::query_scalar::<_, i64>(sql)
            .fetch_all(pool.as_sqlite().unwrap())
            .await?
            .into_iter()
            .collect(),
        DatabaseDriver::Mysql => sqlx::query_scalar::<_, i64>(sql)
            .fetch_all(pool.as_mysql().unwrap())
            .await?
            .into_iter()
            .collect(),
    };

    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect())
}

const RECORD_MIGRATION: &str = "INSERT INTO _migrations (version, name) VALUES (?, ?)";

async fn apply_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Statement failed: {}", preview(statement)))?;
    }
    sqlx::query(RECORD_MIGRATION)
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

// MySQL commits DDL implicitly, so statements run one by one outside a transaction.
async fn apply_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Statement failed: {}", preview(statement)))?;
    }
    sqlx::query(RECORD_MIGRATION)
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}

/// First line of a statement, for error context
fn preview(sql: &str) -> &str {
    sql.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or(sql)
}

/// Split a migration body into statements, dropping blanks and comment-only chunks
fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|chunk| {
        chunk
            .lines()
            .map(str::trim)
            .any(|line| !line.is_empty() && !line.starts_with("--"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use sqlx::Row;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind("hash")
            .execute(pool)
            .await
            .expect("Failed to insert user")
            .last_insert_rowid()
    }

    async fn insert_article(pool: &SqlitePool, slug: &str, author_id: i64) -> i64 {
        sqlx::query(
            "INSERT INTO articles (slug, title, description, body, image, author_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(slug)
        .bind("Title")
        .bind("Description")
        .bind("Body")
        .bind("https://example.com/a.png")
        .bind(author_id)
        .execute(pool)
        .await
        .expect("Failed to insert article")
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i64 + 1);
            assert!(statements(migration.up_sqlite).next().is_some());
            assert_eq!(
                statements(migration.up_sqlite).count(),
                statements(migration.up_mysql).count(),
                "statement count differs for {}",
                migration.name
            );
        }
    }

    #[test]
    fn test_statements_skip_comment_only_chunks() {
        let sql = "CREATE TABLE a (id INT);\n-- just a comment\n;\nCREATE TABLE b (id INT)";
        let split: Vec<_> = statements(sql).collect();
        assert_eq!(split, vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);
    }

    #[test]
    fn test_preview_uses_first_line() {
        assert_eq!(preview("\n   CREATE TABLE x (\n id INT\n)"), "CREATE TABLE x (");
    }

    #[tokio::test]
    async fn test_follow_rejects_self_and_duplicates() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();
        let a = insert_user(sqlite, "alice").await;
        let b = insert_user(sqlite, "bob").await;

        let follow = |follower: i64, followee: i64| {
            sqlx::query("INSERT INTO follows (follower_id, followee_id) VALUES (?, ?)")
                .bind(follower)
                .bind(followee)
                .execute(sqlite)
        };

        assert!(follow(a, b).await.is_ok());
        assert!(follow(a, b).await.is_err());
        assert!(follow(a, a).await.is_err());
    }

    #[tokio::test]
    async fn test_rating_range_enforced() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();
        let author = insert_user(sqlite, "author").await;
        let reader = insert_user(sqlite, "reader").await;
        let article = insert_article(sqlite, "title", author).await;

        let rate = |score: i64| {
            sqlx::query("INSERT OR REPLACE INTO ratings (user_id, article_id, score) VALUES (?, ?, ?)")
                .bind(reader)
                .bind(article)
                .bind(score)
                .execute(sqlite)
        };

        assert!(rate(6).await.is_err());
        assert!(rate(0).await.is_err());
        assert!(rate(5).await.is_ok());
    }

    #[tokio::test]
    async fn test_deleting_article_cascades() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();
        let author = insert_user(sqlite, "author").await;
        let article = insert_article(sqlite, "cascade", author).await;

        sqlx::query("INSERT INTO comments (article_id, author_id, body) VALUES (?, ?, 'hi')")
            .bind(article)
            .bind(author)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO favorites (user_id, article_id) VALUES (?, ?)")
            .bind(author)
            .bind(article)
            .execute(sqlite)
            .await
            .unwrap();

        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(article)
            .execute(sqlite)
            .await
            .unwrap();

        for table in ["comments", "favorites"] {
            let row = sqlx::query(&format!("SELECT COUNT(*) as count FROM {}", table))
                .fetch_one(sqlite)
                .await
                .unwrap();
            let count: i64 = row.get("count");
            assert_eq!(count, 0, "{} not cascaded", table);
        }
    }

    #[tokio::test]
    async fn test_escalation_unique_per_reason() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();
        let author = insert_user(sqlite, "author").await;
        let reporter = insert_user(sqlite, "reporter").await;
        let article = insert_article(sqlite, "reported", author).await;

        let report = |reason: &'static str| {
            sqlx::query("INSERT INTO escalations (reporter_id, article_id, reason) VALUES (?, ?, ?)")
                .bind(reporter)
                .bind(article)
                .bind(reason)
                .execute(sqlite)
        };

        assert!(report("Spam").await.is_ok());
        assert!(report("Plagiarism").await.is_ok());
        assert!(report("Spam").await.is_err());
    }
}
