//! Article repository
//!
//! Database operations for articles. Listing supports the author, title and
//! tag filters of the public article feed; the filter is rendered into a
//! WHERE clause shared by the page query and the count query.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleFilter, CreateArticleInput, DEFAULT_ARTICLE_IMAGE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article under an already unique slug
    async fn create(&self, slug: &str, input: &CreateArticleInput, author_id: i64) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Check if a slug is taken, optionally ignoring one article
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Persist slug, title, description, body and image
    async fn update(&self, article: &Article) -> Result<Article>;

    /// Delete an article; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Page of articles matching the filter, newest first
    async fn list(&self, filter: &ArticleFilter, offset: i64, limit: i64) -> Result<Vec<Article>>;

    /// Number of articles matching the filter
    async fn count(&self, filter: &ArticleFilter) -> Result<i64>;

    /// Articles the user has favorited, most recently favorited first
    async fn list_favorited_by(&self, user_id: i64) -> Result<Vec<Article>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, slug: &str, input: &CreateArticleInput, author_id: i64) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_article_sqlite(self.pool.as_sqlite().unwrap(), slug, input, author_id).await
            }
            DatabaseDriver::Mysql => {
                create_article_mysql(self.pool.as_mysql().unwrap(), slug, input, author_id).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles a WHERE a.id = ?", ARTICLE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get article by id")?;
                Ok(row.as_ref().map(row_to_article_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get article by id")?;
                Ok(row.as_ref().map(row_to_article_mysql))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles a WHERE a.slug = ?", ARTICLE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get article by slug")?;
                Ok(row.as_ref().map(row_to_article_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get article by slug")?;
                Ok(row.as_ref().map(row_to_article_mysql))
            }
        }
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM articles WHERE slug = ? AND id <> ?";
        // Article ids start at 1, so 0 excludes nothing
        let exclude = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check slug")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check slug")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        let now = Utc::now();
        let sql = r#"
            UPDATE articles
            SET slug = ?, title = ?, description = ?, body = ?, image = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&article.slug)
                    .bind(&article.title)
                    .bind(&article.description)
                    .bind(&article.body)
                    .bind(&article.image)
                    .bind(now)
                    .bind(article.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update article")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&article.slug)
                    .bind(&article.title)
                    .bind(&article.description)
                    .bind(&article.body)
                    .bind(&article.image)
                    .bind(now)
                    .bind(article.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update article")?;
            }
        }
        Ok(Article {
            updated_at: now,
            ..article.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM articles WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete article")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete article")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(&self, filter: &ArticleFilter, offset: i64, limit: i64) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_articles_sqlite(self.pool.as_sqlite().unwrap(), filter, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_articles_mysql(self.pool.as_mysql().unwrap(), filter, offset, limit).await
            }
        }
    }

    async fn count(&self, filter: &ArticleFilter) -> Result<i64> {
        let (where_clause, binds) = filter_clause(filter);
        let sql = format!(
            "SELECT COUNT(*) as count FROM articles a JOIN users u ON u.id = a.author_id {}",
            where_clause
        );
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                for value in &binds {
                    query = query.bind(value);
                }
                query
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count articles")?
                    .get("count")
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                for value in &binds {
                    query = query.bind(value);
                }
                query
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count articles")?
                    .get("count")
            }
        };
        Ok(count)
    }

    async fn list_favorited_by(&self, user_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            r#"
            SELECT {} FROM articles a
            JOIN favorites f ON f.article_id = a.id
            WHERE f.user_id = ?
            ORDER BY f.created_at DESC, a.id DESC
            "#,
            ARTICLE_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list favorited articles")?;
                Ok(rows.iter().map(row_to_article_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list favorited articles")?;
                Ok(rows.iter().map(row_to_article_mysql).collect())
            }
        }
    }
}

const ARTICLE_COLUMNS: &str = "a.id, a.slug, a.title, a.description, a.body, a.image, a.author_id, a.created_at, a.updated_at";

/// Render the listing filter as a WHERE clause plus its bind values, in order.
///
/// Expects `articles a` joined with `users u` on the author.
fn filter_clause(filter: &ArticleFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(author) = &filter.author {
        conditions.push("LOWER(u.username) LIKE ?".to_string());
        binds.push(format!("%{}%", author.to_lowercase()));
    }
    if let Some(title) = &filter.title {
        conditions.push("LOWER(a.title) LIKE ?".to_string());
        binds.push(format!("%{}%", title.to_lowercase()));
    }
    if !filter.tags.is_empty() {
        let placeholders = vec!["?"; filter.tags.len()].join(", ");
        conditions.push(format!(
            "a.id IN (SELECT at.article_id FROM article_tags at JOIN tags t ON t.id = at.tag_id WHERE t.name IN ({}))",
            placeholders
        ));
        binds.extend(filter.tags.iter().cloned());
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), binds)
    }
}

fn list_sql(filter: &ArticleFilter) -> (String, Vec<String>) {
    let (where_clause, binds) = filter_clause(filter);
    let sql = format!(
        r#"
        SELECT {} FROM articles a
        JOIN users u ON u.id = a.author_id
        {}
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT ? OFFSET ?
        "#,
        ARTICLE_COLUMNS, where_clause
    );
    (sql, binds)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(
    pool: &SqlitePool,
    slug: &str,
    input: &CreateArticleInput,
    author_id: i64,
) -> Result<Article> {
    let now = Utc::now();
    let image = input
        .image
        .clone()
        .unwrap_or_else(|| DEFAULT_ARTICLE_IMAGE.to_string());

    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, description, body, image, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(slug)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.body)
    .bind(&image)
    .bind(author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        slug: slug.to_string(),
        title: input.title.clone(),
        description: input.description.clone(),
        body: input.body.clone(),
        image,
        author_id,
        created_at: now,
        updated_at: now,
    })
}

async fn list_articles_sqlite(
    pool: &SqlitePool,
    filter: &ArticleFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let (sql, binds) = list_sql(filter);
    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_sqlite).collect())
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        body: row.get("body"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(
    pool: &MySqlPool,
    slug: &str,
    input: &CreateArticleInput,
    author_id: i64,
) -> Result<Article> {
    let now = Utc::now();
    let image = input
        .image
        .clone()
        .unwrap_or_else(|| DEFAULT_ARTICLE_IMAGE.to_string());

    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, description, body, image, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(slug)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.body)
    .bind(&image)
    .bind(author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        slug: slug.to_string(),
        title: input.title.clone(),
        description: input.description.clone(),
        body: input.body.clone(),
        image,
        author_id,
        created_at: now,
        updated_at: now,
    })
}

async fn list_articles_mysql(
    pool: &MySqlPool,
    filter: &ArticleFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let (sql, binds) = list_sql(filter);
    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    Ok(rows.iter().map(row_to_article_mysql).collect())
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Article {
    Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        body: row.get("body"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
