//! Highlight repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Highlight, HighlightField, NewHighlight};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait HighlightRepository: Send + Sync {
    async fn create(&self, highlight: &NewHighlight) -> Result<Highlight>;

    async fn get(&self, id: i64) -> Result<Option<Highlight>>;

    /// The user's highlights on one article, oldest first
    async fn list(&self, user_id: i64, article_id: i64) -> Result<Vec<Highlight>>;

    /// Whether the user already highlighted exactly this span
    async fn span_exists(
        &self,
        user_id: i64,
        article_id: i64,
        field: HighlightField,
        start_index: i64,
        end_index: i64,
    ) -> Result<bool>;

    /// Persist span, text and comment
    async fn update(&self, highlight: &Highlight) -> Result<Highlight>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxHighlightRepository {
    pool: DynDatabasePool,
}

impl SqlxHighlightRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn HighlightRepository> {
        Arc::new(Self::new(pool))
    }
}

const HIGHLIGHT_COLUMNS: &str = "id, user_id, article_id, field, start_index, end_index, comment, highlighted_text, created_at, updated_at";

#[async_trait]
impl HighlightRepository for SqlxHighlightRepository {
    async fn create(&self, highlight: &NewHighlight) -> Result<Highlight> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), highlight).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), highlight).await,
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Highlight>> {
        let sql = format!("SELECT {} FROM highlights WHERE id = ?", HIGHLIGHT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get highlight")?
                .map(|r| row_to_highlight_sqlite(&r))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get highlight")?
                .map(|r| row_to_highlight_mysql(&r))
                .transpose(),
        }
    }

    async fn list(&self, user_id: i64, article_id: i64) -> Result<Vec<Highlight>> {
        let sql = format!(
            "SELECT {} FROM highlights WHERE user_id = ? AND article_id = ? ORDER BY created_at, id",
            HIGHLIGHT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list highlights")?
                .iter()
                .map(row_to_highlight_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list highlights")?
                .iter()
                .map(row_to_highlight_mysql)
                .collect(),
        }
    }

    async fn span_exists(
        &self,
        user_id: i64,
        article_id: i64,
        field: HighlightField,
        start_index: i64,
        end_index: i64,
    ) -> Result<bool> {
        let sql = r#"
            SELECT COUNT(*) as count FROM highlights
            WHERE user_id = ? AND article_id = ? AND field = ? AND start_index = ? AND end_index = ?
        "#;
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .bind(field.to_string())
                .bind(start_index)
                .bind(end_index)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check highlight")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .bind(field.to_string())
                .bind(start_index)
                .bind(end_index)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check highlight")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn update(&self, highlight: &Highlight) -> Result<Highlight> {
        let now = Utc::now();
        let sql = r#"
            UPDATE highlights
            SET start_index = ?, end_index = ?, comment = ?, highlighted_text = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(highlight.start_index)
                    .bind(highlight.end_index)
                    .bind(&highlight.comment)
                    .bind(&highlight.highlighted_text)
                    .bind(now)
                    .bind(highlight.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update highlight")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(highlight.start_index)
                    .bind(highlight.end_index)
                    .bind(&highlight.comment)
                    .bind(&highlight.highlighted_text)
                    .bind(now)
                    .bind(highlight.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update highlight")?;
            }
        }
        Ok(Highlight {
            updated_at: now,
            ..highlight.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM highlights WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete highlight")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete highlight")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, new: &NewHighlight) -> Result<Highlight> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO highlights
            (user_id, article_id, field, start_index, end_index, comment, highlighted_text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.user_id)
    .bind(new.article_id)
    .bind(new.field.to_string())
    .bind(new.start_index)
    .bind(new.end_index)
    .bind(&new.comment)
    .bind(&new.highlighted_text)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create highlight")?;

    Ok(from_new(result.last_insert_rowid(), new, now))
}

fn row_to_highlight_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Highlight> {
    let field: String = row.get("field");
    Ok(Highlight {
        id: row.get("id"),
        user_id: row.get("user_id"),
        article_id: row.get("article_id"),
        field: HighlightField::from_str(&field)?,
        start_index: row.get("start_index"),
        end_index: row.get("end_index"),
        comment: row.get("comment"),
        highlighted_text: row.get("highlighted_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, new: &NewHighlight) -> Result<Highlight> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO highlights
            (user_id, article_id, field, start_index, end_index, comment, highlighted_text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.user_id)
    .bind(new.article_id)
    .bind(new.field.to_string())
    .bind(new.start_index)
    .bind(new.end_index)
    .bind(&new.comment)
    .bind(&new.highlighted_text)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create highlight")?;

    Ok(from_new(result.last_insert_id() as i64, new, now))
}

fn row_to_highlight_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Highlight> {
    let field: String = row.get("field");
    Ok(Highlight {
        id: row.get("id"),
        user_id: row.get("user_id"),
        article_id: row.get("article_id"),
        field: HighlightField::from_str(&field)?,
        start_index: row.get("start_index"),
        end_index: row.get("end_index"),
        comment: row.get("comment"),
        highlighted_text: row.get("highlighted_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn from_new(id: i64, new: &NewHighlight, now: chrono::DateTime<Utc>) -> Highlight {
    Highlight {
        id,
        user_id: new.user_id,
        article_id: new.article_id,
        field: new.field,
        start_index: new.start_index,
        end_index: new.end_index,
        comment: new.comment.clone(),
        highlighted_text: new.highlighted_text.clone(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};

    fn span(user_id: i64, article_id: i64, start: i64, end: i64) -> NewHighlight {
        NewHighlight {
            user_id,
            article_id,
            field: HighlightField::Body,
            start_index: start,
            end_index: end,
            comment: None,
            highlighted_text: "text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_span() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "marked").await;
        let repo = SqlxHighlightRepository::new(pool);

        let created = repo.create(&span(ada.id, article.id, 0, 3)).await.unwrap();
        let found = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(found.field, HighlightField::Body);
        assert_eq!((found.start_index, found.end_index), (0, 3));

        assert!(repo
            .span_exists(ada.id, article.id, HighlightField::Body, 0, 3)
            .await
            .unwrap());
        assert!(!repo
            .span_exists(ada.id, article.id, HighlightField::Title, 0, 3)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_is_per_user() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let article = insert_article(&pool, ada.id, "marked").await;
        let repo = SqlxHighlightRepository::new(pool);

        repo.create(&span(ada.id, article.id, 0, 1)).await.unwrap();
        repo.create(&span(ada.id, article.id, 2, 3)).await.unwrap();
        repo.create(&span(bob.id, article.id, 0, 1)).await.unwrap();

        assert_eq!(repo.list(ada.id, article.id).await.unwrap().len(), 2);
        assert_eq!(repo.list(bob.id, article.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "marked").await;
        let repo = SqlxHighlightRepository::new(pool);

        let mut highlight = repo.create(&span(ada.id, article.id, 0, 1)).await.unwrap();
        highlight.end_index = 4;
        highlight.comment = Some("nice".to_string());
        repo.update(&highlight).await.unwrap();

        let found = repo.get(highlight.id).await.unwrap().unwrap();
        assert_eq!(found.end_index, 4);
        assert_eq!(found.comment.as_deref(), Some("nice"));

        assert!(repo.delete(highlight.id).await.unwrap());
        assert!(repo.get(highlight.id).await.unwrap().is_none());
    }
}
