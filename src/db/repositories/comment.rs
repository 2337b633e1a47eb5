//! Comment repository
//!
//! Comments are one level deep: a row with `parent_id` set is a reply to a
//! top-level comment. Editing a comment copies the previous body into
//! `comment_history` in the same transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentHistory, CreateCommentInput};

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Top-level comments of an article, oldest first
    async fn list_top_level(&self, article_id: i64) -> Result<Vec<Comment>>;

    /// Replies to a comment, oldest first
    async fn list_replies(&self, parent_id: i64) -> Result<Vec<Comment>>;

    /// Replace the body, keeping the old one in the history
    async fn update_body(&self, id: i64, body: &str) -> Result<Option<Comment>>;

    /// Delete a comment and, through the cascade, its replies
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Previous bodies of a comment, oldest first
    async fn history(&self, comment_id: i64) -> Result<Vec<CommentHistory>>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_COLUMNS: &str = "id, article_id, author_id, parent_id, body, created_at, updated_at";

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_mysql))
            }
        }
    }

    async fn list_top_level(&self, article_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE article_id = ? AND parent_id IS NULL ORDER BY created_at, id",
            COMMENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), &sql, article_id).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), &sql, article_id).await,
        }
    }

    async fn list_replies(&self, parent_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE parent_id = ? ORDER BY created_at, id",
            COMMENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), &sql, parent_id).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), &sql, parent_id).await,
        }
    }

    async fn update_body(&self, id: i64, body: &str) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_body_sqlite(self.pool.as_sqlite().unwrap(), id, body).await?,
            DatabaseDriver::Mysql => update_body_mysql(self.pool.as_mysql().unwrap(), id, body).await?,
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn history(&self, comment_id: i64) -> Result<Vec<CommentHistory>> {
        let sql = "SELECT id, comment_id, body, created_at FROM comment_history WHERE comment_id = ? ORDER BY created_at, id";
        let history = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(comment_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get comment history")?
                .iter()
                .map(|r| CommentHistory {
                    id: r.get("id"),
                    comment_id: r.get("comment_id"),
                    body: r.get("body"),
                    created_at: r.get("created_at"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(comment_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get comment history")?
                .iter()
                .map(|r| CommentHistory {
                    id: r.get("id"),
                    comment_id: r.get("comment_id"),
                    body: r.get("body"),
                    created_at: r.get("created_at"),
                })
                .collect(),
        };
        Ok(history)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, parent_id, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.article_id)
    .bind(input.author_id)
    .bind(input.parent_id)
    .bind(&input.body)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        article_id: input.article_id,
        author_id: input.author_id,
        parent_id: input.parent_id,
        body: input.body.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn list_sqlite(pool: &SqlitePool, sql: &str, key: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(sql)
        .bind(key)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;
    Ok(rows.iter().map(row_to_comment_sqlite).collect())
}

async fn update_body_sqlite(pool: &SqlitePool, id: i64, body: &str) -> Result<()> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT INTO comment_history (comment_id, body, created_at) SELECT id, body, ? FROM comments WHERE id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to record comment history")?;

    sqlx::query("UPDATE comments SET body = ?, updated_at = ? WHERE id = ?")
        .bind(body)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update comment")?;

    tx.commit().await.context("Failed to commit comment update")?;
    Ok(())
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, parent_id, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.article_id)
    .bind(input.author_id)
    .bind(input.parent_id)
    .bind(&input.body)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        article_id: input.article_id,
        author_id: input.author_id,
        parent_id: input.parent_id,
        body: input.body.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn list_mysql(pool: &MySqlPool, sql: &str, key: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(sql)
        .bind(key)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;
    Ok(rows.iter().map(row_to_comment_mysql).collect())
}

async fn update_body_mysql(pool: &MySqlPool, id: i64, body: &str) -> Result<()> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT INTO comment_history (comment_id, body, created_at) SELECT id, body, ? FROM comments WHERE id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to record comment history")?;

    sqlx::query("UPDATE comments SET body = ?, updated_at = ? WHERE id = ?")
        .bind(body)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update comment")?;

    tx.commit().await.context("Failed to commit comment update")?;
    Ok(())
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};

    fn input(article_id: i64, author_id: i64, parent_id: Option<i64>, body: &str) -> CreateCommentInput {
        CreateCommentInput {
            article_id,
            author_id,
            parent_id,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_top_level_and_replies() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "discussed").await;
        let repo = SqlxCommentRepository::new(pool);

        let first = repo.create(&input(article.id, ada.id, None, "first")).await.unwrap();
        let second = repo.create(&input(article.id, ada.id, None, "second")).await.unwrap();
        let reply = repo
            .create(&input(article.id, ada.id, Some(first.id), "reply"))
            .await
            .unwrap();

        let top: Vec<i64> = repo
            .list_top_level(article.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(top, vec![first.id, second.id]);

        let replies = repo.list_replies(first.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, reply.id);
        assert!(replies[0].is_reply());
        assert!(repo.list_replies(second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_records_history() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "edited").await;
        let repo = SqlxCommentRepository::new(pool);

        let comment = repo.create(&input(article.id, ada.id, None, "v1")).await.unwrap();
        repo.update_body(comment.id, "v2").await.unwrap();
        let updated = repo.update_body(comment.id, "v3").await.unwrap().unwrap();

        assert_eq!(updated.body, "v3");
        let history: Vec<String> = repo
            .history(comment.id)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.body)
            .collect();
        assert_eq!(history, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_update_missing_comment() {
        let pool = setup_pool().await;
        let repo = SqlxCommentRepository::new(pool);
        assert!(repo.update_body(404, "nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "pruned").await;
        let repo = SqlxCommentRepository::new(pool);

        let parent = repo.create(&input(article.id, ada.id, None, "parent")).await.unwrap();
        let reply = repo
            .create(&input(article.id, ada.id, Some(parent.id), "reply"))
            .await
            .unwrap();

        assert!(repo.delete(parent.id).await.unwrap());
        assert!(repo.get_by_id(reply.id).await.unwrap().is_none());
        assert!(!repo.delete(parent.id).await.unwrap());
    }
}
