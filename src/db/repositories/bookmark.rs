//! Bookmark repository
//!
//! Unlike favorites, bookmarks have their own id so the owner can remove one
//! from the bookmark list without knowing the article.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Bookmark, BookmarkedArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Bookmark an article; `None` when the user already bookmarked it
    async fn create(&self, user_id: i64, article_id: i64) -> Result<Option<Bookmark>>;

    async fn get(&self, id: i64) -> Result<Option<Bookmark>>;

    /// The user's bookmarks with article slug and title, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookmarkedArticle>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxBookmarkRepository {
    pool: DynDatabasePool,
}

impl SqlxBookmarkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookmarkRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIST_SQL: &str = r#"
    SELECT b.id, a.slug, a.title, b.created_at
    FROM bookmarks b
    JOIN articles a ON a.id = b.article_id
    WHERE b.user_id = ?
    ORDER BY b.created_at DESC, b.id DESC
"#;

#[async_trait]
impl BookmarkRepository for SqlxBookmarkRepository {
    async fn create(&self, user_id: i64, article_id: i64) -> Result<Option<Bookmark>> {
        let now = Utc::now();
        let (affected, id) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO bookmarks (user_id, article_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(article_id)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to bookmark article")?;
                (result.rows_affected(), result.last_insert_rowid())
            }
            DatabaseDriver::Mysql => {
                let result = sqlx::query(
                    "INSERT IGNORE INTO bookmarks (user_id, article_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(article_id)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to bookmark article")?;
                (result.rows_affected(), result.last_insert_id() as i64)
            }
        };

        if affected == 0 {
            return Ok(None);
        }
        Ok(Some(Bookmark {
            id,
            user_id,
            article_id,
            created_at: now,
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<Bookmark>> {
        let sql = "SELECT id, user_id, article_id, created_at FROM bookmarks WHERE id = ?";
        let bookmark = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get bookmark")?
                .map(|r| Bookmark {
                    id: r.get("id"),
                    user_id: r.get("user_id"),
                    article_id: r.get("article_id"),
                    created_at: r.get("created_at"),
                }),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get bookmark")?
                .map(|r| Bookmark {
                    id: r.get("id"),
                    user_id: r.get("user_id"),
                    article_id: r.get("article_id"),
                    created_at: r.get("created_at"),
                }),
        };
        Ok(bookmark)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookmarkedArticle>> {
        let list = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(LIST_SQL)
                .bind(user_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list bookmarks")?
                .iter()
                .map(|r| BookmarkedArticle {
                    id: r.get("id"),
                    slug: r.get("slug"),
                    title: r.get("title"),
                    created_at: r.get("created_at"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(LIST_SQL)
                .bind(user_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list bookmarks")?
                .iter()
                .map(|r| BookmarkedArticle {
                    id: r.get("id"),
                    slug: r.get("slug"),
                    title: r.get("title"),
                    created_at: r.get("created_at"),
                })
                .collect(),
        };
        Ok(list)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM bookmarks WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete bookmark")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete bookmark")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};

    #[tokio::test]
    async fn test_bookmark_once() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "keep-me").await;
        let repo = SqlxBookmarkRepository::new(pool);

        let bookmark = repo.create(ada.id, article.id).await.unwrap().expect("bookmark");
        assert!(bookmark.id > 0);
        assert!(repo.create(ada.id, article.id).await.unwrap().is_none());

        let found = repo.get(bookmark.id).await.unwrap().unwrap();
        assert_eq!(found.article_id, article.id);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let article = insert_article(&pool, ada.id, "keep-me").await;
        let repo = SqlxBookmarkRepository::new(pool);

        let bookmark = repo.create(bob.id, article.id).await.unwrap().unwrap();

        let listed = repo.list_for_user(bob.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "keep-me");
        assert_eq!(listed[0].id, bookmark.id);
        assert!(repo.list_for_user(ada.id).await.unwrap().is_empty());

        assert!(repo.delete(bookmark.id).await.unwrap());
        assert!(!repo.delete(bookmark.id).await.unwrap());
    }
}
