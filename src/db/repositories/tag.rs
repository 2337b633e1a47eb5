//! Tag repository
//!
//! Tags are created on demand from an article's tag list and linked through
//! `article_tags`, which keeps the position each tag had in that list.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Replace the article's tags with `names`, in order
    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()>;

    /// Tag names of an article in their original order
    async fn get_for_article(&self, article_id: i64) -> Result<Vec<String>>;

    /// All tag names, alphabetical
    async fn list_names(&self) -> Result<Vec<String>>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

const ARTICLE_TAGS_SQL: &str = r#"
    SELECT t.name FROM tags t
    JOIN article_tags at ON at.tag_id = t.id
    WHERE at.article_id = ?
    ORDER BY at.position
"#;

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_article_tags_sqlite(self.pool.as_sqlite().unwrap(), article_id, names).await
            }
            DatabaseDriver::Mysql => {
                set_article_tags_mysql(self.pool.as_mysql().unwrap(), article_id, names).await
            }
        }
    }

    async fn get_for_article(&self, article_id: i64) -> Result<Vec<String>> {
        let names = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(ARTICLE_TAGS_SQL)
                .bind(article_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get article tags")?
                .iter()
                .map(|r| r.get("name"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(ARTICLE_TAGS_SQL)
                .bind(article_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get article tags")?
                .iter()
                .map(|r| r.get("name"))
                .collect(),
        };
        Ok(names)
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let sql = "SELECT name FROM tags ORDER BY name";
        let names = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list tags")?
                .iter()
                .map(|r| r.get("name"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list tags")?
                .iter()
                .map(|r| r.get("name"))
                .collect(),
        };
        Ok(names)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn set_article_tags_sqlite(pool: &SqlitePool, article_id: i64, names: &[String]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for (position, name) in names.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await
            .context("Failed to create tag")?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO article_tags (article_id, tag_id, position)
            SELECT ?, id, ? FROM tags WHERE name = ?
            "#,
        )
        .bind(article_id)
        .bind(position as i64)
        .bind(name)
        .execute(&mut *tx)
        .await
        .context("Failed to tag article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn set_article_tags_mysql(pool: &MySqlPool, article_id: i64, names: &[String]) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for (position, name) in names.iter().enumerate() {
        sqlx::query("INSERT IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await
            .context("Failed to create tag")?;

        sqlx::query(
            r#"
            INSERT IGNORE INTO article_tags (article_id, tag_id, position)
            SELECT ?, id, ? FROM tags WHERE name = ?
            "#,
        )
        .bind(article_id)
        .bind(position as i64)
        .bind(name)
        .execute(&mut *tx)
        .await
        .context("Failed to tag article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_tags_keep_order() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, author.id, "ordered").await;
        let repo = SqlxTagRepository::new(pool);

        repo.set_article_tags(article.id, &names(&["zeta", "alpha", "mid"]))
            .await
            .unwrap();

        assert_eq!(
            repo.get_for_article(article.id).await.unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
        assert_eq!(repo.list_names().await.unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_replacing_tags() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, author.id, "retagged").await;
        let repo = SqlxTagRepository::new(pool);

        repo.set_article_tags(article.id, &names(&["a", "b"])).await.unwrap();
        repo.set_article_tags(article.id, &names(&["b", "c"])).await.unwrap();

        assert_eq!(repo.get_for_article(article.id).await.unwrap(), vec!["b", "c"]);
        // Tag rows outlive the links
        assert_eq!(repo.list_names().await.unwrap(), vec!["a", "b", "c"]);

        repo.set_article_tags(article.id, &[]).await.unwrap();
        assert!(repo.get_for_article(article.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags_shared_between_articles() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "ada").await;
        let first = insert_article(&pool, author.id, "first").await;
        let second = insert_article(&pool, author.id, "second").await;
        let repo = SqlxTagRepository::new(pool);

        repo.set_article_tags(first.id, &names(&["rust"])).await.unwrap();
        repo.set_article_tags(second.id, &names(&["rust", "web"])).await.unwrap();

        assert_eq!(repo.list_names().await.unwrap(), vec!["rust", "web"]);
    }
}
