//! Vote repository
//!
//! Likes and dislikes on articles and on comments share one shape: a row per
//! (user, target) holding +1 or -1. `VoteTarget` picks the table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{VoteCounts, VoteKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// What a vote is cast on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Article,
    Comment,
}

impl VoteTarget {
    fn table(self) -> &'static str {
        match self {
            VoteTarget::Article => "article_votes",
            VoteTarget::Comment => "comment_votes",
        }
    }

    fn column(self) -> &'static str {
        match self {
            VoteTarget::Article => "article_id",
            VoteTarget::Comment => "comment_id",
        }
    }
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// The user's current vote, if any
    async fn get(&self, target: VoteTarget, user_id: i64, target_id: i64) -> Result<Option<VoteKind>>;

    /// Cast or change a vote
    async fn set(&self, target: VoteTarget, user_id: i64, target_id: i64, kind: VoteKind) -> Result<()>;

    /// Withdraw a vote; returns whether one existed
    async fn delete(&self, target: VoteTarget, user_id: i64, target_id: i64) -> Result<bool>;

    async fn counts(&self, target: VoteTarget, target_id: i64) -> Result<VoteCounts>;
}

pub struct SqlxVoteRepository {
    pool: DynDatabasePool,
}

impl SqlxVoteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VoteRepository for SqlxVoteRepository {
    async fn get(&self, target: VoteTarget, user_id: i64, target_id: i64) -> Result<Option<VoteKind>> {
        let sql = format!(
            "SELECT value FROM {} WHERE user_id = ? AND {} = ?",
            target.table(),
            target.column()
        );
        let value: Option<i32> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(target_id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get vote")?
                .map(|r| r.get("value")),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(target_id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get vote")?
                .map(|r| r.get("value")),
        };
        Ok(value.and_then(VoteKind::from_value))
    }

    async fn set(&self, target: VoteTarget, user_id: i64, target_id: i64, kind: VoteKind) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let sql = format!(
                    r#"
                    INSERT INTO {table} (user_id, {col}, value, created_at) VALUES (?, ?, ?, ?)
                    ON CONFLICT (user_id, {col}) DO UPDATE SET value = excluded.value
                    "#,
                    table = target.table(),
                    col = target.column()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(target_id)
                    .bind(kind.value())
                    .bind(now)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to save vote")?;
            }
            DatabaseDriver::Mysql => {
                let sql = format!(
                    r#"
                    INSERT INTO {table} (user_id, {col}, value, created_at) VALUES (?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE value = VALUES(value)
                    "#,
                    table = target.table(),
                    col = target.column()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(target_id)
                    .bind(kind.value())
                    .bind(now)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to save vote")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, target: VoteTarget, user_id: i64, target_id: i64) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ? AND {} = ?",
            target.table(),
            target.column()
        );
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(target_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete vote")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(target_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete vote")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn counts(&self, target: VoteTarget, target_id: i64) -> Result<VoteCounts> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN value > 0 THEN 1 ELSE 0 END), 0) as likes,
                COALESCE(SUM(CASE WHEN value < 0 THEN 1 ELSE 0 END), 0) as dislikes
            FROM {} WHERE {} = ?
            "#,
            target.table(),
            target.column()
        );
        let counts = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(target_id)
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count votes")?;
                VoteCounts {
                    likes: row.get("likes"),
                    dislikes: row.get("dislikes"),
                }
            }
            DatabaseDriver::Mysql => {
                // SUM yields DECIMAL on MySQL
                let row = sqlx::query(&format!(
                    "SELECT CAST(likes AS SIGNED) as likes, CAST(dislikes AS SIGNED) as dislikes FROM ({}) v",
                    sql
                ))
                .bind(target_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count votes")?;
                VoteCounts {
                    likes: row.get("likes"),
                    dislikes: row.get("dislikes"),
                }
            }
        };
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};

    #[tokio::test]
    async fn test_set_get_and_change_vote() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "voted").await;
        let repo = SqlxVoteRepository::new(pool);

        assert_eq!(repo.get(VoteTarget::Article, ada.id, article.id).await.unwrap(), None);

        repo.set(VoteTarget::Article, ada.id, article.id, VoteKind::Like).await.unwrap();
        assert_eq!(
            repo.get(VoteTarget::Article, ada.id, article.id).await.unwrap(),
            Some(VoteKind::Like)
        );

        repo.set(VoteTarget::Article, ada.id, article.id, VoteKind::Dislike).await.unwrap();
        let counts = repo.counts(VoteTarget::Article, article.id).await.unwrap();
        assert_eq!(counts, VoteCounts { likes: 0, dislikes: 1 });
    }

    #[tokio::test]
    async fn test_counts_and_delete() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let cy = insert_user(&pool, "cy").await;
        let article = insert_article(&pool, ada.id, "counted").await;
        let repo = SqlxVoteRepository::new(pool);

        assert_eq!(
            repo.counts(VoteTarget::Article, article.id).await.unwrap(),
            VoteCounts::default()
        );

        repo.set(VoteTarget::Article, ada.id, article.id, VoteKind::Like).await.unwrap();
        repo.set(VoteTarget::Article, bob.id, article.id, VoteKind::Like).await.unwrap();
        repo.set(VoteTarget::Article, cy.id, article.id, VoteKind::Dislike).await.unwrap();
        assert_eq!(
            repo.counts(VoteTarget::Article, article.id).await.unwrap(),
            VoteCounts { likes: 2, dislikes: 1 }
        );

        assert!(repo.delete(VoteTarget::Article, bob.id, article.id).await.unwrap());
        assert!(!repo.delete(VoteTarget::Article, bob.id, article.id).await.unwrap());
        assert_eq!(
            repo.counts(VoteTarget::Article, article.id).await.unwrap().likes,
            1
        );
    }
}
