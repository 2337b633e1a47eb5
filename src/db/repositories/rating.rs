//! Rating repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Rating;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Create the user's rating or replace its score
    async fn upsert(&self, user_id: i64, article_id: i64, score: i32) -> Result<Rating>;

    /// Mean score of an article, `None` when nobody rated it
    async fn average(&self, article_id: i64) -> Result<Option<f64>>;
}

pub struct SqlxRatingRepository {
    pool: DynDatabasePool,
}

impl SqlxRatingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RatingRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RatingRepository for SqlxRatingRepository {
    async fn upsert(&self, user_id: i64, article_id: i64, score: i32) -> Result<Rating> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    r#"
                    INSERT INTO ratings (user_id, article_id, score, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT (user_id, article_id)
                    DO UPDATE SET score = excluded.score, updated_at = excluded.updated_at
                    "#,
                )
                .bind(user_id)
                .bind(article_id)
                .bind(score)
                .bind(now)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to save rating")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    r#"
                    INSERT INTO ratings (user_id, article_id, score, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE score = VALUES(score), updated_at = VALUES(updated_at)
                    "#,
                )
                .bind(user_id)
                .bind(article_id)
                .bind(score)
                .bind(now)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to save rating")?;
            }
        }
        Ok(Rating {
            user_id,
            article_id,
            score,
            updated_at: now,
        })
    }

    async fn average(&self, article_id: i64) -> Result<Option<f64>> {
        let average = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(
                "SELECT AVG(CAST(score AS REAL)) as average FROM ratings WHERE article_id = ?",
            )
            .bind(article_id)
            .fetch_one(self.pool.as_sqlite().unwrap())
            .await
            .context("Failed to average ratings")?
            .get("average"),
            DatabaseDriver::Mysql => sqlx::query(
                "SELECT AVG(CAST(score AS DOUBLE)) as average FROM ratings WHERE article_id = ?",
            )
            .bind(article_id)
            .fetch_one(self.pool.as_mysql().unwrap())
            .await
            .context("Failed to average ratings")?
            .get("average"),
        };
        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};
    use crate::models::round_rating;

    #[tokio::test]
    async fn test_average_of_no_ratings_is_none() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "unrated").await;
        let repo = SqlxRatingRepository::new(pool);

        assert_eq!(repo.average(article.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_replaces_score() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let cy = insert_user(&pool, "cy").await;
        let article = insert_article(&pool, ada.id, "rated").await;
        let repo = SqlxRatingRepository::new(pool);

        repo.upsert(bob.id, article.id, 2).await.unwrap();
        repo.upsert(bob.id, article.id, 4).await.unwrap();
        assert_eq!(repo.average(article.id).await.unwrap(), Some(4.0));

        repo.upsert(cy.id, article.id, 5).await.unwrap();
        repo.upsert(ada.id, article.id, 5).await.unwrap();
        let average = repo.average(article.id).await.unwrap().unwrap();
        assert_eq!(round_rating(average), 4.67);
    }

    #[tokio::test]
    async fn test_out_of_range_score_rejected_by_schema() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let article = insert_article(&pool, ada.id, "checked").await;
        let repo = SqlxRatingRepository::new(pool);

        assert!(repo.upsert(ada.id, article.id, 6).await.is_err());
    }
}
