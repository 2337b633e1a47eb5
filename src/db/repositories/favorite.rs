//! Favorite repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Returns false when already favorited
    async fn add(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn remove(&self, user_id: i64, article_id: i64) -> Result<bool>;

    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool>;

    async fn count(&self, article_id: i64) -> Result<i64>;

    /// Users who favorited the article; the audience for comment notifications
    async fn user_ids(&self, article_id: i64) -> Result<Vec<i64>>;
}

pub struct SqlxFavoriteRepository {
    pool: DynDatabasePool,
}

impl SqlxFavoriteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FavoriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavoriteRepository for SqlxFavoriteRepository {
    async fn add(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(
                "INSERT OR IGNORE INTO favorites (user_id, article_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(article_id)
            .bind(now)
            .execute(self.pool.as_sqlite().unwrap())
            .await
            .context("Failed to favorite article")?
            .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(
                "INSERT IGNORE INTO favorites (user_id, article_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(article_id)
            .bind(now)
            .execute(self.pool.as_mysql().unwrap())
            .await
            .context("Failed to favorite article")?
            .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn remove(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let sql = "DELETE FROM favorites WHERE user_id = ? AND article_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to unfavorite article")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to unfavorite article")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM favorites WHERE user_id = ? AND article_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check favorite")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check favorite")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn count(&self, article_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM favorites WHERE article_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count favorites")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count favorites")?
                .get("count"),
        };
        Ok(count)
    }

    async fn user_ids(&self, article_id: i64) -> Result<Vec<i64>> {
        let sql = "SELECT user_id FROM favorites WHERE article_id = ? ORDER BY user_id";
        let ids = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(article_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list favoriting users")?
                .iter()
                .map(|r| r.get("user_id"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(article_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list favoriting users")?
                .iter()
                .map(|r| r.get("user_id"))
                .collect(),
        };
        Ok(ids)
    }
}
