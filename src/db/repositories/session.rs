//! Session repository
//!
//! Login sessions are rows keyed by the opaque token handed to the client.
//! Logout deletes one row, password reset deletes all rows of a user.

use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a freshly started session
    async fn create(&self, session: &Session) -> Result<()>;

    /// Look up a session by token, expired or not
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Remove one session; returns whether it existed
    async fn delete(&self, token: &str) -> Result<bool>;

    /// Remove every session of a user
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Remove sessions whose expiry has passed
    async fn delete_expired(&self) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        let sql = "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
        on_backend!(self.pool, |db| {
            sqlx::query(sql)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(db)
                .await
                .context("Failed to create session")?;
        });
        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let sql = "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
        let session = on_backend!(self.pool, |db| {
            sqlx::query(sql)
                .bind(token)
                .fetch_optional(db)
                .await
                .context("Failed to load session")?
                .map(|row| Session {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    expires_at: row.get("expires_at"),
                    created_at: row.get("created_at"),
                })
        });
        Ok(session)
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let removed = self
            .delete_matching("DELETE FROM sessions WHERE id = ?", token.to_string())
            .await
            .context("Failed to delete session")?;
        Ok(removed > 0)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        self.delete_matching("DELETE FROM sessions WHERE user_id = ?", user_id)
            .await
            .context("Failed to delete user sessions")
    }

    async fn delete_expired(&self) -> Result<u64> {
        self.delete_matching("DELETE FROM sessions WHERE expires_at < ?", Utc::now())
            .await
            .context("Failed to purge expired sessions")
    }
}

impl SqlxSessionRepository {
    async fn delete_matching<T>(&self, sql: &str, value: T) -> Result<u64>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Sqlite>
            + sqlx::Type<sqlx::Sqlite>
            + for<'q> sqlx::Encode<'q, sqlx::MySql>
            + sqlx::Type<sqlx::MySql>
            + Send
            + 'static,
    {
        let affected = on_backend!(self.pool, |db| {
            sqlx::query(sql).bind(value).execute(db).await?.rows_affected()
        });
        Ok(affected)
    }
}
