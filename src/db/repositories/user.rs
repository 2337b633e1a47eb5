//! User repository
//!
//! Accounts are looked up by id, username or (case-insensitively) email.

use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an account; returns it with the assigned id
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Exact, case-sensitive username match
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Email match ignoring case and surrounding whitespace
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist username, email, password hash, role and verification flag
    async fn update(&self, user: &User) -> Result<User>;

    /// Mark the account's email as confirmed
    async fn set_verified(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_where(&self, condition: &str, value: String) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, email, password_hash, role, is_verified, created_at, updated_at \
             FROM users WHERE {}",
            condition
        );
        on_backend!(self.pool, |db| {
            let row = sqlx::query(&sql)
                .bind(&value)
                .fetch_optional(db)
                .await
                .context("Failed to load user")?;
            match row {
                Some(row) => Ok(Some(User {
                    id: row.get("id"),
                    username: row.get("username"),
                    email: row.get("email"),
                    password_hash: row.get("password_hash"),
                    role: parse_role(row.get("role"))?,
                    is_verified: row.get("is_verified"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                })),
                None => Ok(None),
            }
        })
    }
}

fn parse_role(stored: String) -> Result<UserRole> {
    stored
        .parse()
        .with_context(|| format!("Unknown role stored for user: {}", stored))
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let sql = "INSERT INTO users (username, email, password_hash, role, is_verified, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?, ?)";
        let role = user.role.to_string();
        let id = on_backend!(self.pool, |db| {
            let done = sqlx::query(sql)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(user.is_verified)
                .bind(now)
                .bind(now)
                .execute(db)
                .await
                .context("Failed to create user")?;
            done.inserted_id()
        });

        Ok(User {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_where("id = ?", id.to_string()).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_where("username = ?", username.to_string()).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_where("LOWER(email) = ?", email.trim().to_lowercase())
            .await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let sql = "UPDATE users SET username = ?, email = ?, password_hash = ?, role = ?, \
                   is_verified = ?, updated_at = ? WHERE id = ?";
        let role = user.role.to_string();
        on_backend!(self.pool, |db| {
            sqlx::query(sql)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&role)
                .bind(user.is_verified)
                .bind(now)
                .bind(user.id)
                .execute(db)
                .await
                .context("Failed to update user")?;
        });

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn set_verified(&self, id: i64) -> Result<()> {
        let sql = "UPDATE users SET is_verified = TRUE, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        on_backend!(self.pool, |db| {
            sqlx::query(sql)
                .bind(now)
                .bind(id)
                .execute(db)
                .await
                .context("Failed to verify user")?;
        });
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM users";
        let count: i64 = on_backend!(self.pool, |db| {
            sqlx::query_scalar(sql)
                .fetch_one(db)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }
}

/// Primary key assigned by the last insert, for either backend
trait InsertedId {
    fn inserted_id(&self) -> i64;
}

impl InsertedId for sqlx::sqlite::SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertedId for sqlx::mysql::MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}
