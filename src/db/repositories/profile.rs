//! Profile repository
//!
//! Profiles are 1:1 with users and created at registration. The follow graph
//! lives here as well since every follow query is phrased in terms of
//! usernames shown on a profile.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Profile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert an empty profile for a new user
    async fn create(&self, user_id: i64) -> Result<Profile>;

    async fn get(&self, user_id: i64) -> Result<Option<Profile>>;

    /// Persist names, bio and image
    async fn update(&self, profile: &Profile) -> Result<Profile>;

    /// Returns false when the pair already exists
    async fn follow(&self, follower_id: i64, followee_id: i64) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool>;

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool>;

    /// Usernames the user follows, alphabetical
    async fn following(&self, user_id: i64) -> Result<Vec<String>>;

    /// Usernames following the user, alphabetical
    async fn followers(&self, user_id: i64) -> Result<Vec<String>>;

    /// Ids of everyone following the user
    async fn follower_ids(&self, user_id: i64) -> Result<Vec<i64>>;
}

pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

const FOLLOWING_SQL: &str = r#"
    SELECT u.username FROM follows f
    JOIN users u ON u.id = f.followee_id
    WHERE f.follower_id = ?
    ORDER BY u.username
"#;

const FOLLOWERS_SQL: &str = r#"
    SELECT u.username FROM follows f
    JOIN users u ON u.id = f.follower_id
    WHERE f.followee_id = ?
    ORDER BY u.username
"#;

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, user_id: i64) -> Result<Profile> {
        let profile = Profile::empty(user_id);
        let sql = "INSERT INTO profiles (user_id, created_at, updated_at) VALUES (?, ?, ?)";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(user_id)
                    .bind(profile.created_at)
                    .bind(profile.updated_at)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to create profile")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(user_id)
                    .bind(profile.created_at)
                    .bind(profile.updated_at)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to create profile")?;
            }
        }
        Ok(profile)
    }

    async fn get(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_profile_sqlite(self.pool.as_sqlite().unwrap(), user_id).await,
            DatabaseDriver::Mysql => get_profile_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        let now = Utc::now();
        let sql = r#"
            UPDATE profiles
            SET first_name = ?, last_name = ?, bio = ?, image = ?, updated_at = ?
            WHERE user_id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&profile.first_name)
                    .bind(&profile.last_name)
                    .bind(&profile.bio)
                    .bind(&profile.image)
                    .bind(now)
                    .bind(profile.user_id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update profile")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&profile.first_name)
                    .bind(&profile.last_name)
                    .bind(&profile.bio)
                    .bind(&profile.image)
                    .bind(now)
                    .bind(profile.user_id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update profile")?;
            }
        }
        Ok(Profile {
            updated_at: now,
            ..profile.clone()
        })
    }

    async fn follow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(
                "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(followee_id)
            .bind(now)
            .execute(self.pool.as_sqlite().unwrap())
            .await
            .context("Failed to follow user")?
            .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(
                "INSERT IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(followee_id)
            .bind(now)
            .execute(self.pool.as_mysql().unwrap())
            .await
            .context("Failed to follow user")?
            .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let sql = "DELETE FROM follows WHERE follower_id = ? AND followee_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(follower_id)
                .bind(followee_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to unfollow user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(follower_id)
                .bind(followee_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to unfollow user")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM follows WHERE follower_id = ? AND followee_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(follower_id)
                .bind(followee_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check follow")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(follower_id)
                .bind(followee_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check follow")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn following(&self, user_id: i64) -> Result<Vec<String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                usernames_sqlite(self.pool.as_sqlite().unwrap(), FOLLOWING_SQL, user_id).await
            }
            DatabaseDriver::Mysql => {
                usernames_mysql(self.pool.as_mysql().unwrap(), FOLLOWING_SQL, user_id).await
            }
        }
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                usernames_sqlite(self.pool.as_sqlite().unwrap(), FOLLOWERS_SQL, user_id).await
            }
            DatabaseDriver::Mysql => {
                usernames_mysql(self.pool.as_mysql().unwrap(), FOLLOWERS_SQL, user_id).await
            }
        }
    }

    async fn follower_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let sql = "SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY follower_id";
        let ids = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list follower ids")?
                .iter()
                .map(|r| r.get("follower_id"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list follower ids")?
                .iter()
                .map(|r| r.get("follower_id"))
                .collect(),
        };
        Ok(ids)
    }
}

const PROFILE_COLUMNS: &str = "user_id, first_name, last_name, bio, image, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_profile_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get profile")?;

    Ok(row.map(|r| Profile {
        user_id: r.get("user_id"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        bio: r.get("bio"),
        image: r.get("image"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }))
}

async fn usernames_sqlite(pool: &SqlitePool, sql: &str, user_id: i64) -> Result<Vec<String>> {
    let rows = sqlx::query(sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list follows")?;
    Ok(rows.iter().map(|r| r.get("username")).collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_profile_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE user_id = ?", PROFILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get profile")?;

    Ok(row.map(|r| Profile {
        user_id: r.get("user_id"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        bio: r.get("bio"),
        image: r.get("image"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }))
}

async fn usernames_mysql(pool: &MySqlPool, sql: &str, user_id: i64) -> Result<Vec<String>> {
    let rows = sqlx::query(sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list follows")?;
    Ok(rows.iter().map(|r| r.get("username")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};

    #[tokio::test]
    async fn test_create_get_update_profile() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "ada").await;
        let repo = SqlxProfileRepository::new(pool);

        repo.create(user.id).await.unwrap();
        let mut profile = repo.get(user.id).await.unwrap().expect("profile");
        assert_eq!(profile.bio, "");
        assert!(profile.image.is_none());

        profile.first_name = "Ada".to_string();
        profile.image = Some("https://img.example.com/ada.png".to_string());
        repo.update(&profile).await.unwrap();

        let found = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Ada");
        assert_eq!(found.image.as_deref(), Some("https://img.example.com/ada.png"));
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let repo = SqlxProfileRepository::new(pool);

        assert!(repo.follow(ada.id, bob.id).await.unwrap());
        assert!(!repo.follow(ada.id, bob.id).await.unwrap());
        assert!(repo.is_following(ada.id, bob.id).await.unwrap());
        assert!(!repo.is_following(bob.id, ada.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_lists() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let cy = insert_user(&pool, "cy").await;
        let repo = SqlxProfileRepository::new(pool);

        repo.follow(bob.id, ada.id).await.unwrap();
        repo.follow(cy.id, ada.id).await.unwrap();
        repo.follow(ada.id, cy.id).await.unwrap();

        assert_eq!(repo.followers(ada.id).await.unwrap(), vec!["bob", "cy"]);
        assert_eq!(repo.following(ada.id).await.unwrap(), vec!["cy"]);
        assert_eq!(repo.follower_ids(ada.id).await.unwrap(), vec![bob.id, cy.id]);

        assert!(repo.unfollow(bob.id, ada.id).await.unwrap());
        assert!(!repo.unfollow(bob.id, ada.id).await.unwrap());
        assert_eq!(repo.followers(ada.id).await.unwrap(), vec!["cy"]);
    }
}
