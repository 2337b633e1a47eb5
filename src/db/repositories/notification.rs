//! Notification repository
//!
//! Notifications are soft deleted: a deleted row stays in the table but is
//! hidden from every listing. Preferences fall back to "everything on" for
//! users without a stored row.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{NewNotification, Notification, NotificationPreferences};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// Visible notifications of a user, newest first
    async fn list(&self, recipient_id: i64, unread_only: bool) -> Result<Vec<Notification>>;

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64>;

    async fn mark_emailed(&self, id: i64) -> Result<()>;

    /// Hide every visible notification of a user
    async fn delete_all(&self, recipient_id: i64) -> Result<u64>;

    /// Hide one notification if it belongs to the user
    async fn delete(&self, id: i64, recipient_id: i64) -> Result<bool>;

    async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences>;

    async fn save_preferences(&self, preferences: &NotificationPreferences) -> Result<()>;
}

pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, verb, description, resource_url, unread, emailed, deleted, created_at";

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), notification).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), notification).await,
        }
    }

    async fn list(&self, recipient_id: i64, unread_only: bool) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE recipient_id = ? AND deleted = FALSE {} ORDER BY created_at DESC, id DESC",
            NOTIFICATION_COLUMNS,
            if unread_only { "AND unread = TRUE" } else { "" }
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), &sql, recipient_id).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), &sql, recipient_id).await,
        }
    }

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        let sql = "UPDATE notifications SET unread = FALSE WHERE recipient_id = ? AND unread = TRUE AND deleted = FALSE";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(recipient_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to mark notifications read")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(recipient_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to mark notifications read")?
                .rows_affected(),
        };
        Ok(affected)
    }

    async fn mark_emailed(&self, id: i64) -> Result<()> {
        let sql = "UPDATE notifications SET emailed = TRUE WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to mark notification emailed")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to mark notification emailed")?;
            }
        }
        Ok(())
    }

    async fn delete_all(&self, recipient_id: i64) -> Result<u64> {
        let sql = "UPDATE notifications SET deleted = TRUE WHERE recipient_id = ? AND deleted = FALSE";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(recipient_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete notifications")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(recipient_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete notifications")?
                .rows_affected(),
        };
        Ok(affected)
    }

    async fn delete(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let sql = "UPDATE notifications SET deleted = TRUE WHERE id = ? AND recipient_id = ? AND deleted = FALSE";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .bind(recipient_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete notification")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .bind(recipient_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete notification")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences> {
        let sql = "SELECT email_notifications, in_app_notifications FROM notification_preferences WHERE user_id = ?";
        let flags: Option<(bool, bool)> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get notification preferences")?
                .map(|r| (r.get("email_notifications"), r.get("in_app_notifications"))),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get notification preferences")?
                .map(|r| (r.get("email_notifications"), r.get("in_app_notifications"))),
        };

        Ok(match flags {
            Some((email_notifications, in_app_notifications)) => NotificationPreferences {
                user_id,
                email_notifications,
                in_app_notifications,
            },
            None => NotificationPreferences::defaults(user_id),
        })
    }

    async fn save_preferences(&self, preferences: &NotificationPreferences) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    r#"
                    INSERT INTO notification_preferences (user_id, email_notifications, in_app_notifications, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (user_id) DO UPDATE SET
                        email_notifications = excluded.email_notifications,
                        in_app_notifications = excluded.in_app_notifications,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(preferences.user_id)
                .bind(preferences.email_notifications)
                .bind(preferences.in_app_notifications)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to save notification preferences")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    r#"
                    INSERT INTO notification_preferences (user_id, email_notifications, in_app_notifications, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE
                        email_notifications = VALUES(email_notifications),
                        in_app_notifications = VALUES(in_app_notifications),
                        updated_at = VALUES(updated_at)
                    "#,
                )
                .bind(preferences.user_id)
                .bind(preferences.email_notifications)
                .bind(preferences.in_app_notifications)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to save notification preferences")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, new: &NewNotification) -> Result<Notification> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, verb, description, resource_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.recipient_id)
    .bind(new.actor_id)
    .bind(&new.verb)
    .bind(&new.description)
    .bind(&new.resource_url)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create notification")?;

    Ok(fresh(result.last_insert_rowid(), new, now))
}

async fn list_sqlite(pool: &SqlitePool, sql: &str, recipient_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query(sql)
        .bind(recipient_id)
        .fetch_all(pool)
        .await
        .context("Failed to list notifications")?;

    Ok(rows
        .iter()
        .map(|r| Notification {
            id: r.get("id"),
            recipient_id: r.get("recipient_id"),
            actor_id: r.get("actor_id"),
            verb: r.get("verb"),
            description: r.get("description"),
            resource_url: r.get("resource_url"),
            unread: r.get("unread"),
            emailed: r.get("emailed"),
            deleted: r.get("deleted"),
            created_at: r.get("created_at"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, new: &NewNotification) -> Result<Notification> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, verb, description, resource_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.recipient_id)
    .bind(new.actor_id)
    .bind(&new.verb)
    .bind(&new.description)
    .bind(&new.resource_url)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create notification")?;

    Ok(fresh(result.last_insert_id() as i64, new, now))
}

async fn list_mysql(pool: &MySqlPool, sql: &str, recipient_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query(sql)
        .bind(recipient_id)
        .fetch_all(pool)
        .await
        .context("Failed to list notifications")?;

    Ok(rows
        .iter()
        .map(|r| Notification {
            id: r.get("id"),
            recipient_id: r.get("recipient_id"),
            actor_id: r.get("actor_id"),
            verb: r.get("verb"),
            description: r.get("description"),
            resource_url: r.get("resource_url"),
            unread: r.get("unread"),
            emailed: r.get("emailed"),
            deleted: r.get("deleted"),
            created_at: r.get("created_at"),
        })
        .collect())
}

fn fresh(id: i64, new: &NewNotification, now: chrono::DateTime<Utc>) -> Notification {
    Notification {
        id,
        recipient_id: new.recipient_id,
        actor_id: new.actor_id,
        verb: new.verb.clone(),
        description: new.description.clone(),
        resource_url: new.resource_url.clone(),
        unread: true,
        emailed: false,
        deleted: false,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};

    fn note(recipient_id: i64, description: &str) -> NewNotification {
        NewNotification {
            recipient_id,
            actor_id: None,
            verb: "article".to_string(),
            description: description.to_string(),
            resource_url: None,
        }
    }

    #[tokio::test]
    async fn test_list_and_mark_read() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let repo = SqlxNotificationRepository::new(pool);

        repo.create(&note(ada.id, "one")).await.unwrap();
        repo.create(&note(ada.id, "two")).await.unwrap();

        assert_eq!(repo.list(ada.id, true).await.unwrap().len(), 2);
        assert_eq!(repo.mark_all_read(ada.id).await.unwrap(), 2);
        assert!(repo.list(ada.id, true).await.unwrap().is_empty());

        let all = repo.list(ada.id, false).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|n| !n.unread));
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let repo = SqlxNotificationRepository::new(pool);

        let first = repo.create(&note(ada.id, "one")).await.unwrap();
        repo.create(&note(ada.id, "two")).await.unwrap();

        assert!(!repo.delete(first.id, bob.id).await.unwrap());
        assert!(repo.delete(first.id, ada.id).await.unwrap());
        assert!(!repo.delete(first.id, ada.id).await.unwrap());
        assert_eq!(repo.list(ada.id, false).await.unwrap().len(), 1);

        assert_eq!(repo.delete_all(ada.id).await.unwrap(), 1);
        assert_eq!(repo.delete_all(ada.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_preferences_default_and_save() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let repo = SqlxNotificationRepository::new(pool);

        let prefs = repo.get_preferences(ada.id).await.unwrap();
        assert_eq!(prefs, NotificationPreferences::defaults(ada.id));

        let changed = NotificationPreferences {
            email_notifications: false,
            ..prefs
        };
        repo.save_preferences(&changed).await.unwrap();
        repo.save_preferences(&changed).await.unwrap();
        assert_eq!(repo.get_preferences(ada.id).await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_mark_emailed() {
        let pool = setup_pool().await;
        let ada = insert_user(&pool, "ada").await;
        let repo = SqlxNotificationRepository::new(pool);

        let created = repo.create(&note(ada.id, "one")).await.unwrap();
        repo.mark_emailed(created.id).await.unwrap();
        assert!(repo.list(ada.id, false).await.unwrap()[0].emailed);
    }
}
