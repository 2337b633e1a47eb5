//! Notification service
//!
//! Fans events out to interested readers and serves the in-app inbox.
//! New articles go to the author's followers; new comments go to everyone
//! who favorited the article. Delivery honours each recipient's
//! preferences and never fails the request that triggered it.

use crate::db::repositories::{
    FavoriteRepository, NotificationRepository, ProfileRepository, UserRepository,
};
use crate::models::{
    Article, Comment, NewNotification, Notification, NotificationPreferences,
    UpdatePreferencesInput, User,
};
use crate::services::email::Mailer;
use crate::services::token::{TokenPurpose, TokenSigner};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

pub const VERB_ARTICLE: &str = "article";
pub const VERB_COMMENT: &str = "comment";

/// Recipients served at once during fan-out
const FAN_OUT_CONCURRENCY: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum NotificationServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    favorite_repo: Arc<dyn FavoriteRepository>,
    tokens: TokenSigner,
    mailer: Mailer,
}

impl NotificationService {
    pub fn new(
        notification_repo: Arc<dyn NotificationRepository>,
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        favorite_repo: Arc<dyn FavoriteRepository>,
        tokens: TokenSigner,
        mailer: Mailer,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            profile_repo,
            favorite_repo,
            tokens,
            mailer,
        }
    }

    // ========================================================================
    // Fan-out
    // ========================================================================

    /// Tell the author's followers about a new article
    pub async fn article_published(&self, author: &User, article: &Article) {
        let followers = match self.profile_repo.follower_ids(author.id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Failed to load followers of {}: {}", author.username, e);
                return;
            }
        };

        let description = format!(
            "{} posted an article '{}' on {}",
            author.username,
            article.title.to_uppercase(),
            format_date(article.created_at)
        );
        self.fan_out(followers, author.id, VERB_ARTICLE, description, article)
            .await;
    }

    /// Tell readers who favorited the article about a new comment
    pub async fn comment_posted(&self, commenter: &User, article: &Article, comment: &Comment) {
        let recipients = match self.favorite_repo.user_ids(article.id).await {
            Ok(ids) => ids.into_iter().filter(|id| *id != commenter.id).collect(),
            Err(e) => {
                tracing::warn!("Failed to load favorites of {}: {}", article.slug, e);
                return;
            }
        };

        let description = format!(
            "{} posted a comment to {} on {}",
            commenter.username,
            article.title,
            format_date(comment.created_at)
        );
        self.fan_out(recipients, commenter.id, VERB_COMMENT, description, article)
            .await;
    }

    async fn fan_out(
        &self,
        recipients: Vec<i64>,
        actor_id: i64,
        verb: &str,
        description: String,
        article: &Article,
    ) {
        let resource_url = self.mailer.api_link(&format!("articles/{}", article.slug));
        let resource_url = resource_url.as_str();
        let description = description.as_str();
        stream::iter(recipients)
            .for_each_concurrent(FAN_OUT_CONCURRENCY, |recipient_id| async move {
                let notification = NewNotification {
                    recipient_id,
                    actor_id: Some(actor_id),
                    verb: verb.to_string(),
                    description: description.to_string(),
                    resource_url: Some(resource_url.to_string()),
                };
                if let Err(e) = self.deliver(&notification).await {
                    tracing::warn!("Failed to notify user {}: {}", recipient_id, e);
                }
            })
            .await;
    }

    /// Store and mail one notification according to the recipient's preferences
    async fn deliver(&self, notification: &NewNotification) -> Result<()> {
        let prefs = self
            .notification_repo
            .get_preferences(notification.recipient_id)
            .await
            .context("Failed to load preferences")?;

        let stored = if prefs.in_app_notifications {
            Some(
                self.notification_repo
                    .create(notification)
                    .await
                    .context("Failed to store notification")?,
            )
        } else {
            None
        };

        if !prefs.email_notifications {
            return Ok(());
        }

        let Some(recipient) = self
            .user_repo
            .get_by_id(notification.recipient_id)
            .await
            .context("Failed to load recipient")?
        else {
            return Ok(());
        };

        let token = self.tokens.sign(TokenPurpose::Unsubscribe, recipient.id);
        let sent = self
            .mailer
            .send_notification(
                &recipient.email,
                &notification.description,
                notification.resource_url.as_deref(),
                &token,
            )
            .await?;

        if let (true, Some(stored)) = (sent, stored) {
            self.notification_repo
                .mark_emailed(stored.id)
                .await
                .context("Failed to mark notification emailed")?;
        }
        Ok(())
    }

    // ========================================================================
    // Inbox
    // ========================================================================

    /// All live notifications of `user`; they are marked read afterwards
    pub async fn list_all(&self, user: &User) -> Result<Vec<Notification>, NotificationServiceError> {
        let notifications = self
            .notification_repo
            .list(user.id, false)
            .await
            .context("Failed to list notifications")?;
        self.notification_repo
            .mark_all_read(user.id)
            .await
            .context("Failed to mark notifications read")?;
        Ok(notifications)
    }

    pub async fn list_unread(
        &self,
        user: &User,
    ) -> Result<Vec<Notification>, NotificationServiceError> {
        let notifications = self
            .notification_repo
            .list(user.id, true)
            .await
            .context("Failed to list notifications")?;
        Ok(notifications)
    }

    pub async fn delete_all(&self, user: &User) -> Result<u64, NotificationServiceError> {
        let deleted = self
            .notification_repo
            .delete_all(user.id)
            .await
            .context("Failed to delete notifications")?;
        if deleted == 0 {
            return Err(NotificationServiceError::NotFound(
                "No notifications found".to_string(),
            ));
        }
        Ok(deleted)
    }

    pub async fn delete(&self, user: &User, id: i64) -> Result<(), NotificationServiceError> {
        let deleted = self
            .notification_repo
            .delete(id, user.id)
            .await
            .context("Failed to delete notification")?;
        if !deleted {
            return Err(NotificationServiceError::NotFound(
                "Notification not found".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    pub async fn preferences(
        &self,
        user: &User,
    ) -> Result<NotificationPreferences, NotificationServiceError> {
        let prefs = self
            .notification_repo
            .get_preferences(user.id)
            .await
            .context("Failed to load preferences")?;
        Ok(prefs)
    }

    pub async fn update_preferences(
        &self,
        user: &User,
        input: UpdatePreferencesInput,
    ) -> Result<NotificationPreferences, NotificationServiceError> {
        let mut prefs = self.preferences(user).await?;
        if let Some(email) = input.email_notifications {
            prefs.email_notifications = email;
        }
        if let Some(in_app) = input.in_app_notifications {
            prefs.in_app_notifications = in_app;
        }
        self.notification_repo
            .save_preferences(&prefs)
            .await
            .context("Failed to save preferences")?;
        Ok(prefs)
    }

    /// Turn email notifications off from a mailed unsubscribe link
    pub async fn unsubscribe_email(&self, token: &str) -> Result<(), NotificationServiceError> {
        let user_id = self
            .tokens
            .verify(TokenPurpose::Unsubscribe, token)
            .ok_or(NotificationServiceError::InvalidToken)?;

        let mut prefs = self
            .notification_repo
            .get_preferences(user_id)
            .await
            .context("Failed to load preferences")?;
        prefs.email_notifications = false;
        self.notification_repo
            .save_preferences(&prefs)
            .await
            .context("Failed to save preferences")?;
        Ok(())
    }
}

/// Inbox summary line
pub fn inbox_message(count: usize) -> String {
    if count == 0 {
        "You have no new notifications".to_string()
    } else {
        format!("You have {} notification(s)", count)
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d-%B-%Y %H:%M").to_string()
}
