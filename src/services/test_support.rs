//! Service wiring shared by the service tests

use super::article::{ArticleRepos, ArticleService};
use super::email::Mailer;
use super::notification::NotificationService;
use super::token::TokenSigner;
use crate::cache::create_cache;
use crate::config::{CacheConfig, EmailConfig};
use crate::db::repositories::*;
use crate::db::DynDatabasePool;
use std::sync::Arc;

pub const SITE_URL: &str = "http://localhost:8080";

/// Notification service with mail disabled
pub fn notification_service(pool: &DynDatabasePool) -> Arc<NotificationService> {
    Arc::new(NotificationService::new(
        SqlxNotificationRepository::boxed(pool.clone()),
        SqlxUserRepository::boxed(pool.clone()),
        SqlxProfileRepository::boxed(pool.clone()),
        SqlxFavoriteRepository::boxed(pool.clone()),
        TokenSigner::new("test-secret", chrono::Duration::hours(1)),
        Mailer::new(EmailConfig::default(), SITE_URL),
    ))
}

/// Article service over a fresh memory cache
pub async fn article_service(
    pool: &DynDatabasePool,
    notifications: Arc<NotificationService>,
) -> Arc<ArticleService> {
    let cache = create_cache(&CacheConfig::default())
        .await
        .expect("Failed to create cache");
    Arc::new(ArticleService::new(
        ArticleRepos {
            articles: SqlxArticleRepository::boxed(pool.clone()),
            tags: SqlxTagRepository::boxed(pool.clone()),
            users: SqlxUserRepository::boxed(pool.clone()),
            profiles: SqlxProfileRepository::boxed(pool.clone()),
            votes: SqlxVoteRepository::boxed(pool.clone()),
            favorites: SqlxFavoriteRepository::boxed(pool.clone()),
            ratings: SqlxRatingRepository::boxed(pool.clone()),
        },
        cache,
        notifications,
        SITE_URL,
    ))
}
