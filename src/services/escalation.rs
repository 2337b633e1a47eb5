//! Escalation service
//!
//! Readers report articles; admins review the reports and may delete the
//! reported article.

use crate::db::repositories::EscalationRepository;
use crate::models::{Escalation, EscalationReason, EscalationReport, User, MAX_ESCALATION_DESCRIPTION};
use crate::services::article::{ArticleService, ArticleServiceError};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EscalationServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for EscalationServiceError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::InternalError(e) => EscalationServiceError::InternalError(e),
            other => EscalationServiceError::NotFound(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscalateInput {
    pub reason: String,
    #[serde(default)]
    pub description: String,
}

/// What a report did
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Created(Escalation),
    /// An earlier report with the same reason got a new description
    Updated(Escalation),
}

pub struct EscalationService {
    articles: Arc<ArticleService>,
    repo: Arc<dyn EscalationRepository>,
}

impl EscalationService {
    pub fn new(articles: Arc<ArticleService>, repo: Arc<dyn EscalationRepository>) -> Self {
        Self { articles, repo }
    }

    /// Report someone else's article
    pub async fn report(
        &self,
        reporter: &User,
        slug: &str,
        input: EscalateInput,
    ) -> Result<ReportOutcome, EscalationServiceError> {
        let reason: EscalationReason = input.reason.parse().map_err(|_| {
            let choices: Vec<&str> = EscalationReason::ALL.iter().map(|r| r.as_str()).collect();
            EscalationServiceError::ValidationError(format!(
                "\"{}\" is not a valid choice. Choose one of: {}",
                input.reason,
                choices.join(", ")
            ))
        })?;
        let description = input.description.trim().to_string();
        if description.chars().count() > MAX_ESCALATION_DESCRIPTION {
            return Err(EscalationServiceError::ValidationError(format!(
                "Ensure description has no more than {} characters",
                MAX_ESCALATION_DESCRIPTION
            )));
        }

        let article = self.articles.find(slug).await?;
        if reporter.owns(article.author_id) {
            return Err(EscalationServiceError::Forbidden(
                "You can't report your article.".to_string(),
            ));
        }

        let existing = self
            .repo
            .find(reporter.id, article.id, reason)
            .await
            .context("Failed to look up escalation")?;

        match existing {
            Some(escalation) if escalation.description == description => {
                Err(EscalationServiceError::ValidationError(
                    "You are not allowed to report twice".to_string(),
                ))
            }
            Some(mut escalation) => {
                self.repo
                    .update_description(escalation.id, &description)
                    .await
                    .context("Failed to update escalation")?;
                escalation.description = description;
                Ok(ReportOutcome::Updated(escalation))
            }
            None => {
                let escalation = self
                    .repo
                    .create(reporter.id, article.id, reason, &description)
                    .await
                    .context("Failed to create escalation")?;
                tracing::info!(
                    "{} reported '{}' for {}",
                    reporter.username,
                    article.slug,
                    reason
                );
                Ok(ReportOutcome::Created(escalation))
            }
        }
    }

    /// Admin removal of a reported article
    pub async fn delete_reported(&self, caller: &User, slug: &str) -> Result<(), EscalationServiceError> {
        if !caller.is_admin() {
            return Err(EscalationServiceError::Forbidden(
                "Only Admins can delete a reported article".to_string(),
            ));
        }
        let article = self.articles.find(slug).await?;
        let reported = self
            .repo
            .is_reported(article.id)
            .await
            .context("Failed to check escalation")?;
        if !reported {
            return Err(EscalationServiceError::NotFound(
                "This article has not been reported".to_string(),
            ));
        }
        self.articles.remove(&article).await?;
        tracing::info!("Admin {} removed reported article '{}'", caller.username, slug);
        Ok(())
    }

    /// Every report, newest first
    pub async fn reports(&self, caller: &User) -> Result<Vec<EscalationReport>, EscalationServiceError> {
        if !caller.is_admin() {
            return Err(EscalationServiceError::Forbidden(
                "Only Admins can view escalated articles".to_string(),
            ));
        }
        Ok(self
            .repo
            .list_reports()
            .await
            .context("Failed to list escalations")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, setup_pool};
    use crate::db::repositories::SqlxEscalationRepository;
    use crate::db::DynDatabasePool;
    use crate::models::UserRole;
    use crate::services::test_support::{article_service, notification_service};

    async fn setup_test_service() -> (DynDatabasePool, EscalationService) {
        let pool = setup_pool().await;
        let articles = article_service(&pool, notification_service(&pool)).await;
        let service = EscalationService::new(articles, SqlxEscalationRepository::boxed(pool.clone()));
        (pool, service)
    }

    fn input(reason: &str, description: &str) -> EscalateInput {
        EscalateInput {
            reason: reason.to_string(),
            description: description.to_string(),
        }
    }

    fn admin(mut user: User) -> User {
        user.role = UserRole::Admin;
        user
    }

    #[tokio::test]
    async fn test_report_lifecycle() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        insert_article(&pool, ada.id, "copied").await;

        let err = service.report(&ada, "copied", input("Spam", "")).await.unwrap_err();
        assert_eq!(err.to_string(), "You can't report your article.");

        let outcome = service
            .report(&bob, "copied", input("Plagiarism", "Lifted from my blog"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReportOutcome::Created(_)));

        let err = service
            .report(&bob, "copied", input("Plagiarism", "Lifted from my blog"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You are not allowed to report twice");

        let outcome = service
            .report(&bob, "copied", input("Plagiarism", "Second paragraph too"))
            .await
            .unwrap();
        match outcome {
            ReportOutcome::Updated(e) => assert_eq!(e.description, "Second paragraph too"),
            other => panic!("expected update, got {:?}", other),
        }

        // a different reason is a separate report
        let outcome = service
            .report(&bob, "copied", input("Rule Violation", "Lifted from my blog"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReportOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_report_validation() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        insert_article(&pool, ada.id, "post").await;

        let err = service.report(&bob, "post", input("Rude", "")).await.unwrap_err();
        assert!(matches!(err, EscalationServiceError::ValidationError(_)));

        let long = "x".repeat(MAX_ESCALATION_DESCRIPTION + 1);
        let err = service.report(&bob, "post", input("Spam", &long)).await.unwrap_err();
        assert!(matches!(err, EscalationServiceError::ValidationError(_)));

        let err = service.report(&bob, "missing", input("Spam", "")).await.unwrap_err();
        assert!(matches!(err, EscalationServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_review() {
        let (pool, service) = setup_test_service().await;
        let ada = insert_user(&pool, "ada").await;
        let bob = insert_user(&pool, "bob").await;
        let root = admin(insert_user(&pool, "root").await);
        insert_article(&pool, ada.id, "bad").await;
        insert_article(&pool, ada.id, "fine").await;

        service.report(&bob, "bad", input("Spam", "Ads")).await.unwrap();

        let err = service.reports(&bob).await.unwrap_err();
        assert_eq!(err.to_string(), "Only Admins can view escalated articles");
        let reports = service.reports(&root).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reporter, "bob");
        assert_eq!(reports[0].article.slug, "bad");

        let err = service.delete_reported(&bob, "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Only Admins can delete a reported article");
        assert!(matches!(
            service.delete_reported(&root, "fine").await,
            Err(EscalationServiceError::NotFound(_))
        ));

        service.delete_reported(&root, "bad").await.unwrap();
        assert!(service.reports(&root).await.unwrap().is_empty());
    }
}
