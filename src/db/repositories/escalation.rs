//! Escalation repository
//!
//! Reports of articles by readers. A reporter holds at most one report per
//! article and reason.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Escalation, EscalationReason, EscalationReport, ReportedArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait EscalationRepository: Send + Sync {
    /// The reporter's existing report for this reason
    async fn find(
        &self,
        reporter_id: i64,
        article_id: i64,
        reason: EscalationReason,
    ) -> Result<Option<Escalation>>;

    async fn create(
        &self,
        reporter_id: i64,
        article_id: i64,
        reason: EscalationReason,
        description: &str,
    ) -> Result<Escalation>;

    async fn update_description(&self, id: i64, description: &str) -> Result<()>;

    /// Whether anyone reported the article
    async fn is_reported(&self, article_id: i64) -> Result<bool>;

    /// Every report with reporter and article, newest first
    async fn list_reports(&self) -> Result<Vec<EscalationReport>>;
}

pub struct SqlxEscalationRepository {
    pool: DynDatabasePool,
}

impl SqlxEscalationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EscalationRepository> {
        Arc::new(Self::new(pool))
    }
}

const REPORTS_SQL: &str = r#"
    SELECT e.id, e.reason, e.description, u.username, a.slug, a.title
    FROM escalations e
    JOIN users u ON u.id = e.reporter_id
    JOIN articles a ON a.id = e.article_id
    ORDER BY e.created_at DESC, e.id DESC
"#;

#[async_trait]
impl EscalationRepository for SqlxEscalationRepository {
    async fn find(
        &self,
        reporter_id: i64,
        article_id: i64,
        reason: EscalationReason,
    ) -> Result<Option<Escalation>> {
        let sql = r#"
            SELECT id, reporter_id, article_id, reason, description, created_at
            FROM escalations WHERE reporter_id = ? AND article_id = ? AND reason = ?
        "#;
        let found = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(reporter_id)
                .bind(article_id)
                .bind(reason.as_str())
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to find escalation")?
                .map(|r| Escalation {
                    id: r.get("id"),
                    reporter_id: r.get("reporter_id"),
                    article_id: r.get("article_id"),
                    reason,
                    description: r.get("description"),
                    created_at: r.get("created_at"),
                }),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(reporter_id)
                .bind(article_id)
                .bind(reason.as_str())
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to find escalation")?
                .map(|r| Escalation {
                    id: r.get("id"),
                    reporter_id: r.get("reporter_id"),
                    article_id: r.get("article_id"),
                    reason,
                    description: r.get("description"),
                    created_at: r.get("created_at"),
                }),
        };
        Ok(found)
    }

    async fn create(
        &self,
        reporter_id: i64,
        article_id: i64,
        reason: EscalationReason,
        description: &str,
    ) -> Result<Escalation> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO escalations (reporter_id, article_id, reason, description, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(reporter_id)
                .bind(article_id)
                .bind(reason.as_str())
                .bind(description)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to create escalation")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(reporter_id)
                .bind(article_id)
                .bind(reason.as_str())
                .bind(description)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to create escalation")?
                .last_insert_id() as i64,
        };
        Ok(Escalation {
            id,
            reporter_id,
            article_id,
            reason,
            description: description.to_string(),
            created_at: now,
        })
    }

    async fn update_description(&self, id: i64, description: &str) -> Result<()> {
        let sql = "UPDATE escalations SET description = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(description)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update escalation")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(description)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update escalation")?;
            }
        }
        Ok(())
    }

    async fn is_reported(&self, article_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM escalations WHERE article_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check escalations")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check escalations")?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn list_reports(&self) -> Result<Vec<EscalationReport>> {
        let rows: Vec<(i64, String, String, String, String, String)> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(REPORTS_SQL)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list escalations")?
                .iter()
                .map(|r| {
                    (
                        r.get("id"),
                        r.get("reason"),
                        r.get("description"),
                        r.get("username"),
                        r.get("slug"),
                        r.get("title"),
                    )
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(REPORTS_SQL)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list escalations")?
                .iter()
                .map(|r| {
                    (
                        r.get("id"),
                        r.get("reason"),
                        r.get("description"),
                        r.get("username"),
                        r.get("slug"),
                        r.get("title"),
                    )
                })
                .collect(),
        };

        rows.into_iter()
            .map(|(id, reason, description, reporter, slug, title)| {
                Ok(EscalationReport {
                    id,
                    reason: EscalationReason::from_str(&reason)?,
                    description,
                    reporter,
                    article: ReportedArticle { slug, title },
                })
            })
            .collect()
    }
}
