//! Highlight service
//!
//! Readers mark a span of an article's title, description or body. Spans
//! are inclusive character offsets into the field's current text.

use crate::db::repositories::HighlightRepository;
use crate::models::{Article, Highlight, HighlightField, NewHighlight, User};
use crate::services::article::{ArticleService, ArticleServiceError};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

const INVALID_FIELD: &str = "Field must be; title, body or description";
const NOT_YOURS: &str = "You cannot delete or update highlight that is not yours";
const HIGHLIGHT_NOT_FOUND: &str = "Highlight removed or does not exist";
const ALREADY_HIGHLIGHTED: &str = "You have already highlighted this section";
const MISSING_INDEX: &str = "Start index and end index are required";

#[derive(Debug, thiserror::Error)]
pub enum HighlightServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for HighlightServiceError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::InternalError(e) => HighlightServiceError::InternalError(e),
            other => HighlightServiceError::NotFound(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HighlightInput {
    pub field: String,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHighlightInput {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start_index: Option<i64>,
    #[serde(default)]
    pub end_index: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Check a span against `text` and return the covered characters.
///
/// `end` may point one past the last character; the slice is clamped.
pub fn validate_span(text: &str, start: i64, end: i64) -> Result<String, HighlightServiceError> {
    if start < 0 || end < 0 {
        return Err(HighlightServiceError::ValidationError(
            "Start index or end index cannot be a negative number".to_string(),
        ));
    }
    if start > end {
        return Err(HighlightServiceError::ValidationError(
            "Start index cannot be greater than End index".to_string(),
        ));
    }
    let len = text.chars().count() as i64;
    if end > len {
        return Err(HighlightServiceError::ValidationError(
            "start or end index cannot be greater than field length".to_string(),
        ));
    }
    Ok(text
        .chars()
        .skip(start as usize)
        .take((end - start + 1) as usize)
        .collect())
}

fn field_text(article: &Article, field: HighlightField) -> &str {
    match field {
        HighlightField::Title => &article.title,
        HighlightField::Description => &article.description,
        HighlightField::Body => &article.body,
    }
}

pub struct HighlightService {
    articles: Arc<ArticleService>,
    repo: Arc<dyn HighlightRepository>,
}

impl HighlightService {
    pub fn new(articles: Arc<ArticleService>, repo: Arc<dyn HighlightRepository>) -> Self {
        Self { articles, repo }
    }

    pub async fn create(
        &self,
        user: &User,
        slug: &str,
        input: HighlightInput,
    ) -> Result<Highlight, HighlightServiceError> {
        let field: HighlightField = input
            .field
            .parse()
            .map_err(|_| HighlightServiceError::NotFound(INVALID_FIELD.to_string()))?;
        let (start_index, end_index) = match (input.start_index, input.end_index) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(HighlightServiceError::ValidationError(MISSING_INDEX.to_string())),
        };
        let article = self.articles.find(slug).await?;
        let highlighted_text = validate_span(field_text(&article, field), start_index, end_index)?;

        if self
            .repo
            .span_exists(user.id, article.id, field, start_index, end_index)
            .await
            .context("Failed to check highlight")?
        {
            return Err(HighlightServiceError::ValidationError(
                ALREADY_HIGHLIGHTED.to_string(),
            ));
        }

        let highlight = self
            .repo
            .create(&NewHighlight {
                user_id: user.id,
                article_id: article.id,
                field,
                start_index,
                end_index,
                comment: input.comment.filter(|c| !c.trim().is_empty()),
                highlighted_text,
            })
            .await
            .context("Failed to create highlight")?;
        Ok(highlight)
    }

    /// The caller's highlights on an article
    pub async fn list(&self, user: &User, slug: &str) -> Result<Vec<Highlight>, HighlightServiceError> {
        let article = self.articles.find(slug).await?;
        Ok(self
            .repo
            .list(user.id, article.id)
            .await
            .context("Failed to list highlights")?)
    }

    /// One of the caller's highlights; other readers' highlights are not visible
    pub async fn get(&self, user: &User, slug: &str, id: i64) -> Result<Highlight, HighlightServiceError> {
        let article = self.articles.find(slug).await?;
        let highlight = self.find_in(&article, id).await?;
        if highlight.user_id != user.id {
            return Err(HighlightServiceError::NotFound(HIGHLIGHT_NOT_FOUND.to_string()));
        }
        Ok(highlight)
    }

    /// Move the span or change the note. Supplying a field at all is rejected.
    pub async fn update(
        &self,
        user: &User,
        slug: &str,
        id: i64,
        input: UpdateHighlightInput,
    ) -> Result<Highlight, HighlightServiceError> {
        let article = self.articles.find(slug).await?;
        let mut highlight = self.owned(&article, user, id).await?;

        if input.field.as_deref().is_some_and(|f| !f.is_empty()) {
            return Err(HighlightServiceError::ValidationError(
                "You cannot update the field".to_string(),
            ));
        }

        let start = input.start_index.unwrap_or(highlight.start_index);
        let end = input.end_index.unwrap_or(highlight.end_index);
        let text = validate_span(field_text(&article, highlight.field), start, end)?;

        let moved = start != highlight.start_index || end != highlight.end_index;
        if moved
            && self
                .repo
                .span_exists(user.id, article.id, highlight.field, start, end)
                .await
                .context("Failed to check highlight")?
        {
            return Err(HighlightServiceError::ValidationError(
                ALREADY_HIGHLIGHTED.to_string(),
            ));
        }

        highlight.start_index = start;
        highlight.end_index = end;
        highlight.highlighted_text = text;
        if let Some(comment) = input.comment {
            highlight.comment = Some(comment).filter(|c| !c.trim().is_empty());
        }

        Ok(self
            .repo
            .update(&highlight)
            .await
            .context("Failed to update highlight")?)
    }

    pub async fn delete(&self, user: &User, slug: &str, id: i64) -> Result<(), HighlightServiceError> {
        let article = self.articles.find(slug).await?;
        let highlight = self.owned(&article, user, id).await?;
        self.repo
            .delete(highlight.id)
            .await
            .context("Failed to delete highlight")?;
        Ok(())
    }

    async fn find_in(&self, article: &Article, id: i64) -> Result<Highlight, HighlightServiceError> {
        self.repo
            .get(id)
            .await
            .context("Failed to get highlight")?
            .filter(|h| h.article_id == article.id)
            .ok_or_else(|| HighlightServiceError::NotFound(HIGHLIGHT_NOT_FOUND.to_string()))
    }

    async fn owned(&self, article: &Article, user: &User, id: i64) -> Result<Highlight, HighlightServiceError> {
        let highlight = self.find_in(article, id).await?;
        if highlight.user_id != user.id {
            return Err(HighlightServiceError::ValidationError(NOT_YOURS.to_string()));
        }
        Ok(highlight)
    }
}
