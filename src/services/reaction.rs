//! Reader reactions on articles: votes, favorites, bookmarks and ratings

use crate::db::repositories::{
    BookmarkRepository, FavoriteRepository, RatingRepository, VoteRepository, VoteTarget,
};
use crate::models::{Bookmark, BookmarkedArticle, User, VoteKind, MAX_RATING, MIN_RATING};
use crate::services::article::{ArticleService, ArticleServiceError};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

const INVALID_RATING: &str = "Rating should be an integer between 1 and 5";
const BOOKMARK_NOT_FOUND: &str = "Bookmark not found";

#[derive(Debug, thiserror::Error)]
pub enum ReactionServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    /// The reaction already exists
    #[error("{0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for ReactionServiceError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(msg) => ReactionServiceError::NotFound(msg),
            ArticleServiceError::Forbidden(msg) => ReactionServiceError::Forbidden(msg),
            ArticleServiceError::ValidationError(msg) => ReactionServiceError::ValidationError(msg),
            ArticleServiceError::InvalidPage => {
                ReactionServiceError::NotFound(ArticleServiceError::InvalidPage.to_string())
            }
            ArticleServiceError::InternalError(e) => ReactionServiceError::InternalError(e),
        }
    }
}

/// Result of rating an article
#[derive(Debug, Clone, Serialize)]
pub struct RatingSummary {
    /// Slug of the rated article
    pub article: String,
    pub rating: i32,
    pub average_rating: f64,
}

pub struct ReactionService {
    articles: Arc<ArticleService>,
    vote_repo: Arc<dyn VoteRepository>,
    favorite_repo: Arc<dyn FavoriteRepository>,
    bookmark_repo: Arc<dyn BookmarkRepository>,
    rating_repo: Arc<dyn RatingRepository>,
}

impl ReactionService {
    pub fn new(
        articles: Arc<ArticleService>,
        vote_repo: Arc<dyn VoteRepository>,
        favorite_repo: Arc<dyn FavoriteRepository>,
        bookmark_repo: Arc<dyn BookmarkRepository>,
        rating_repo: Arc<dyn RatingRepository>,
    ) -> Self {
        Self {
            articles,
            vote_repo,
            favorite_repo,
            bookmark_repo,
            rating_repo,
        }
    }

    // ========================================================================
    // Votes
    // ========================================================================

    /// Like or dislike an article. Voting again replaces the earlier vote.
    pub async fn vote(
        &self,
        user: &User,
        slug: &str,
        verb: &str,
    ) -> Result<&'static str, ReactionServiceError> {
        let kind = parse_verb(verb)?;
        let article = self.articles.find(slug).await?;

        self.vote_repo
            .set(VoteTarget::Article, user.id, article.id, kind)
            .await
            .context("Failed to record vote")?;
        self.articles.invalidate(&article.slug).await;

        Ok(match kind {
            VoteKind::Like => "Like posted successfully",
            VoteKind::Dislike => "Dislike posted successfully",
        })
    }

    /// Withdraw a vote of the given kind
    pub async fn unvote(
        &self,
        user: &User,
        slug: &str,
        verb: &str,
    ) -> Result<&'static str, ReactionServiceError> {
        let kind = parse_verb(verb)?;
        let article = self.articles.find(slug).await?;

        let current = self
            .vote_repo
            .get(VoteTarget::Article, user.id, article.id)
            .await
            .context("Failed to load vote")?;
        if current != Some(kind) {
            return Err(ReactionServiceError::NotFound(
                match kind {
                    VoteKind::Like => "You have not liked this article",
                    VoteKind::Dislike => "You have not disliked this article",
                }
                .to_string(),
            ));
        }

        self.vote_repo
            .delete(VoteTarget::Article, user.id, article.id)
            .await
            .context("Failed to delete vote")?;
        self.articles.invalidate(&article.slug).await;
        Ok("Vote delete successfully")
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    pub async fn favorite(&self, user: &User, slug: &str) -> Result<(), ReactionServiceError> {
        let article = self.articles.find(slug).await?;
        let added = self
            .favorite_repo
            .add(user.id, article.id)
            .await
            .context("Failed to add favorite")?;
        if !added {
            return Err(ReactionServiceError::Duplicate(
                "Already favorited this article".to_string(),
            ));
        }
        self.articles.invalidate(&article.slug).await;
        Ok(())
    }

    pub async fn unfavorite(&self, user: &User, slug: &str) -> Result<(), ReactionServiceError> {
        let article = self.articles.find(slug).await?;
        let removed = self
            .favorite_repo
            .remove(user.id, article.id)
            .await
            .context("Failed to remove favorite")?;
        if !removed {
            return Err(ReactionServiceError::NotFound(
                "You have not favorited this article".to_string(),
            ));
        }
        self.articles.invalidate(&article.slug).await;
        Ok(())
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    pub async fn bookmark(&self, user: &User, slug: &str) -> Result<Bookmark, ReactionServiceError> {
        let article = self.articles.find(slug).await?;
        self.bookmark_repo
            .create(user.id, article.id)
            .await
            .context("Failed to create bookmark")?
            .ok_or_else(|| ReactionServiceError::Duplicate("Article already bookmarked".to_string()))
    }

    pub async fn bookmarks(&self, user: &User) -> Result<Vec<BookmarkedArticle>, ReactionServiceError> {
        let bookmarks = self
            .bookmark_repo
            .list_for_user(user.id)
            .await
            .context("Failed to list bookmarks")?;
        if bookmarks.is_empty() {
            return Err(ReactionServiceError::NotFound("Bookmarks not found".to_string()));
        }
        Ok(bookmarks)
    }

    /// Remove one of the caller's bookmarks. Someone else's bookmark looks missing.
    pub async fn remove_bookmark(&self, user: &User, id: i64) -> Result<(), ReactionServiceError> {
        let bookmark = self
            .bookmark_repo
            .get(id)
            .await
            .context("Failed to get bookmark")?
            .filter(|b| b.user_id == user.id)
            .ok_or_else(|| ReactionServiceError::NotFound(BOOKMARK_NOT_FOUND.to_string()))?;

        let deleted = self
            .bookmark_repo
            .delete(bookmark.id)
            .await
            .context("Failed to delete bookmark")?;
        if !deleted {
            return Err(ReactionServiceError::NotFound(BOOKMARK_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Ratings
    // ========================================================================

    /// Rate someone else's article; rating again replaces the score
    pub async fn rate(
        &self,
        user: &User,
        slug: &str,
        score: i32,
    ) -> Result<RatingSummary, ReactionServiceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&score) {
            return Err(ReactionServiceError::ValidationError(INVALID_RATING.to_string()));
        }
        let article = self.articles.find(slug).await?;
        if user.owns(article.author_id) {
            return Err(ReactionServiceError::Forbidden(
                "You can't rate your own article".to_string(),
            ));
        }

        let rating = self
            .rating_repo
            .upsert(user.id, article.id, score)
            .await
            .context("Failed to save rating")?;
        let average = self
            .rating_repo
            .average(article.id)
            .await
            .context("Failed to average ratings")?
            .unwrap_or(f64::from(rating.score));
        self.articles.invalidate(&article.slug).await;

        Ok(RatingSummary {
            article: article.slug,
            rating: rating.score,
            average_rating: crate::models::round_rating(average),
        })
    }
}

fn parse_verb(verb: &str) -> Result<VoteKind, ReactionServiceError> {
    verb.parse::<VoteKind>().map_err(|_| {
        ReactionServiceError::NotFound("Vote verb specified does not exist".to_string())
    })
}

/// Read a rating from request JSON. Integers and integer strings are accepted.
pub fn parse_rating(value: &serde_json::Value) -> Result<i32, ReactionServiceError> {
    let invalid = || ReactionServiceError::ValidationError(INVALID_RATING.to_string());
    let score = match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
        serde_json::Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    i32::try_from(score).map_err(|_| invalid())
}
