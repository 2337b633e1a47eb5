//! Comment service
//!
//! Comments thread one level deep. Replying to a reply attaches the new
//! comment to the top-level parent.

use crate::db::repositories::{CommentRepository, UserRepository, VoteRepository, VoteTarget};
use crate::models::{
    Article, Comment, CommentHistory, CommentView, CreateCommentInput, LikesInfo, User, VoteKind,
};
use crate::services::article::{ArticleService, ArticleServiceError};
use crate::services::notification::NotificationService;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

const COMMENT_NOT_FOUND: &str = "comment does not exist";
const NO_PERMISSION: &str = "You do not have permission to perform this action";

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for CommentServiceError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::InternalError(e) => CommentServiceError::InternalError(e),
            other => CommentServiceError::NotFound(other.to_string()),
        }
    }
}

/// Comment after a like/dislike toggle
#[derive(Debug, Clone)]
pub struct CommentVote {
    pub comment: Comment,
    pub likes_info: LikesInfo,
    pub message: &'static str,
}

pub struct CommentService {
    articles: Arc<ArticleService>,
    comment_repo: Arc<dyn CommentRepository>,
    user_repo: Arc<dyn UserRepository>,
    vote_repo: Arc<dyn VoteRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        articles: Arc<ArticleService>,
        comment_repo: Arc<dyn CommentRepository>,
        user_repo: Arc<dyn UserRepository>,
        vote_repo: Arc<dyn VoteRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            articles,
            comment_repo,
            user_repo,
            vote_repo,
            notifications,
        }
    }

    /// Comment on an article and notify readers who favorited it
    pub async fn create(
        &self,
        author: &User,
        slug: &str,
        body: &str,
    ) -> Result<CommentView, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.insert(author, &article, None, body).await?;
        self.notifications
            .comment_posted(author, &article, &comment)
            .await;
        self.present(comment, &mut HashMap::new()).await
    }

    /// Reply to comment `parent_id`
    pub async fn reply(
        &self,
        author: &User,
        slug: &str,
        parent_id: i64,
        body: &str,
    ) -> Result<CommentView, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let parent = self.find_in(&article, parent_id).await?;
        let root = parent.parent_id.unwrap_or(parent.id);
        let comment = self.insert(author, &article, Some(root), body).await?;
        self.notifications
            .comment_posted(author, &article, &comment)
            .await;
        self.present(comment, &mut HashMap::new()).await
    }

    /// Top-level comments of an article, each with its replies
    pub async fn list(&self, slug: &str) -> Result<Vec<CommentView>, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comments = self
            .comment_repo
            .list_top_level(article.id)
            .await
            .context("Failed to list comments")?;

        let mut authors = HashMap::new();
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.present_thread(comment, &mut authors).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, slug: &str, id: i64) -> Result<CommentView, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.find_in(&article, id).await?;
        self.present_thread(comment, &mut HashMap::new()).await
    }

    /// Edit by the author; the previous text goes to history
    pub async fn update(
        &self,
        caller: &User,
        slug: &str,
        id: i64,
        body: &str,
    ) -> Result<CommentView, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.find_in(&article, id).await?;
        if !caller.owns(comment.author_id) {
            return Err(CommentServiceError::Forbidden(NO_PERMISSION.to_string()));
        }
        let body = validate_body(body)?;

        let updated = self
            .comment_repo
            .update_body(comment.id, body)
            .await
            .context("Failed to update comment")?
            .ok_or_else(|| CommentServiceError::NotFound(COMMENT_NOT_FOUND.to_string()))?;
        self.present(updated, &mut HashMap::new()).await
    }

    /// Earlier versions of a comment, oldest first
    pub async fn history(
        &self,
        slug: &str,
        id: i64,
    ) -> Result<Vec<CommentHistory>, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.find_in(&article, id).await?;
        Ok(self
            .comment_repo
            .history(comment.id)
            .await
            .context("Failed to load comment history")?)
    }

    /// Delete by the author. Replies go with their parent.
    pub async fn delete(&self, caller: &User, slug: &str, id: i64) -> Result<(), CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.find_in(&article, id).await?;
        if !caller.owns(comment.author_id) {
            return Err(CommentServiceError::Forbidden(NO_PERMISSION.to_string()));
        }
        self.comment_repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    /// Toggle the caller's like or dislike on a comment.
    ///
    /// Repeating the same vote removes it; the opposite vote replaces it.
    pub async fn toggle_vote(
        &self,
        user: &User,
        slug: &str,
        id: i64,
        kind: VoteKind,
    ) -> Result<CommentVote, CommentServiceError> {
        let article = self.articles.find(slug).await?;
        let comment = self.find_in(&article, id).await?;

        let current = self
            .vote_repo
            .get(VoteTarget::Comment, user.id, comment.id)
            .await
            .context("Failed to load comment vote")?;

        let message = if current == Some(kind) {
            self.vote_repo
                .delete(VoteTarget::Comment, user.id, comment.id)
                .await
                .context("Failed to delete comment vote")?;
            match kind {
                VoteKind::Like => "Comment unliked",
                VoteKind::Dislike => "Dislike removed",
            }
        } else {
            self.vote_repo
                .set(VoteTarget::Comment, user.id, comment.id, kind)
                .await
                .context("Failed to record comment vote")?;
            match kind {
                VoteKind::Like => "Comment liked",
                VoteKind::Dislike => "Comment disliked",
            }
        };

        let after = if current == Some(kind) { None } else { Some(kind) };
        let counts = self
            .vote_repo
            .counts(VoteTarget::Comment, comment.id)
            .await
            .context("Failed to count comment votes")?;

        Ok(CommentVote {
            comment,
            likes_info: LikesInfo {
                like: after == Some(VoteKind::Like),
                dislike: after == Some(VoteKind::Dislike),
                likes_count: counts.likes,
                dislikes_count: counts.dislikes,
            },
            message,
        })
    }

    async fn insert(
        &self,
        author: &User,
        article: &Article,
        parent_id: Option<i64>,
        body: &str,
    ) -> Result<Comment, CommentServiceError> {
        let body = validate_body(body)?;
        let comment = self
            .comment_repo
            .create(&CreateCommentInput {
                article_id: article.id,
                author_id: author.id,
                parent_id,
                body: body.to_string(),
            })
            .await
            .context("Failed to create comment")?;
        Ok(comment)
    }

    /// Comment `id` if it belongs to `article`
    async fn find_in(&self, article: &Article, id: i64) -> Result<Comment, CommentServiceError> {
        self.comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.article_id == article.id)
            .ok_or_else(|| CommentServiceError::NotFound(COMMENT_NOT_FOUND.to_string()))
    }

    async fn present_thread(
        &self,
        comment: Comment,
        authors: &mut HashMap<i64, String>,
    ) -> Result<CommentView, CommentServiceError> {
        let replies = self
            .comment_repo
            .list_replies(comment.id)
            .await
            .context("Failed to list replies")?;

        let mut reply_views = Vec::with_capacity(replies.len());
        for reply in replies {
            reply_views.push(self.present(reply, authors).await?);
        }
        Ok(self.present(comment, authors).await?.with_replies(reply_views))
    }

    async fn present(
        &self,
        comment: Comment,
        authors: &mut HashMap<i64, String>,
    ) -> Result<CommentView, CommentServiceError> {
        let author = match authors.get(&comment.author_id) {
            Some(name) => name.clone(),
            None => {
                let name = self
                    .user_repo
                    .get_by_id(comment.author_id)
                    .await
                    .context("Failed to load comment author")?
                    .map(|u| u.username)
                    .unwrap_or_default();
                authors.insert(comment.author_id, name.clone());
                name
            }
        };
        let counts = self
            .vote_repo
            .counts(VoteTarget::Comment, comment.id)
            .await
            .context("Failed to count comment votes")?;
        Ok(CommentView::new(comment, author, counts))
    }
}

fn validate_body(body: &str) -> Result<&str, CommentServiceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(CommentServiceError::ValidationError(
            "Comment body may not be blank".to_string(),
        ));
    }
    Ok(body)
}
