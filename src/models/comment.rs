//! Comment model
//!
//! Comments thread one level deep: a reply always points at a top-level
//! comment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VoteCounts;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: i64,
    /// Article the comment belongs to
    pub article_id: i64,
    /// Author user ID
    pub author_id: i64,
    /// Parent comment for replies
    pub parent_id: Option<i64>,
    /// Comment text
    pub body: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last edit timestamp
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Input for creating a comment or reply
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub article_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
}

/// Previous text of an edited comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentHistory {
    pub id: i64,
    pub comment_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Comment ready for presentation, with author name, counts and replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub body: String,
    pub author: String,
    pub parent: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: i64,
    pub dislikes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

impl CommentView {
    pub fn new(comment: Comment, author: String, counts: VoteCounts) -> Self {
        Self {
            id: comment.id,
            body: comment.body,
            author,
            parent: comment.parent_id,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            likes: counts.likes,
            dislikes: counts.dislikes,
            replies: None,
        }
    }

    pub fn with_replies(mut self, replies: Vec<CommentView>) -> Self {
        self.replies = Some(replies);
        self
    }
}

/// Caller's like state on a comment, returned after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikesInfo {
    pub like: bool,
    pub dislike: bool,
    pub likes_count: i64,
    pub dislikes_count: i64,
}
