//! Reader reactions: votes, ratings and bookmarks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a like/dislike vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    /// Stored value: +1 for like, -1 for dislike
    pub fn value(self) -> i32 {
        match self {
            VoteKind::Like => 1,
            VoteKind::Dislike => -1,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(VoteKind::Like),
            -1 => Some(VoteKind::Dislike),
            _ => None,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKind::Like => write!(f, "like"),
            VoteKind::Dislike => write!(f, "dislike"),
        }
    }
}

impl FromStr for VoteKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(VoteKind::Like),
            "dislike" => Ok(VoteKind::Dislike),
            _ => Err(anyhow::anyhow!("Invalid vote: {}", s)),
        }
    }
}

/// Aggregated like/dislike counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub likes: i64,
    pub dislikes: i64,
}

/// Lowest accepted rating
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating
pub const MAX_RATING: i32 = 5;

/// One reader's score for an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: i64,
    pub article_id: i64,
    pub score: i32,
    pub updated_at: DateTime<Utc>,
}

/// Round an average rating to two decimals
pub fn round_rating(average: f64) -> f64 {
    (average * 100.0).round() / 100.0
}

/// Saved-for-later article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A bookmark as listed to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkedArticle {
    /// Bookmark id, used to remove it
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// When the bookmark was made
    pub created_at: DateTime<Utc>,
}
