//! Article model
//!
//! Articles are addressed by a slug derived from their title. Tags, votes,
//! ratings and favorites live in their own tables and are joined in by the
//! service layer when an article is presented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image used when an article is created without one
pub const DEFAULT_ARTICLE_IMAGE: &str =
    "https://res.cloudinary.com/grean/image/upload/v1556488518/samples/vbioaj1wwewmtmeryucv.jpg";

/// Maximum length of title and description
pub const MAX_TITLE_LENGTH: usize = 255;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly identifier (unique)
    pub slug: String,
    /// Article title
    pub title: String,
    /// Short summary shown in listings
    pub description: String,
    /// Full text
    pub body: String,
    /// Cover image URL
    pub image: String,
    /// Author user ID
    pub author_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateArticleInput {
    pub title: String,
    pub description: String,
    pub body: String,
    /// Cover image; defaults to `DEFAULT_ARTICLE_IMAGE`
    #[serde(default)]
    pub image: Option<String>,
    /// Ordered tag names
    #[serde(default, rename = "tagList")]
    pub tag_list: Vec<String>,
}

impl CreateArticleInput {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            body: body.into(),
            image: None,
            tag_list: Vec::new(),
        }
    }

    /// Set the tag list
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_list = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial article update. An absent `tag_list` keeps the current tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "tagList")]
    pub tag_list: Option<Vec<String>>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.body.is_some()
            || self.image.is_some()
            || self.tag_list.is_some()
    }
}

/// Filters accepted by the article listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Case-insensitive substring of the author's username
    pub author: Option<String>,
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Articles carrying any of these tags
    pub tags: Vec<String>,
}

impl ArticleFilter {
    /// Build a filter from raw query values; `tags` is comma separated
    pub fn from_query(author: Option<&str>, title: Option<&str>, tags: Option<&str>) -> Self {
        let non_blank = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            author: non_blank(author),
            title: non_blank(title),
            tags: tags
                .map(|t| crate::models::normalize_tag_list(t.split(',')))
                .unwrap_or_default(),
        }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Clamp the page to at least 1 and the page size to 1..=100
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Convert the items while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Author block embedded in an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub username: String,
    pub bio: String,
    pub image: Option<String>,
}

/// Everything about an article that does not depend on who is reading it.
///
/// This is the unit the article cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSnapshot {
    pub article: Article,
    pub tag_list: Vec<String>,
    pub author: AuthorSummary,
    pub readtime: String,
    pub likes: i64,
    pub dislikes: i64,
    pub favorites_count: i64,
    pub average_rating: Option<f64>,
}

/// Reactions of the current reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerFlags {
    pub favorited: bool,
    pub liked: bool,
    pub disliked: bool,
}

/// Article as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub image: String,
    #[serde(rename = "tagList")]
    pub tag_list: Vec<String>,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub readtime: String,
    pub likes: i64,
    pub dislikes: i64,
    pub favorites_count: i64,
    pub average_rating: Option<f64>,
    pub favorited: bool,
    pub liked: bool,
    pub disliked: bool,
}

impl ArticleView {
    pub fn new(snapshot: ArticleSnapshot, flags: ViewerFlags) -> Self {
        let ArticleSnapshot {
            article,
            tag_list,
            author,
            readtime,
            likes,
            dislikes,
            favorites_count,
            average_rating,
        } = snapshot;
        Self {
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            image: article.image,
            tag_list,
            author,
            created_at: article.created_at,
            updated_at: article.updated_at,
            readtime,
            likes,
            dislikes,
            favorites_count,
            average_rating,
            favorited: flags.favorited,
            liked: flags.liked,
            disliked: flags.disliked,
        }
    }
}
