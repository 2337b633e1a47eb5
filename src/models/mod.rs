//! Data models
//!
//! Database entities, inputs accepted by the services and the presentation
//! types the API serializes.

mod article;
mod comment;
mod escalation;
mod highlight;
mod notification;
mod profile;
mod reaction;
mod session;
mod tag;
mod user;

pub use article::{
    Article, ArticleFilter, ArticleSnapshot, ArticleView, AuthorSummary, CreateArticleInput,
    ListParams, PagedResult, UpdateArticleInput, ViewerFlags, DEFAULT_ARTICLE_IMAGE,
    MAX_TITLE_LENGTH,
};
pub use comment::{Comment, CommentHistory, CommentView, CreateCommentInput, LikesInfo};
pub use escalation::{
    Escalation, EscalationReason, EscalationReport, ReportedArticle, MAX_ESCALATION_DESCRIPTION,
};
pub use highlight::{Highlight, HighlightField, NewHighlight};
pub use notification::{
    NewNotification, Notification, NotificationPreferences, UpdatePreferencesInput,
};
pub use profile::{Profile, ProfileView, UpdateProfileInput, MAX_BIO_LENGTH, MAX_NAME_LENGTH};
pub use reaction::{
    round_rating, Bookmark, BookmarkedArticle, Rating, VoteCounts, VoteKind, MAX_RATING, MIN_RATING,
};
pub use session::Session;
pub use tag::{normalize_tag_list, Tag};
pub use user::{User, UserRole};
