//! Database repositories
//!
//! One repository per aggregate. Each is an `async_trait` trait so services
//! can hold `Arc<dyn ...>`, with a `Sqlx*` implementation that dispatches on
//! the configured driver.

/// Expand `$body` once per backend with `$db` bound to the concrete sqlx pool.
///
/// Both expansions are type checked separately, so query builders and row
/// accessors resolve to the right database in each arm.
macro_rules! on_backend {
    ($pool:expr, |$db:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $db = $pool.as_sqlite().unwrap();
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $db = $pool.as_mysql().unwrap();
                $body
            }
        }
    };
}

pub mod article;
pub mod bookmark;
pub mod comment;
pub mod escalation;
pub mod favorite;
pub mod highlight;
pub mod notification;
pub mod profile;
pub mod rating;
pub mod session;
pub mod tag;
pub mod user;
pub mod vote;

#[cfg(test)]
pub(crate) mod test_support;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use bookmark::{BookmarkRepository, SqlxBookmarkRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use escalation::{EscalationRepository, SqlxEscalationRepository};
pub use favorite::{FavoriteRepository, SqlxFavoriteRepository};
pub use highlight::{HighlightRepository, SqlxHighlightRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use rating::{RatingRepository, SqlxRatingRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use vote::{SqlxVoteRepository, VoteRepository, VoteTarget};
