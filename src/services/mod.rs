//! Services layer - Business logic
//!
//! Services own the rules of Authors Heaven:
//! - validation and permission checks
//! - coordination between repositories, cache and mail
//! - notification fan-out
//!
//! Each service exposes a `thiserror` error whose user-facing variants carry
//! the exact message returned by the API.

pub mod article;
pub mod comment;
pub mod email;
pub mod escalation;
pub mod highlight;
pub mod notification;
pub mod password;
pub mod profile;
pub mod rate_limiter;
pub mod reaction;
pub mod read_time;
pub mod share;
pub mod token;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use article::{generate_slug, ArticleRepos, ArticleService, ArticleServiceError};
pub use comment::{CommentService, CommentServiceError, CommentVote};
pub use email::Mailer;
pub use escalation::{EscalateInput, EscalationService, EscalationServiceError, ReportOutcome};
pub use highlight::{
    validate_span, HighlightInput, HighlightService, HighlightServiceError, UpdateHighlightInput,
};
pub use notification::{inbox_message, NotificationService, NotificationServiceError};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use profile::{gravatar_url, ProfileService, ProfileServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use reaction::{parse_rating, RatingSummary, ReactionService, ReactionServiceError};
pub use read_time::read_time;
pub use share::{invalid_provider_message, ShareProvider};
pub use token::{TokenPurpose, TokenSigner};
pub use user::{
    LoginInput, PasswordResetInput, RegisterInput, UpdateUserInput, UserService, UserServiceError,
};
