//! Common API utilities and shared types
//!
//! Pagination defaults, a plain message body and the conversions from
//! service errors into `ApiError`.

use serde::Serialize;

use crate::api::middleware::ApiError;
use crate::services::{
    ArticleServiceError, CommentServiceError, EscalationServiceError, HighlightServiceError,
    NotificationServiceError, ProfileServiceError, ReactionServiceError, UserServiceError,
};

// ============================================================================
// Pagination
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for public APIs
pub fn default_page_size() -> u32 {
    10
}

/// `{"message": ...}` body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg)
            | UserServiceError::ValidationError(msg)
            | UserServiceError::UserExists(msg) => ApiError::validation_error(msg),
            UserServiceError::NotVerified => ApiError::unverified(err.to_string()),
            UserServiceError::AlreadyVerified => ApiError::not_acceptable(err.to_string()),
            UserServiceError::InvalidToken => ApiError::bad_request(err.to_string()),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::NotFound(msg) => ApiError::not_found(msg),
            ProfileServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(msg) => ApiError::not_found(msg),
            ArticleServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::InvalidPage => ApiError::not_found(err.to_string()),
            ArticleServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ReactionServiceError> for ApiError {
    fn from(err: ReactionServiceError) -> Self {
        match err {
            ReactionServiceError::NotFound(msg) => ApiError::not_found(msg),
            ReactionServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ReactionServiceError::ValidationError(msg) | ReactionServiceError::Duplicate(msg) => {
                ApiError::validation_error(msg)
            }
            ReactionServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(msg) => ApiError::not_found(msg),
            CommentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<HighlightServiceError> for ApiError {
    fn from(err: HighlightServiceError) -> Self {
        match err {
            HighlightServiceError::NotFound(msg) => ApiError::not_found(msg),
            HighlightServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            HighlightServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<NotificationServiceError> for ApiError {
    fn from(err: NotificationServiceError) -> Self {
        match err {
            NotificationServiceError::NotFound(msg) => ApiError::not_found(msg),
            NotificationServiceError::InvalidToken => ApiError::bad_request(err.to_string()),
            NotificationServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<EscalationServiceError> for ApiError {
    fn from(err: EscalationServiceError) -> Self {
        match err {
            EscalationServiceError::NotFound(msg) => ApiError::not_found(msg),
            EscalationServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            EscalationServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            EscalationServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_user_errors_map_to_status() {
        let cases = [
            (
                UserServiceError::AuthenticationError("Wrong email or password.".into()),
                StatusCode::BAD_REQUEST,
            ),
            (UserServiceError::NotVerified, StatusCode::FORBIDDEN),
            (UserServiceError::AlreadyVerified, StatusCode::NOT_ACCEPTABLE),
            (UserServiceError::InvalidToken, StatusCode::BAD_REQUEST),
            (
                UserServiceError::NotFound("User with that email does not exist".into()),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_invalid_page_is_not_found() {
        let error = ApiError::from(ArticleServiceError::InvalidPage);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.error.message, "Invalid page.");
    }

    #[test]
    fn test_duplicate_reaction_is_bad_request() {
        let error = ApiError::from(ReactionServiceError::Duplicate(
            "Already favorited this article".into(),
        ));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error.message, "Already favorited this article");
    }

    #[test]
    fn test_internal_errors_are_hidden() {
        let error = ApiError::from(CommentServiceError::InternalError(anyhow::anyhow!(
            "no such table: comments"
        )));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.error.message.contains("comments"));
    }
}
