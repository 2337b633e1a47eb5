//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The JSON error type and its status mapping
//! - Session authentication (required and optional)
//! - Extractors for the current user and client address

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::*;
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    ArticleRepos, ArticleService, CommentService, EscalationService, HighlightService,
    LoginRateLimiter, Mailer, NotificationService, ProfileService, ReactionService, TokenSigner,
    UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub article_service: Arc<ArticleService>,
    pub reaction_service: Arc<ReactionService>,
    pub comment_service: Arc<CommentService>,
    pub highlight_service: Arc<HighlightService>,
    pub notification_service: Arc<NotificationService>,
    pub escalation_service: Arc<EscalationService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(config: &Config, pool: DynDatabasePool, cache: Arc<Cache>) -> Self {
        let tokens = TokenSigner::new(
            config.auth.token_secret.clone(),
            chrono::Duration::hours(config.auth.token_hours),
        );
        let mailer = Mailer::new(config.email.clone(), config.server.site_url.clone());

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let profile_repo = SqlxProfileRepository::boxed(pool.clone());
        let notification_repo = SqlxNotificationRepository::boxed(pool.clone());
        let favorite_repo = SqlxFavoriteRepository::boxed(pool.clone());
        let vote_repo = SqlxVoteRepository::boxed(pool.clone());
        let rating_repo = SqlxRatingRepository::boxed(pool.clone());

        let user_service = Arc::new(
            UserService::new(
                user_repo.clone(),
                SqlxSessionRepository::boxed(pool.clone()),
                profile_repo.clone(),
                notification_repo.clone(),
                tokens.clone(),
                mailer.clone(),
            )
            .with_session_days(config.auth.session_days),
        );
        let profile_service = Arc::new(ProfileService::new(user_repo.clone(), profile_repo.clone()));
        let notification_service = Arc::new(NotificationService::new(
            notification_repo,
            user_repo.clone(),
            profile_repo.clone(),
            favorite_repo.clone(),
            tokens,
            mailer,
        ));
        let article_service = Arc::new(ArticleService::new(
            ArticleRepos {
                articles: SqlxArticleRepository::boxed(pool.clone()),
                tags: SqlxTagRepository::boxed(pool.clone()),
                users: user_repo.clone(),
                profiles: profile_repo,
                votes: vote_repo.clone(),
                favorites: favorite_repo.clone(),
                ratings: rating_repo.clone(),
            },
            cache,
            notification_service.clone(),
            config.server.site_url.clone(),
        ));
        let reaction_service = Arc::new(ReactionService::new(
            article_service.clone(),
            vote_repo.clone(),
            favorite_repo,
            SqlxBookmarkRepository::boxed(pool.clone()),
            rating_repo,
        ));
        let comment_service = Arc::new(CommentService::new(
            article_service.clone(),
            SqlxCommentRepository::boxed(pool.clone()),
            user_repo,
            vote_repo,
            notification_service.clone(),
        ));
        let highlight_service = Arc::new(HighlightService::new(
            article_service.clone(),
            SqlxHighlightRepository::boxed(pool.clone()),
        ));
        let escalation_service = Arc::new(EscalationService::new(
            article_service.clone(),
            SqlxEscalationRepository::boxed(pool.clone()),
        ));

        Self {
            pool,
            user_service,
            profile_service,
            article_service,
            reaction_service,
            comment_service,
            highlight_service,
            notification_service,
            escalation_service,
            rate_limiter: Arc::new(LoginRateLimiter::new()),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The reader of a public page, if signed in
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::new("NOT_ACCEPTABLE", message)
    }

    pub fn unverified(message: impl Into<String>) -> Self {
        Self::new("UNVERIFIED", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("TOO_MANY_REQUESTS", message)
    }

    /// Log the cause and hide it from the client
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::new("INTERNAL_ERROR", "Something went wrong. Please try again later.")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "USER_BANNED" | "UNVERIFIED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "NOT_ACCEPTABLE" => StatusCode::NOT_ACCEPTABLE,
            "TOO_MANY_REQUESTS" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Session token from the `Authorization: Bearer` header or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware. Unverified accounts are turned away.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let token = extract_session_token(&parts.headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    if !user.is_verified {
        return Err(ApiError::unverified("This user has not been verified"));
    }

    parts.extensions.insert(AuthenticatedUser(user));
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Optional authentication middleware
pub async fn optional_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    if let Some(token) = extract_session_token(&parts.headers) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) if user.is_verified => {
                parts.extensions.insert(AuthenticatedUser(user));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(Request::from_parts(parts, body)).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        Ok(ClientIp(forwarded.or(peer)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn parts_of(request: HttpRequest<Body>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let parts = parts_of(
            HttpRequest::builder()
                .header(header::AUTHORIZATION, "Bearer test-token-123")
                .body(Body::empty())
                .unwrap(),
        );
        assert_eq!(extract_session_token(&parts.headers), Some("test-token-123".to_string()));
    }

    async fn client_ip(request: HttpRequest<Body>) -> Option<IpAddr> {
        let mut parts = parts_of(request);
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        ip
    }

    #[tokio::test]
    async fn test_client_ip_prefers_first_forwarded_hop() {
        let mut request = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_ip(request).await, Some("203.0.113.7".parse::<IpAddr>().unwrap()));
    }

    #[tokio::test]
    async fn test_client_ip_falls_back_to_peer() {
        let mut request = HttpRequest::builder()
            .header("x-forwarded-for", "not-an-ip")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5555))));
        assert_eq!(client_ip(request).await, Some("192.0.2.1".parse::<IpAddr>().unwrap()));

        let bare = HttpRequest::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(bare).await, None);
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let parts = parts_of(
            HttpRequest::builder()
                .header(header::COOKIE, "theme=dark; session=test-token-456")
                .body(Body::empty())
                .unwrap(),
        );
        assert_eq!(extract_session_token(&parts.headers), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let parts = parts_of(
            HttpRequest::builder()
                .header(header::AUTHORIZATION, "Bearer bearer-token")
                .header(header::COOKIE, "session=cookie-token")
                .body(Body::empty())
                .unwrap(),
        );
        assert_eq!(extract_session_token(&parts.headers), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        let parts = parts_of(HttpRequest::builder().body(Body::empty()).unwrap());
        assert!(extract_session_token(&parts.headers).is_none());

        let parts = parts_of(
            HttpRequest::builder()
                .header(header::AUTHORIZATION, "Basic invalid")
                .body(Body::empty())
                .unwrap(),
        );
        assert!(extract_session_token(&parts.headers).is_none());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::unverified("x"), StatusCode::FORBIDDEN),
            (ApiError::new("USER_BANNED", "x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::new("CONFLICT", "x"), StatusCode::CONFLICT),
            (ApiError::not_acceptable("x"), StatusCode::NOT_ACCEPTABLE),
            (ApiError::too_many_requests("x"), StatusCode::TOO_MANY_REQUESTS),
            (ApiError::new("WHATEVER", "x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{}", error.error.code);
        }
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let error = ApiError::internal("database is on fire");
        assert_eq!(error.error.code, "INTERNAL_ERROR");
        assert!(!error.error.message.contains("fire"));
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({"field": "username"});
        let error = ApiError::with_details("VALIDATION_ERROR", "Invalid", details.clone());
        assert_eq!(error.error.details, Some(details));
    }
}
