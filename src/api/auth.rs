//! Authentication API endpoints
//!
//! Handles HTTP requests for accounts and sessions:
//! - POST /api/v1/users - Registration
//! - POST /api/v1/users/login - Login
//! - POST /api/v1/users/logout - Logout
//! - GET /api/v1/users/activate/{token} - Email verification
//! - POST /api/v1/users/password/reset - Request a reset token
//! - POST /api/v1/users/password/reset/confirm - Set a new password
//! - GET/PUT /api/v1/user - Current user

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::common::MessageResponse;
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::models::{Session, User};
use crate::services::{
    LoginInput, PasswordResetInput, RegisterInput, UpdateUserInput, UserServiceError,
};

/// `{"user": {...}}` request body
#[derive(Debug, Deserialize)]
pub struct UserEnvelope<T> {
    #[serde(default)]
    pub user: T,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

/// User with the session token handed to the client
#[derive(Debug, Serialize)]
pub struct TokenUser {
    pub email: String,
    pub username: String,
    pub token: String,
}

impl TokenUser {
    fn new(user: User, session: &Session) -> Self {
        Self {
            email: user.email,
            username: user.username,
            token: session.id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: TokenUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            is_verified: user.is_verified,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/users/logout", post(logout))
        .route("/user", get(get_current_user).put(update_current_user))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/activate/{token}", get(activate))
        .route("/users/password/reset", post(request_password_reset))
        .route("/users/password/reset/confirm", post(confirm_password_reset))
}

/// POST /api/v1/users - User registration
///
/// The first account becomes an admin. A verification link is mailed; the
/// returned token only works once the address is verified.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<UserEnvelope<RegisterInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.register(body.user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: TokenUser::new(user, &session),
            message: Some("Account created successfully. Check your email.".to_string()),
        }),
    ))
}

/// POST /api/v1/users/login - User login
///
/// Throttled per client IP and per email after repeated failures.
async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<UserEnvelope<LoginInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.user;
    let email = input.email.clone();

    if state.rate_limiter.check(&email, ip).await {
        return Err(ApiError::too_many_requests(
            "Too many login attempts. Please try again later.",
        ));
    }

    let (user, session) = match state.user_service.login(input).await {
        Ok(result) => result,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failure(&email).await;
            }
            return Err(e.into());
        }
    };
    state.rate_limiter.record_success(&email).await;
    tracing::info!("{} logged in", user.username);

    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, max_age
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: TokenUser::new(user, &session),
            message: None,
        }),
    ))
}

/// POST /api/v1/users/logout - End the current session
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );

    Ok((
        response_headers,
        Json(MessageResponse::new("You have been logged out")),
    ))
}

/// GET /api/v1/users/activate/{token} - Verify an email address
async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state.user_service.activate(&token).await?;
    tracing::info!("{} verified their email", user.username);
    Ok(Json(MessageResponse::new("You have been verified successfully")))
}

/// POST /api/v1/users/password/reset - Mail a reset token
async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.request_password_reset(&body.email).await?;
    Ok(Json(MessageResponse::new(
        "A password reset link has been sent to your email",
    )))
}

/// POST /api/v1/users/password/reset/confirm - Set a new password
async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.confirm_password_reset(body).await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// GET /api/v1/user - Get current user
async fn get_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse { user: user.into() })
}

/// PUT /api/v1/user - Change username, email or password
async fn update_current_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let renamed = body
        .username
        .as_deref()
        .is_some_and(|name| name.trim() != user.username);

    let updated = state.user_service.update_user(&user, body).await?;

    // cached articles embed the author's username
    if renamed {
        state.article_service.invalidate_all().await;
    }

    Ok(Json(CurrentUserResponse {
        user: updated.into(),
    }))
}
