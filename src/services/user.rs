//! User service
//!
//! Accounts and authentication:
//! - registration (the first account becomes admin) with email verification
//! - login and logout backed by server-side sessions
//! - password reset through a signed, expiring token
//! - account updates with the same validation as registration

use crate::db::repositories::{
    NotificationRepository, ProfileRepository, SessionRepository, UserRepository,
};
use crate::models::{NotificationPreferences, Session, User, UserRole};
use crate::services::email::Mailer;
use crate::services::password::{hash_password, validate_password_strength, verify_password};
use crate::services::token::{TokenPurpose, TokenSigner};
use anyhow::{Context, Result};
use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[^<>()\[\]\\,;:%=#^\s@"$&!]+@(([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,})$"#)
        .expect("valid email regex")
});

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Wrong or missing credentials
    #[error("{0}")]
    AuthenticationError(String),

    #[error("{0}")]
    ValidationError(String),

    /// Username or email taken
    #[error("{0}")]
    UserExists(String),

    #[error("Your account is not verified. Check your email.")]
    NotVerified,

    #[error("Your email is already verified")]
    AlreadyVerified,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing accounts and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    tokens: TokenSigner,
    mailer: Mailer,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
        tokens: TokenSigner,
        mailer: Mailer,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            profile_repo,
            notification_repo,
            tokens,
            mailer,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override how long a login session lives
    pub fn with_session_days(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    /// Register a new account.
    ///
    /// Creates the user with an empty profile and default notification
    /// preferences, mails a verification link and opens a session. The
    /// session only becomes usable once the email is verified.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, Session), UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password_strength(&input.password).map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "user with this email already exists".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "username already taken".to_string(),
            ));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&User::new(username, email, password_hash, role))
            .await
            .context("Failed to create user")?;

        self.profile_repo
            .create(user.id)
            .await
            .context("Failed to create profile")?;
        self.notification_repo
            .save_preferences(&NotificationPreferences::defaults(user.id))
            .await
            .context("Failed to save notification preferences")?;

        let token = self.tokens.sign(TokenPurpose::Verify, user.id);
        if let Err(e) = self
            .mailer
            .send_verification(&user.email, &user.username, &token)
            .await
        {
            tracing::warn!("Failed to send verification mail to {}: {}", user.email, e);
        }

        tracing::info!("Registered user {} ({})", user.username, user.role);
        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Log in with email and password
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let email = input.email.trim();
        if email.is_empty() {
            return Err(UserServiceError::ValidationError(
                "An email address is required to log in.".to_string(),
            ));
        }
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "A password is required to log in.".to_string(),
            ));
        }

        let wrong = || UserServiceError::AuthenticationError("Wrong email or password.".to_string());

        let user = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(wrong)?;

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            return Err(wrong());
        }

        if !user.is_verified {
            return Err(UserServiceError::NotVerified);
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Invalidate a session token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Confirm an email address from a verification link
    pub async fn activate(&self, token: &str) -> Result<User, UserServiceError> {
        let user_id = self
            .tokens
            .verify(TokenPurpose::Verify, token)
            .ok_or(UserServiceError::InvalidToken)?;

        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::InvalidToken)?;

        if user.is_verified {
            return Err(UserServiceError::AlreadyVerified);
        }

        self.user_repo
            .set_verified(user.id)
            .await
            .context("Failed to verify user")?;

        Ok(User {
            is_verified: true,
            ..user
        })
    }

    /// Mail a password reset token to the account owning `email`
    pub async fn request_password_reset(&self, email: &str) -> Result<(), UserServiceError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Please provide your email address".to_string(),
            ));
        }

        let user = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| {
                UserServiceError::NotFound("User with that email does not exist".to_string())
            })?;

        let token = self.tokens.sign(TokenPurpose::Reset, user.id);
        if let Err(e) = self
            .mailer
            .send_password_reset(&user.email, &user.username, &token)
            .await
        {
            tracing::warn!("Failed to send password reset mail to {}: {}", user.email, e);
        }
        Ok(())
    }

    /// Set a new password from a reset token.
    ///
    /// Every open session of the user is closed.
    pub async fn confirm_password_reset(
        &self,
        input: PasswordResetInput,
    ) -> Result<(), UserServiceError> {
        if input.token.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "There is no token provided".to_string(),
            ));
        }
        let user_id = self
            .tokens
            .verify(TokenPurpose::Reset, input.token.trim())
            .ok_or(UserServiceError::InvalidToken)?;

        if input.password != input.password_confirm {
            return Err(UserServiceError::ValidationError(
                "Passwords do not match".to_string(),
            ));
        }
        validate_password_strength(&input.password).map_err(UserServiceError::ValidationError)?;

        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::InvalidToken)?;

        user.password_hash = hash_password(&input.password).context("Failed to hash password")?;
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        let closed = self
            .session_repo
            .delete_by_user(user.id)
            .await
            .context("Failed to delete sessions")?;
        tracing::info!("Password reset for {}, closed {} session(s)", user.username, closed);
        Ok(())
    }

    /// Change username, email or password of `user`
    pub async fn update_user(
        &self,
        user: &User,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut updated = user.clone();

        if let Some(username) = input.username.map(|u| u.trim().to_string()) {
            validate_username(&username)?;
            if username != user.username {
                let taken = self
                    .user_repo
                    .get_by_username(&username)
                    .await
                    .context("Failed to check username")?
                    .is_some_and(|other| other.id != user.id);
                if taken {
                    return Err(UserServiceError::UserExists(
                        "username already taken".to_string(),
                    ));
                }
            }
            updated.username = username;
        }

        if let Some(email) = input.email.map(|e| e.trim().to_string()) {
            validate_email(&email)?;
            let taken = self
                .user_repo
                .get_by_email(&email)
                .await
                .context("Failed to check email")?
                .is_some_and(|other| other.id != user.id);
            if taken {
                return Err(UserServiceError::UserExists(
                    "user with this email already exists".to_string(),
                ));
            }
            updated.email = email;
        }

        if let Some(password) = input.password {
            validate_password_strength(&password).map_err(UserServiceError::ValidationError)?;
            updated.password_hash = hash_password(&password).context("Failed to hash password")?;
        }

        let saved = self
            .user_repo
            .update(&updated)
            .await
            .context("Failed to update user")?;
        Ok(saved)
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired sessions yield `None`; an expired one is removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user)
    }

    /// Whether no account exists yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        if count > 0 {
            tracing::debug!("Purged {} expired session(s)", count);
        }
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, Duration::days(self.session_expiration_days));
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    if username.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Username is a required field".to_string(),
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(UserServiceError::ValidationError(
            "Username should have no spaces or special characters only".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Email is a required field".to_string(),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(UserServiceError::ValidationError(
            "Email must be of the format name@domain.com and should not contain any special characters before @".to_string(),
        ));
    }
    Ok(())
}

/// Input for user registration
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PasswordResetInput {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}
