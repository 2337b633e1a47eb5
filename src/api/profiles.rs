//! Profile API endpoints
//!
//! - GET /api/v1/profiles/{username} - Public profile
//! - PATCH /api/v1/profiles/{username} - Edit own profile
//! - POST/DELETE /api/v1/profiles/{username}/follow - Follow or unfollow
//! - GET /api/v1/profiles/{username}/follow - Who the user follows
//! - GET /api/v1/profiles/{username}/followers - Who follows the user

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, Viewer};
use crate::models::{ProfileView, UpdateProfileInput};

#[derive(Debug, Serialize)]
pub struct ProfileResponse<T> {
    pub profile: T,
}

#[derive(Debug, Serialize)]
pub struct FollowingList {
    pub following: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct FollowerList {
    pub followers: Vec<String>,
    pub count: usize,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/profiles/{username}", get(get_profile))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/profiles/{username}", patch(update_profile))
        .route("/profiles/{username}/", patch(update_profile))
        .route(
            "/profiles/{username}/follow",
            post(follow).delete(unfollow).get(following),
        )
        .route("/profiles/{username}/followers", get(followers))
}

/// GET /api/v1/profiles/{username}
async fn get_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse<ProfileView>>, ApiError> {
    let profile = state
        .profile_service
        .get_profile(&username, viewer.user())
        .await?;
    Ok(Json(ProfileResponse { profile }))
}

/// PATCH /api/v1/profiles/{username}
async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<ProfileResponse<ProfileView>>, ApiError> {
    let profile = state
        .profile_service
        .update_profile(&username, &user, body)
        .await?;

    // cached articles embed the author's bio and image
    state.article_service.invalidate_all().await;

    Ok(Json(ProfileResponse { profile }))
}

/// POST /api/v1/profiles/{username}/follow
async fn follow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse<MessageResponse>>, ApiError> {
    let message = state.profile_service.follow(&user, &username).await?;
    Ok(Json(ProfileResponse {
        profile: MessageResponse::new(message),
    }))
}

/// DELETE /api/v1/profiles/{username}/follow
async fn unfollow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse<MessageResponse>>, ApiError> {
    let message = state.profile_service.unfollow(&user, &username).await?;
    Ok(Json(ProfileResponse {
        profile: MessageResponse::new(message),
    }))
}

/// GET /api/v1/profiles/{username}/follow
async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse<FollowingList>>, ApiError> {
    let following = state.profile_service.following(&username).await?;
    Ok(Json(ProfileResponse {
        profile: FollowingList {
            count: following.len(),
            following,
        },
    }))
}

/// GET /api/v1/profiles/{username}/followers
async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse<FollowerList>>, ApiError> {
    let followers = state.profile_service.followers(&username).await?;
    Ok(Json(ProfileResponse {
        profile: FollowerList {
            count: followers.len(),
            followers,
        },
    }))
}
