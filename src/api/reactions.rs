//! Reaction API endpoints
//!
//! Votes, favorites, bookmarks and ratings on articles:
//! - POST/DELETE /api/v1/articles/{slug}/{vote}/vote
//! - POST/DELETE /api/v1/articles/{slug}/favorite
//! - POST /api/v1/articles/{slug}/bookmark
//! - GET /api/v1/bookmarks, DELETE /api/v1/bookmarks/{id}
//! - POST /api/v1/articles/{slug}/rate

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Bookmark, BookmarkedArticle};
use crate::services::{parse_rating, RatingSummary};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    #[serde(default)]
    pub rate: RateBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct RateBody {
    #[serde(default)]
    pub rating: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub bookmark: Bookmark,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BookmarkListResponse {
    pub articles: Vec<BookmarkedArticle>,
}

/// Build reaction routes (all require auth)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/articles/{slug}/{vote}/vote", post(vote).delete(unvote))
        .route("/articles/{slug}/favorite", post(favorite).delete(unfavorite))
        .route("/articles/{slug}/bookmark", post(bookmark))
        .route("/articles/{slug}/rate", post(rate))
        .route("/bookmarks", get(list_bookmarks))
        .route("/bookmarks/{id}", delete(remove_bookmark))
}

/// POST /api/v1/articles/{slug}/{vote}/vote
///
/// Repeating the same vote is accepted and changes nothing.
async fn vote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, verb)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.reaction_service.vote(&user, &slug, &verb).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new(message))))
}

/// DELETE /api/v1/articles/{slug}/{vote}/vote
async fn unvote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, verb)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state.reaction_service.unvote(&user, &slug, &verb).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /api/v1/articles/{slug}/favorite
async fn favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.reaction_service.favorite(&user, &slug).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Article added to favorites")),
    ))
}

/// DELETE /api/v1/articles/{slug}/favorite
async fn unfavorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.reaction_service.unfavorite(&user, &slug).await?;
    Ok(Json(MessageResponse::new("Article removed from favorites")))
}

/// POST /api/v1/articles/{slug}/bookmark
async fn bookmark(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bookmark = state.reaction_service.bookmark(&user, &slug).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookmarkResponse {
            bookmark,
            message: "Article has been bookmarked".to_string(),
        }),
    ))
}

/// GET /api/v1/bookmarks
async fn list_bookmarks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<BookmarkListResponse>, ApiError> {
    let articles = state.reaction_service.bookmarks(&user).await?;
    Ok(Json(BookmarkListResponse { articles }))
}

/// DELETE /api/v1/bookmarks/{id}
async fn remove_bookmark(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.reaction_service.remove_bookmark(&user, id).await?;
    Ok(Json(MessageResponse::new("Bookmark has been removed")))
}

/// POST /api/v1/articles/{slug}/rate
async fn rate(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<RateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let score = parse_rating(&body.rate.rating)?;
    let rating = state.reaction_service.rate(&user, &slug, score).await?;
    Ok((StatusCode::CREATED, Json(RatingResponse { rating })))
}
