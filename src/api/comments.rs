//! Comment API endpoints
//!
//! Handles HTTP requests for comments on an article:
//! - GET/POST /api/v1/articles/{slug}/comments - List threads / comment
//! - GET/POST/PUT/DELETE /api/v1/articles/{slug}/comments/{id} - Thread, reply, edit, delete
//! - GET /api/v1/articles/{slug}/comments/{id}/history - Previous bodies
//! - POST /api/v1/articles/{slug}/comments/{id}/like and /dislike - Toggle votes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CommentHistory, CommentView, LikesInfo, VoteKind};
use crate::services::CommentVote;

#[derive(Debug, Default, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub body: String,
}

/// `{"comment": {"body": ...}}`
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: CommentBody,
}

/// `{"reply": {"body": ...}}`
#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub reply: CommentBody,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: CommentView,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<CommentHistory>,
}

#[derive(Debug, Serialize)]
pub struct VotedComment {
    pub id: i64,
    pub body: String,
    pub likes_info: LikesInfo,
}

#[derive(Debug, Serialize)]
pub struct CommentVoteResponse {
    pub comment: VotedComment,
    pub message: String,
}

impl From<CommentVote> for CommentVoteResponse {
    fn from(vote: CommentVote) -> Self {
        Self {
            comment: VotedComment {
                id: vote.comment.id,
                body: vote.comment.body,
                likes_info: vote.likes_info,
            },
            message: vote.message.to_string(),
        }
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/articles/{slug}/comments", get(list_comments))
        .route("/articles/{slug}/comments/{id}", get(get_comment))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/articles/{slug}/comments", post(create_comment))
        .route(
            "/articles/{slug}/comments/{id}",
            post(reply).put(update_comment).delete(delete_comment),
        )
        .route("/articles/{slug}/comments/{id}/history", get(comment_history))
        .route("/articles/{slug}/comments/{id}/like", post(like))
        .route("/articles/{slug}/comments/{id}/dislike", post(dislike))
}

/// GET /api/v1/articles/{slug}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let comments = state.comment_service.list(&slug).await?;
    Ok(Json(CommentListResponse { comments }))
}

/// POST /api/v1/articles/{slug}/comments
async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(&user, &slug, &body.comment.body)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// GET /api/v1/articles/{slug}/comments/{id}
async fn get_comment(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comment_service.get(&slug, id).await?;
    Ok(Json(CommentResponse { comment }))
}

/// POST /api/v1/articles/{slug}/comments/{id} - Reply
///
/// Replies to a reply land under the top-level comment.
async fn reply(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
    Json(body): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .reply(&user, &slug, id, &body.reply.body)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

/// PUT /api/v1/articles/{slug}/comments/{id}
async fn update_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .update(&user, &slug, id, &body.comment.body)
        .await?;
    Ok(Json(CommentResponse { comment }))
}

/// DELETE /api/v1/articles/{slug}/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.comment_service.delete(&user, &slug, id).await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

/// GET /api/v1/articles/{slug}/comments/{id}/history
async fn comment_history(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.comment_service.history(&slug, id).await?;
    Ok(Json(HistoryResponse { history }))
}

/// POST /api/v1/articles/{slug}/comments/{id}/like
async fn like(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<CommentVoteResponse>, ApiError> {
    let vote = state
        .comment_service
        .toggle_vote(&user, &slug, id, VoteKind::Like)
        .await?;
    Ok(Json(vote.into()))
}

/// POST /api/v1/articles/{slug}/comments/{id}/dislike
async fn dislike(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<CommentVoteResponse>, ApiError> {
    let vote = state
        .comment_service
        .toggle_vote(&user, &slug, id, VoteKind::Dislike)
        .await?;
    Ok(Json(vote.into()))
}
