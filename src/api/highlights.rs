//! Highlight API endpoints
//!
//! A reader marks a span of an article's title, description or body:
//! - GET/POST /api/v1/articles/{slug}/highlight
//! - GET/PATCH/DELETE /api/v1/articles/{slug}/highlight/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Highlight;
use crate::services::{HighlightInput, UpdateHighlightInput};

#[derive(Debug, Deserialize)]
pub struct HighlightRequest<T> {
    pub highlight: T,
}

#[derive(Debug, Serialize)]
pub struct HighlightResponse {
    pub highlight: Highlight,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HighlightListResponse {
    pub highlights: Vec<Highlight>,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route(
            "/articles/{slug}/highlight",
            get(list_highlights).post(create_highlight),
        )
        .route(
            "/articles/{slug}/highlight/{id}",
            get(get_highlight)
                .patch(update_highlight)
                .delete(delete_highlight),
        )
}

/// POST /api/v1/articles/{slug}/highlight
async fn create_highlight(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<HighlightRequest<HighlightInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let highlight = state
        .highlight_service
        .create(&user, &slug, body.highlight)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(HighlightResponse {
            highlight,
            message: Some("You highlighted this section".to_string()),
        }),
    ))
}

/// GET /api/v1/articles/{slug}/highlight - The caller's highlights
async fn list_highlights(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<HighlightListResponse>, ApiError> {
    let highlights = state.highlight_service.list(&user, &slug).await?;
    Ok(Json(HighlightListResponse { highlights }))
}

/// GET /api/v1/articles/{slug}/highlight/{id}
async fn get_highlight(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<HighlightResponse>, ApiError> {
    let highlight = state.highlight_service.get(&user, &slug, id).await?;
    Ok(Json(HighlightResponse {
        highlight,
        message: None,
    }))
}

/// PATCH /api/v1/articles/{slug}/highlight/{id}
async fn update_highlight(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
    Json(body): Json<HighlightRequest<UpdateHighlightInput>>,
) -> Result<Json<HighlightResponse>, ApiError> {
    let highlight = state
        .highlight_service
        .update(&user, &slug, id, body.highlight)
        .await?;
    Ok(Json(HighlightResponse {
        highlight,
        message: Some("Highlight updated successfully".to_string()),
    }))
}

/// DELETE /api/v1/articles/{slug}/highlight/{id}
async fn delete_highlight(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.highlight_service.delete(&user, &slug, id).await?;
    Ok(Json(MessageResponse::new("Highlight removed")))
}
