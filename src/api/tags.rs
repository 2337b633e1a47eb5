//! Tag API endpoints
//!
//! - GET /api/v1/tags - Names of every tag in use

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};

/// Response for tag list
#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}

/// GET /api/v1/tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagListResponse>, ApiError> {
    let tags = state.article_service.tags().await?;
    Ok(Json(TagListResponse { tags }))
}
