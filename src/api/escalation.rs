//! Escalation API endpoints
//!
//! - POST /api/v1/article/{slug}/escalate - Report an article
//! - DELETE /api/v1/article/{slug}/escalate - Admin removal of a reported article
//! - GET /api/v1/article/escalate - Admin list of reports

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
use crate::models::{Escalation, EscalationReport};
use crate::services::{EscalateInput, ReportOutcome};

#[derive(Debug, Deserialize)]
pub struct EscalateRequest {
    pub escalate: EscalateInput,
}

#[derive(Debug, Serialize)]
pub struct EscalationResponse {
    pub escalation: Escalation,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    #[serde(rename = "escalated articles")]
    pub escalated_articles: Vec<EscalationReport>,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/article/escalate", get(list_reports))
        .route(
            "/article/{slug}/escalate",
            post(report_article).delete(delete_reported),
        )
}

/// POST /api/v1/article/{slug}/escalate
async fn report_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Json(body): Json<EscalateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .escalation_service
        .report(&user, &slug, body.escalate)
        .await?;

    let (status, escalation, message) = match outcome {
        ReportOutcome::Created(e) => (StatusCode::CREATED, e, "Article reported successfully"),
        ReportOutcome::Updated(e) => (StatusCode::OK, e, "Report updated successfully"),
    };
    Ok((
        status,
        Json(EscalationResponse {
            escalation,
            message: message.to_string(),
        }),
    ))
}

/// DELETE /api/v1/article/{slug}/escalate
async fn delete_reported(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.escalation_service.delete_reported(&user, &slug).await?;
    Ok(Json(MessageResponse::new("Article deleted successfully")))
}

/// GET /api/v1/article/escalate
async fn list_reports(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ReportListResponse>, ApiError> {
    let escalated_articles = state.escalation_service.reports(&user).await?;
    Ok(Json(ReportListResponse { escalated_articles }))
}
