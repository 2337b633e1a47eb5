//! Notification API endpoints
//!
//! - GET /api/v1/notifications - Inbox; marks everything read
//! - GET /api/v1/notifications/unread - Unread only
//! - DELETE /api/v1/notifications - Clear inbox
//! - DELETE /api/v1/notifications/{id} - Remove one
//! - GET/PATCH /api/v1/notifications/subscription - Delivery preferences
//! - GET /api/v1/notifications/unsubscribe_email/{token} - Mailed opt-out link

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Notification, NotificationPreferences, UpdatePreferencesInput};
use crate::services::inbox_message;

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub message: String,
}

impl NotificationListResponse {
    fn new(notifications: Vec<Notification>) -> Self {
        Self {
            message: inbox_message(notifications.len()),
            notifications,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: NotificationPreferences,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route(
        "/notifications/unsubscribe_email/{token}",
        get(unsubscribe_email),
    )
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).delete(delete_notifications),
        )
        .route("/notifications/unread", get(list_unread))
        .route(
            "/notifications/subscription",
            get(get_subscription).patch(update_subscription),
        )
        .route("/notifications/{id}", delete(delete_notification))
}

/// GET /api/v1/notifications
async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = state.notification_service.list_all(&user).await?;
    Ok(Json(NotificationListResponse::new(notifications)))
}

/// GET /api/v1/notifications/unread
async fn list_unread(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = state.notification_service.list_unread(&user).await?;
    Ok(Json(NotificationListResponse::new(notifications)))
}

/// DELETE /api/v1/notifications
async fn delete_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.notification_service.delete_all(&user).await?;
    Ok(Json(MessageResponse::new("Notifications deleted successfully")))
}

/// DELETE /api/v1/notifications/{id}
async fn delete_notification(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.notification_service.delete(&user, id).await?;
    Ok(Json(MessageResponse::new("Notification deleted successfully")))
}

/// GET /api/v1/notifications/subscription
async fn get_subscription(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let subscription = state.notification_service.preferences(&user).await?;
    Ok(Json(SubscriptionResponse { subscription }))
}

/// PATCH /api/v1/notifications/subscription
async fn update_subscription(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpdatePreferencesInput>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let subscription = state
        .notification_service
        .update_preferences(&user, body)
        .await?;
    Ok(Json(SubscriptionResponse { subscription }))
}

/// GET /api/v1/notifications/unsubscribe_email/{token}
async fn unsubscribe_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.notification_service.unsubscribe_email(&token).await?;
    Ok(Json(MessageResponse::new(
        "You have unsubscribed from email notifications",
    )))
}
