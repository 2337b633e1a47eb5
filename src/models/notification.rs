//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// In-app notification delivered to one recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(skip_serializing)]
    pub recipient_id: i64,
    pub actor_id: Option<i64>,
    /// Event kind, e.g. "article" or "comment"
    pub verb: String,
    pub description: String,
    pub resource_url: Option<String>,
    pub unread: bool,
    pub emailed: bool,
    #[serde(skip_serializing)]
    pub deleted: bool,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Notification about to be fanned out to a recipient
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub actor_id: Option<i64>,
    pub verb: String,
    pub description: String,
    pub resource_url: Option<String>,
}

/// Per-user delivery settings; both channels default to on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
}

impl NotificationPreferences {
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            email_notifications: true,
            in_app_notifications: true,
        }
    }
}

/// Partial preference update
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UpdatePreferencesInput {
    pub email_notifications: Option<bool>,
    pub in_app_notifications: Option<bool>,
}
