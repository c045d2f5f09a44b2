use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
    Dismissed,
}

/// The only transitions a recipient may request. Anything else ("archived",
/// "unread", ...) fails JSON deserialization and never reaches a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StatusTransition {
    Read,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub sender_id: Option<i32>,
    pub event_id: Option<i32>,
    pub kind: String,
    pub alert_type: Option<String>,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub metadata: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewNotificationIn {
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub alert_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<NotificationStatus>,
    pub alert_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPatchIn {
    pub status: StatusTransition,
}

pub const MAX_PAGE: i64 = 100;
pub const DEFAULT_PAGE: i64 = 50;

pub fn effective_limit(requested: Option<i64>) -> i64 {
    requested
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE)
        .min(MAX_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(effective_limit(None), DEFAULT_PAGE);
        assert_eq!(effective_limit(Some(10)), 10);
        assert_eq!(effective_limit(Some(0)), DEFAULT_PAGE);
        assert_eq!(effective_limit(Some(-3)), DEFAULT_PAGE);
        assert_eq!(effective_limit(Some(5000)), MAX_PAGE);
    }

    #[test]
    fn status_transition_rejects_other_values() {
        assert!(serde_json::from_str::<StatusPatchIn>(r#"{"status":"read"}"#).is_ok());
        assert!(serde_json::from_str::<StatusPatchIn>(r#"{"status":"dismissed"}"#).is_ok());
        assert!(serde_json::from_str::<StatusPatchIn>(r#"{"status":"archived"}"#).is_err());
        assert!(serde_json::from_str::<StatusPatchIn>(r#"{"status":"unread"}"#).is_err());
    }
}
