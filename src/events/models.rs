use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Lesson,
    Exam,
    Assignment,
    Personal,
    Broadcast,
    UrgentBroadcast,
    ClassAnnouncement,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub visibility_scope: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_by: i32,
    pub target_class: Option<i32>,
    pub target_user: Option<i32>,
    pub metadata: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewEventIn {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub visibility_scope: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub target_class: Option<i32>,
    pub target_user: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub scope: Option<String>,
    pub class_id: Option<i32>,
}

/// Exactly one of the targets is meaningful per scope; everything else is
/// rejected before any write happens.
pub fn validate_event_targets(
    scope: &str,
    target_class: Option<i32>,
    target_user: Option<i32>,
) -> Result<(), &'static str> {
    match scope {
        "personal" => {
            if target_class.is_some() || target_user.is_some() {
                Err("personal events carry no targets")
            } else {
                Ok(())
            }
        }
        "class" => {
            if target_class.is_none() {
                Err("class scope requires target_class")
            } else if target_user.is_some() {
                Err("class scope does not take target_user")
            } else {
                Ok(())
            }
        }
        "schoolwide" | "all" => {
            if target_class.is_some() || target_user.is_some() {
                Err("schoolwide events carry no targets")
            } else {
                Ok(())
            }
        }
        _ => Err("unsupported visibility scope"),
    }
}
