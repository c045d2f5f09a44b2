use crate::events::models::EventType;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Notification,
    Alert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Notification => "notification",
            NotificationKind::Alert => "alert",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BroadcastIn {
    /// Set to resume fan-out for an already-created broadcast event after a
    /// partial failure; recipients already notified are skipped.
    pub broadcast_id: Option<i32>,
    pub title: String,
    pub message: String,
    pub visibility_scope: String,
    pub target_class: Option<i32>,
    pub target_user: Option<i32>,
    pub notification_type: NotificationKind,
    pub alert_type: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastTarget {
    Class(i32),
    All,
    User(i32),
}

impl BroadcastTarget {
    /// Scope string stored on the derived event row.
    pub fn scope_str(&self) -> &'static str {
        match self {
            BroadcastTarget::Class(_) => "class",
            BroadcastTarget::All => "schoolwide",
            BroadcastTarget::User(_) => "personal",
        }
    }
}

pub fn resolve_target(
    scope: &str,
    target_class: Option<i32>,
    target_user: Option<i32>,
) -> Result<BroadcastTarget, &'static str> {
    match scope.trim().to_lowercase().as_str() {
        "class" => match (target_class, target_user) {
            (Some(class_id), None) => Ok(BroadcastTarget::Class(class_id)),
            (None, _) => Err("class scope requires target_class"),
            (Some(_), Some(_)) => Err("class scope does not take target_user"),
        },
        "all" | "schoolwide" => {
            if target_class.is_some() || target_user.is_some() {
                Err("schoolwide scope carries no targets")
            } else {
                Ok(BroadcastTarget::All)
            }
        }
        "user" => match (target_user, target_class) {
            (Some(user_id), None) => Ok(BroadcastTarget::User(user_id)),
            (None, _) => Err("user scope requires target_user"),
            (Some(_), Some(_)) => Err("user scope does not take target_class"),
        },
        _ => Err("unsupported broadcast scope"),
    }
}

pub fn event_type_for(is_urgent: bool) -> EventType {
    if is_urgent {
        EventType::UrgentBroadcast
    } else {
        EventType::Broadcast
    }
}

/// Order-preserving dedupe with the sender taken out; the result length is
/// what `sent_to` should converge to once every insert lands.
pub fn plan_recipients(candidates: Vec<i32>, sender_id: i32) -> Vec<i32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in candidates {
        if id != sender_id && seen.insert(id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_target_requires_class_id() {
        assert_eq!(
            resolve_target("class", Some(3), None),
            Ok(BroadcastTarget::Class(3))
        );
        assert!(resolve_target("class", None, None).is_err());
        assert!(resolve_target("class", Some(3), Some(4)).is_err());
    }

    #[test]
    fn schoolwide_spellings_and_user_target() {
        assert_eq!(resolve_target("all", None, None), Ok(BroadcastTarget::All));
        assert_eq!(
            resolve_target("schoolwide", None, None),
            Ok(BroadcastTarget::All)
        );
        assert_eq!(
            resolve_target("user", None, Some(9)),
            Ok(BroadcastTarget::User(9))
        );
        assert!(resolve_target("user", None, None).is_err());
        assert!(resolve_target("batch", None, None).is_err());
    }

    #[test]
    fn urgency_picks_the_event_type() {
        assert_eq!(event_type_for(false), EventType::Broadcast);
        assert_eq!(event_type_for(true), EventType::UrgentBroadcast);
    }

    #[test]
    fn recipients_dedupe_and_drop_the_sender() {
        let plan = plan_recipients(vec![5, 6, 5, 7, 1, 6], 1);
        assert_eq!(plan, vec![5, 6, 7]);
    }

    #[test]
    fn three_students_plan_three_deliveries() {
        let plan = plan_recipients(vec![11, 12, 13], 2);
        assert_eq!(plan.len(), 3);
    }
}
