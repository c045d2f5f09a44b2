//! Who may see which calendar event.
//!
//! Scope resolution is a pure function from (role, scope, context) to a
//! tagged filter. Handlers map each filter variant onto its own query;
//! `matches` applies the same rule to an in-memory row. Anything the
//! resolver cannot map to a safe filter becomes `Deny`, never an
//! unfiltered read.

use crate::events::models::Event;
use crate::identity::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Personal,
    Class,
    Schoolwide,
    Role,
    Batch,
    Unknown,
}

impl Scope {
    pub fn parse(raw: &str) -> Scope {
        match raw.trim().to_lowercase().as_str() {
            "personal" => Scope::Personal,
            "class" => Scope::Class,
            "schoolwide" | "all" => Scope::Schoolwide,
            "role" => Scope::Role,
            "batch" => Scope::Batch,
            _ => Scope::Unknown,
        }
    }
}

/// Snapshot of everything the resolver needs about the requester. Supplied
/// from the store by handlers, canned by tests.
#[derive(Debug, Clone)]
pub struct VisibilityContext {
    pub requester_id: i32,
    pub enrolled_classes: Vec<i32>,
    pub explicit_class: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    CreatedBy(i32),
    ClassIn(Vec<i32>),
    Schoolwide,
    Deny,
}

pub fn resolve_visibility(role: Role, scope: Scope, ctx: &VisibilityContext) -> EventFilter {
    match scope {
        Scope::Personal => EventFilter::CreatedBy(ctx.requester_id),
        Scope::Class => match role {
            Role::Student => EventFilter::ClassIn(ctx.enrolled_classes.clone()),
            Role::Teacher | Role::Admin => match ctx.explicit_class {
                Some(class_id) => EventFilter::ClassIn(vec![class_id]),
                // no class named, no safe filter
                None => EventFilter::Deny,
            },
        },
        Scope::Schoolwide => EventFilter::Schoolwide,
        Scope::Role | Scope::Batch | Scope::Unknown => EventFilter::Deny,
    }
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventFilter::CreatedBy(requester) => {
                event.visibility_scope == "personal" && event.created_by == *requester
            }
            EventFilter::ClassIn(classes) => {
                event.visibility_scope == "class"
                    && event.target_class.map_or(false, |c| classes.contains(&c))
            }
            EventFilter::Schoolwide => {
                matches!(event.visibility_scope.as_str(), "schoolwide" | "all")
            }
            EventFilter::Deny => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::models::EventType;
    use chrono::Utc;

    fn event(scope: &str, created_by: i32, target_class: Option<i32>) -> Event {
        Event {
            id: 1,
            title: "test".to_string(),
            description: None,
            event_type: EventType::Lesson,
            visibility_scope: scope.to_string(),
            start_at: Utc::now(),
            end_at: None,
            created_by,
            target_class,
            target_user: None,
            metadata: serde_json::json!({}),
            created_at: None,
        }
    }

    fn ctx(requester_id: i32, enrolled: &[i32]) -> VisibilityContext {
        VisibilityContext {
            requester_id,
            enrolled_classes: enrolled.to_vec(),
            explicit_class: None,
        }
    }

    #[test]
    fn personal_event_is_invisible_to_other_users() {
        let owned_by_a = event("personal", 1, None);
        let filter_for_b = resolve_visibility(Role::Student, Scope::Personal, &ctx(2, &[]));
        assert!(!filter_for_b.matches(&owned_by_a));

        let filter_for_a = resolve_visibility(Role::Student, Scope::Personal, &ctx(1, &[]));
        assert!(filter_for_a.matches(&owned_by_a));
    }

    #[test]
    fn student_class_filter_is_exactly_the_enrollment_snapshot() {
        let filter = resolve_visibility(Role::Student, Scope::Class, &ctx(7, &[10, 11]));
        assert_eq!(filter, EventFilter::ClassIn(vec![10, 11]));

        assert!(filter.matches(&event("class", 99, Some(10))));
        assert!(filter.matches(&event("class", 99, Some(11))));
        assert!(!filter.matches(&event("class", 99, Some(12))));
        assert!(!filter.matches(&event("class", 99, None)));
    }

    #[test]
    fn teacher_class_scope_needs_an_explicit_class() {
        let mut context = ctx(3, &[]);
        assert_eq!(
            resolve_visibility(Role::Teacher, Scope::Class, &context),
            EventFilter::Deny
        );

        context.explicit_class = Some(5);
        assert_eq!(
            resolve_visibility(Role::Teacher, Scope::Class, &context),
            EventFilter::ClassIn(vec![5])
        );
    }

    #[test]
    fn schoolwide_filter_accepts_both_spellings() {
        let filter = resolve_visibility(Role::Student, Scope::Schoolwide, &ctx(1, &[]));
        assert!(filter.matches(&event("schoolwide", 99, None)));
        assert!(filter.matches(&event("all", 99, None)));
        assert!(!filter.matches(&event("class", 99, Some(1))));
    }

    #[test]
    fn unresolved_scopes_fail_closed() {
        let context = ctx(1, &[10]);
        for scope in ["role", "batch", "everything", ""] {
            let filter = resolve_visibility(Role::Admin, Scope::parse(scope), &context);
            assert_eq!(filter, EventFilter::Deny, "scope {:?} must deny", scope);
            assert!(!filter.matches(&event("schoolwide", 1, None)));
        }
    }

    #[test]
    fn class_filter_never_leaks_personal_events() {
        // a personal event whose creator happens to set a class id
        let sneaky = event("personal", 4, Some(10));
        let filter = resolve_visibility(Role::Student, Scope::Class, &ctx(7, &[10]));
        assert!(!filter.matches(&sneaky));
    }
}
