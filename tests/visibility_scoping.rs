use backcolegio::events::models::{Event, EventType};
use backcolegio::identity::models::Role;
use backcolegio::visibility::{resolve_visibility, EventFilter, Scope, VisibilityContext};
use chrono::Utc;

fn event(
    id: i32,
    event_type: EventType,
    scope: &str,
    created_by: i32,
    target_class: Option<i32>,
) -> Event {
    Event {
        id,
        title: format!("event {}", id),
        description: None,
        event_type,
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

/// A canned calendar: one personal note of student 1, one lesson for class
/// 10, one for class 20, and one schoolwide announcement.
fn calendar() -> Vec<Event> {
    vec![
        event(1, EventType::Personal, "personal", 1, None),
        event(2, EventType::Lesson, "class", 50, Some(10)),
        event(3, EventType::Lesson, "class", 50, Some(20)),
        event(4, EventType::ClassAnnouncement, "schoolwide", 99, None),
    ]
}

fn visible_ids(filter: &EventFilter, rows: &[Event]) -> Vec<i32> {
    rows.iter()
        .filter(|e| filter.matches(e))
        .map(|e| e.id)
        .collect()
}

#[test]
fn student_sees_only_their_enrolled_class() {
    let rows = calendar();
    let ctx = VisibilityContext {
        requester_id: 2,
        enrolled_classes: vec![10],
        explicit_class: None,
    };
    let filter = resolve_visibility(Role::Student, Scope::Class, &ctx);
    assert_eq!(visible_ids(&filter, &rows), vec![2]);
}

#[test]
fn another_user_never_sees_a_personal_event() {
    let rows = calendar();
    for requester in [2, 50, 99] {
        let ctx = VisibilityContext {
            requester_id: requester,
            enrolled_classes: vec![10, 20],
            explicit_class: None,
        };
        let filter = resolve_visibility(Role::Student, Scope::Personal, &ctx);
        assert!(
            !visible_ids(&filter, &rows).contains(&1),
            "requester {} must not see event 1",
            requester
        );
    }

    let owner_ctx = VisibilityContext {
        requester_id: 1,
        enrolled_classes: vec![],
        explicit_class: None,
    };
    let filter = resolve_visibility(Role::Student, Scope::Personal, &owner_ctx);
    assert_eq!(visible_ids(&filter, &rows), vec![1]);
}

#[test]
fn schoolwide_scope_reaches_every_principal() {
    let rows = calendar();
    for (role, requester) in [(Role::Student, 2), (Role::Teacher, 50), (Role::Admin, 99)] {
        let ctx = VisibilityContext {
            requester_id: requester,
            enrolled_classes: vec![],
            explicit_class: None,
        };
        let filter = resolve_visibility(role, Scope::Schoolwide, &ctx);
        assert_eq!(visible_ids(&filter, &rows), vec![4]);
    }
}

#[test]
fn unknown_scope_returns_no_rows() {
    let rows = calendar();
    let ctx = VisibilityContext {
        requester_id: 99,
        enrolled_classes: vec![10, 20],
        explicit_class: Some(10),
    };
    let filter = resolve_visibility(Role::Admin, Scope::parse("batch"), &ctx);
    assert!(visible_ids(&filter, &rows).is_empty());

    let filter = resolve_visibility(Role::Admin, Scope::parse("everything"), &ctx);
    assert!(visible_ids(&filter, &rows).is_empty());
}

#[test]
fn teacher_inspects_a_named_class() {
    let rows = calendar();
    let ctx = VisibilityContext {
        requester_id: 50,
        enrolled_classes: vec![],
        explicit_class: Some(20),
    };
    let filter = resolve_visibility(Role::Teacher, Scope::Class, &ctx);
    assert_eq!(visible_ids(&filter, &rows), vec![3]);
}
