use backcolegio::broadcast::models::{
    event_type_for, plan_recipients, resolve_target, BroadcastTarget,
};
use backcolegio::events::models::EventType;

// Fire-drill scenario: a teacher targets class C1 with three enrolled
// students. The plan must hold exactly one delivery per student, and the
// `sent_to` audit figure converges to the plan length once every insert
// lands.
#[test]
fn class_broadcast_plans_one_delivery_per_student() {
    let sender = 9;
    let students = vec![1, 2, 3];

    let target = resolve_target("class", Some(7), None).unwrap();
    assert_eq!(target, BroadcastTarget::Class(7));

    let plan = plan_recipients(students, sender);
    assert_eq!(plan, vec![1, 2, 3]);
    assert_eq!(plan.len(), 3, "sent_to must equal the enrolled count");
}

#[test]
fn urgent_flag_switches_the_event_type() {
    assert_eq!(event_type_for(true), EventType::UrgentBroadcast);
    assert_eq!(event_type_for(false), EventType::Broadcast);
}

#[test]
fn class_teacher_joins_the_fanout_only_when_configured() {
    let sender = 99;
    let students = vec![1, 2, 3];
    let class_teacher = 9;

    // flag off: roster only
    let plan = plan_recipients(students.clone(), sender);
    assert_eq!(plan.len(), 3);

    // flag on: the handler appends the class teacher before planning
    let mut with_teacher = students;
    with_teacher.push(class_teacher);
    let plan = plan_recipients(with_teacher, sender);
    assert_eq!(plan, vec![1, 2, 3, 9]);
}

#[test]
fn sender_never_notifies_themselves() {
    // the sending teacher is also the class teacher
    let sender = 9;
    let plan = plan_recipients(vec![1, 2, 3, 9], sender);
    assert_eq!(plan, vec![1, 2, 3]);
}

#[test]
fn duplicate_enrollment_rows_collapse() {
    let plan = plan_recipients(vec![1, 1, 2, 2, 3], 99);
    assert_eq!(plan, vec![1, 2, 3]);
}

#[test]
fn resuming_replans_the_same_recipients() {
    // resuming fan-out after a crash: the same ids come back, every
    // recipient already holds a row keyed by (event_id, user_id), and the
    // conflict-skipping insert leaves the committed count unchanged
    let first = plan_recipients(vec![1, 2, 3], 9);
    let second = plan_recipients(vec![1, 2, 3], 9);
    assert_eq!(first, second);
}

#[test]
fn target_validation_rejects_mixed_targets() {
    assert!(resolve_target("class", Some(1), Some(2)).is_err());
    assert!(resolve_target("user", Some(1), Some(2)).is_err());
    assert!(resolve_target("all", Some(1), None).is_err());
    assert_eq!(resolve_target("user", None, Some(4)), Ok(BroadcastTarget::User(4)));
}
