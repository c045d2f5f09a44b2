use backcolegio::cron::{in_lookahead, plan_reminders, reminder_message};
use chrono::{Duration, Utc};
use std::collections::HashSet;

// An exam 26 hours out, two enrolled students, a 72-hour window. The
// first sweep plans two reminders; a second sweep inside the same window
// plans none.
#[test]
fn exam_within_window_gets_two_reminders_once() {
    let now = Utc::now();
    let exam_start = now + Duration::hours(26);
    assert!(in_lookahead(exam_start, now, 72));

    let enrolled = [11, 12];
    let first_run = plan_reminders(&enrolled, &HashSet::new());
    assert_eq!(first_run, vec![11, 12]);

    let notified: HashSet<i32> = first_run.into_iter().collect();
    let second_run = plan_reminders(&enrolled, &notified);
    assert!(second_run.is_empty(), "second sweep must create nothing");
}

#[test]
fn exams_outside_the_window_are_ignored() {
    let now = Utc::now();
    assert!(!in_lookahead(now + Duration::hours(80), now, 72));
    assert!(!in_lookahead(now - Duration::hours(2), now, 72));
    assert!(in_lookahead(now + Duration::hours(1), now, 24));
}

#[test]
fn newly_enrolled_students_are_picked_up_by_a_later_sweep() {
    let notified: HashSet<i32> = [11, 12].into_iter().collect();
    let enrolled_after_transfer = [11, 12, 13];
    assert_eq!(plan_reminders(&enrolled_after_transfer, &notified), vec![13]);
}

#[test]
fn reminder_text_carries_title_and_start() {
    let when = Utc::now() + Duration::hours(26);
    let message = reminder_message("Chemistry final", when);
    assert!(message.contains("Chemistry final"));
    assert!(message.starts_with("Upcoming exam:"));
}
