//! Scheduled exam-reminder generation, invoked by an external trigger.

use crate::events::models::Event;
use crate::models::{AppState, ErrorResponse};
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

/// An exam qualifies when it starts after `now` but no later than the
/// lookahead horizon.
pub fn in_lookahead(start_at: DateTime<Utc>, now: DateTime<Utc>, hours: i64) -> bool {
    start_at > now && start_at <= now + Duration::hours(hours)
}

/// Students still owed a reminder: enrolled, not yet notified for this
/// exam, duplicates collapsed. Running the planner against a complete
/// notified-set yields an empty plan.
pub fn plan_reminders(enrolled: &[i32], already_notified: &HashSet<i32>) -> Vec<i32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for &student in enrolled {
        if !already_notified.contains(&student) && seen.insert(student) {
            out.push(student);
        }
    }
    out
}

pub fn reminder_message(title: &str, start_at: DateTime<Utc>) -> String {
    format!(
        "Upcoming exam: {} on {}",
        title,
        start_at.format("%Y-%m-%d %H:%M UTC")
    )
}

#[get("/api/cron/generate-alerts")]
pub async fn generate_alerts(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    // the shared secret gates everything; no work before this check
    match bearer_token(&req) {
        Some(token) if token == data.config.cron_secret => {}
        _ => {
            return HttpResponse::Unauthorized().json(ErrorResponse {
                error: "Invalid cron secret".to_string(),
                details: None,
            })
        }
    }

    let now = Utc::now();
    let hours = data.config.alert_lookahead_hours;
    let horizon = now + Duration::hours(hours);

    let exams = match sqlx::query_as::<_, Event>(
        "SELECT id, title, description, event_type, visibility_scope, start_at, end_at,
                created_by, target_class, target_user, metadata, created_at
         FROM events
         WHERE event_type = 'exam' AND start_at > $1 AND start_at <= $2
         ORDER BY start_at",
    )
    .bind(now)
    .bind(horizon)
    .fetch_all(&data.pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("❌ scanning exam events: {:?}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                details: None,
            });
        }
    };

    let mut exams_scanned = 0u32;
    let mut reminders_created = 0u64;
    let mut errors: Vec<String> = Vec::new();

    for exam in exams.into_iter().filter(|e| in_lookahead(e.start_at, now, hours)) {
        exams_scanned += 1;

        let class_id = match exam.target_class {
            Some(class_id) => class_id,
            None => {
                tracing::warn!("exam {} has no target class, skipping", exam.id);
                errors.push(format!("exam {}: no target class", exam.id));
                continue;
            }
        };

        let enrolled = match sqlx::query_scalar::<_, i32>(
            "SELECT student_id FROM enrollments WHERE class_id = $1",
        )
        .bind(class_id)
        .fetch_all(&data.pool)
        .await
        {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("❌ enrollment lookup for exam {}: {:?}", exam.id, e);
                errors.push(format!("exam {}: enrollment lookup failed", exam.id));
                continue;
            }
        };

        let already_notified: HashSet<i32> = match sqlx::query_scalar::<_, i32>(
            "SELECT user_id FROM notifications WHERE event_id = $1",
        )
        .bind(exam.id)
        .fetch_all(&data.pool)
        .await
        {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::error!("❌ reminder lookup for exam {}: {:?}", exam.id, e);
                errors.push(format!("exam {}: reminder lookup failed", exam.id));
                continue;
            }
        };

        let message = reminder_message(&exam.title, exam.start_at);
        for student in plan_reminders(&enrolled, &already_notified) {
            let res = sqlx::query(
                "INSERT INTO notifications
                     (user_id, event_id, kind, alert_type, title, message, status, metadata)
                 VALUES ($1, $2, 'notification', 'exam_reminder', $3, $4, 'unread', '{}'::jsonb)
                 ON CONFLICT (event_id, user_id) DO NOTHING",
            )
            .bind(student)
            .bind(exam.id)
            .bind(&exam.title)
            .bind(&message)
            .execute(&data.pool)
            .await;

            match res {
                Ok(r) => reminders_created += r.rows_affected(),
                Err(e) => {
                    tracing::error!(
                        "❌ reminder for exam {} / student {}: {:?}",
                        exam.id,
                        student,
                        e
                    );
                    errors.push(format!("exam {}: student {} failed", exam.id, student));
                }
            }
        }
    }

    tracing::info!(
        "✅ reminder sweep: {} exams scanned, {} reminders created, {} errors",
        exams_scanned,
        reminders_created,
        errors.len()
    );

    HttpResponse::Ok().json(serde_json::json!({
        "success": errors.is_empty(),
        "exams_scanned": exams_scanned,
        "reminders_created": reminders_created,
        "errors": errors,
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_alerts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn lookahead_window_bounds() {
        let now = Utc::now();
        assert!(in_lookahead(now + Duration::hours(26), now, 72));
        assert!(in_lookahead(now + Duration::hours(72), now, 72));
        assert!(!in_lookahead(now + Duration::hours(80), now, 72));
        assert!(!in_lookahead(now - Duration::hours(1), now, 72));
        assert!(!in_lookahead(now, now, 72));
    }

    #[test]
    fn planner_skips_notified_students_and_duplicates() {
        let already: HashSet<i32> = [2].into_iter().collect();
        assert_eq!(plan_reminders(&[1, 2, 3, 1], &already), vec![1, 3]);
    }

    #[test]
    fn second_run_plans_nothing() {
        let enrolled = [4, 5];
        let first = plan_reminders(&enrolled, &HashSet::new());
        assert_eq!(first, vec![4, 5]);

        let after_first: HashSet<i32> = first.into_iter().collect();
        assert!(plan_reminders(&enrolled, &after_first).is_empty());
    }

    #[test]
    fn bearer_parsing() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer sekrit"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("sekrit"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic sekrit"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn reminder_message_names_the_exam() {
        let when = DateTime::parse_from_rfc3339("2026-03-05T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            reminder_message("Algebra midterm", when),
            "Upcoming exam: Algebra midterm on 2026-03-05 09:00 UTC"
        );
    }
}
