use crate::broadcast::models::*;
use crate::events::models::{Event, EventType};
use crate::events::routes::notify_events_changed;
use crate::identity::models::Role;
use crate::identity::routes::{require_role, resolve_principal};
use crate::models::{db_error, AppState, ErrorResponse};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use sqlx::PgPool;

const EVENT_COLUMNS: &str = "id, title, description, event_type, visibility_scope, start_at, \
     end_at, created_by, target_class, target_user, metadata, created_at";

#[post("/api/broadcast")]
pub async fn submit_broadcast(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<BroadcastIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin, Role::Teacher]) {
        return resp;
    }

    let target = match resolve_target(&body.visibility_scope, body.target_class, body.target_user)
    {
        Ok(t) => t,
        Err(reason) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid broadcast".to_string(),
                details: Some(reason.to_string()),
            })
        }
    };

    // 1. resolve recipients under the same scope semantics as event reads
    let candidates = match target {
        BroadcastTarget::Class(class_id) => {
            let students = match sqlx::query_scalar::<_, i32>(
                "SELECT student_id FROM enrollments WHERE class_id = $1",
            )
            .bind(class_id)
            .fetch_all(&data.pool)
            .await
            {
                Ok(ids) => ids,
                Err(e) => return db_error("loading class roster", e),
            };

            let mut all = students;
            if data.config.broadcast_include_class_teachers {
                match sqlx::query_scalar::<_, Option<i32>>(
                    "SELECT teacher_id FROM classes WHERE id = $1",
                )
                .bind(class_id)
                .fetch_optional(&data.pool)
                .await
                {
                    Ok(Some(Some(teacher_id))) => all.push(teacher_id),
                    Ok(_) => {}
                    Err(e) => return db_error("loading class teacher", e),
                }
            }
            all
        }
        BroadcastTarget::All => {
            match sqlx::query_scalar::<_, i32>("SELECT id FROM profiles")
                .fetch_all(&data.pool)
                .await
            {
                Ok(ids) => ids,
                Err(e) => return db_error("loading profiles", e),
            }
        }
        BroadcastTarget::User(user_id) => {
            match sqlx::query_scalar::<_, i32>("SELECT id FROM profiles WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&data.pool)
                .await
            {
                Ok(Some(_)) => vec![user_id],
                Ok(None) => {
                    return HttpResponse::BadRequest().json(ErrorResponse {
                        error: "Target user not found".to_string(),
                        details: None,
                    })
                }
                Err(e) => return db_error("checking target user", e),
            }
        }
    };

    let recipients = plan_recipients(candidates, profile.id);

    // 2. the broadcast event itself, or the existing one when resuming
    let event = if let Some(broadcast_id) = body.broadcast_id {
        match sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE id = $1 AND event_type IN ('broadcast', 'urgent_broadcast')"
        ))
        .bind(broadcast_id)
        .fetch_optional(&data.pool)
        .await
        {
            Ok(Some(event)) => event,
            Ok(None) => {
                return HttpResponse::NotFound().json(ErrorResponse {
                    error: "Broadcast not found".to_string(),
                    details: None,
                })
            }
            Err(e) => return db_error("loading broadcast event", e),
        }
    } else {
        let (target_class, target_user) = match target {
            BroadcastTarget::Class(c) => (Some(c), None),
            BroadcastTarget::All => (None, None),
            BroadcastTarget::User(u) => (None, Some(u)),
        };
        match sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events
                 (title, description, event_type, visibility_scope, start_at,
                  created_by, target_class, target_user, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, '{{}}'::jsonb)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&body.title)
        .bind(&body.message)
        .bind(event_type_for(body.is_urgent))
        .bind(target.scope_str())
        .bind(Utc::now())
        .bind(profile.id)
        .bind(target_class)
        .bind(target_user)
        .fetch_one(&data.pool)
        .await
        {
            Ok(event) => event,
            Err(e) => return db_error("creating broadcast event", e),
        }
    };

    // 3. per-recipient delivery; one failure never stops the loop, and the
    //    (event_id, user_id) key keeps reruns from double-notifying
    let kind = body.notification_type.as_str();
    let mut errors: Vec<String> = Vec::new();
    for recipient in &recipients {
        let res = sqlx::query(
            "INSERT INTO notifications
                 (user_id, sender_id, event_id, kind, alert_type, title, message, status, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'unread', '{}'::jsonb)
             ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(recipient)
        .bind(profile.id)
        .bind(event.id)
        .bind(kind)
        .bind(&body.alert_type)
        .bind(&body.title)
        .bind(&body.message)
        .execute(&data.pool)
        .await;

        if let Err(e) = res {
            tracing::error!("delivery to user {} failed: {:?}", recipient, e);
            errors.push(format!("user {}: delivery failed", recipient));
        }
    }

    // 4. audit metadata reflects rows actually present, not rows attempted
    let sent_to = match committed_count(&data.pool, event.id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting deliveries", e),
    };

    if let Err(e) = sqlx::query(
        "UPDATE events
         SET metadata = metadata || jsonb_build_object('sent_to', $1::bigint, 'sender_role', $2::text)
         WHERE id = $3",
    )
    .bind(sent_to)
    .bind(profile.role.to_string())
    .bind(event.id)
    .execute(&data.pool)
    .await
    {
        return db_error("recording broadcast audit metadata", e);
    }

    notify_events_changed(&data.pool, event.id).await;
    tracing::info!(
        "✅ broadcast {}: {} of {} recipients notified",
        event.id,
        sent_to,
        recipients.len()
    );

    HttpResponse::Created().json(serde_json::json!({
        "success": errors.is_empty(),
        "event_id": event.id,
        "event_type": event.event_type,
        "sent_to": sent_to,
        "attempted": recipients.len(),
        "errors": errors,
    }))
}

/// Admin/teacher audit view: the event row plus its delivered count.
#[get("/api/broadcast/{id}")]
pub async fn get_broadcast(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin, Role::Teacher]) {
        return resp;
    }
    let broadcast_id = path.into_inner();

    let event = match sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE id = $1 AND event_type IN ('broadcast', 'urgent_broadcast')"
    ))
    .bind(broadcast_id)
    .fetch_optional(&data.pool)
    .await
    {
        Ok(Some(event)) => event,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Broadcast not found".to_string(),
                details: None,
            })
        }
        Err(e) => return db_error("loading broadcast event", e),
    };

    let delivered = match committed_count(&data.pool, broadcast_id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting deliveries", e),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "event": event,
        "delivered": delivered,
    }))
}

async fn committed_count(pool: &PgPool, event_id: i32) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_broadcast).service(get_broadcast);
}
