use crate::identity::models::{Profile, Role};
use crate::identity::routes::{require_role, resolve_principal};
use crate::models::{db_error, AppState, ErrorResponse};
use crate::notifications::models::*;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};

const NOTIFICATION_COLUMNS: &str = "id, user_id, sender_id, event_id, kind, alert_type, title, \
     message, status, metadata, created_at";

async fn list_kind(
    data: &AppState,
    profile: &Profile,
    kind: &str,
    query: &ListQuery,
) -> HttpResponse {
    let limit = effective_limit(query.limit);
    let rows = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = $1 AND kind = $2
           AND ($3::notification_status IS NULL OR status = $3)
           AND ($4::text IS NULL OR alert_type = $4)
         ORDER BY created_at DESC
         LIMIT $5"
    ))
    .bind(profile.id)
    .bind(kind)
    .bind(query.status)
    .bind(&query.alert_type)
    .bind(limit)
    .fetch_all(&data.pool)
    .await;

    match rows {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => db_error("listing notifications", e),
    }
}

async fn create_kind(
    data: &AppState,
    profile: &Profile,
    kind: &str,
    body: &NewNotificationIn,
) -> HttpResponse {
    let rec = sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications
             (user_id, sender_id, kind, alert_type, title, message, status, metadata)
         VALUES ($1, $2, $3, $4, $5, $6, 'unread', COALESCE($7, '{{}}'::jsonb))
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(body.user_id)
    .bind(profile.id)
    .bind(kind)
    .bind(&body.alert_type)
    .bind(&body.title)
    .bind(&body.message)
    .bind(&body.metadata)
    .fetch_one(&data.pool)
    .await;

    match rec {
        Ok(row) => HttpResponse::Created().json(row),
        Err(e) => db_error("creating notification", e),
    }
}

async fn patch_kind(
    data: &AppState,
    profile: &Profile,
    kind: &str,
    id: i32,
    status: StatusTransition,
) -> HttpResponse {
    // owner-only; a foreign id reads the same as a missing one
    let rec = sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET status = $1
         WHERE id = $2 AND user_id = $3 AND kind = $4
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(status)
    .bind(id)
    .bind(profile.id)
    .bind(kind)
    .fetch_optional(&data.pool)
    .await;

    match rec {
        Ok(Some(row)) => HttpResponse::Ok().json(row),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Notification not found".to_string(),
            details: None,
        }),
        Err(e) => db_error("updating notification status", e),
    }
}

async fn delete_kind(data: &AppState, profile: &Profile, kind: &str, id: i32) -> HttpResponse {
    let result = if profile.role == Role::Admin {
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind)
            .execute(&data.pool)
            .await
    } else {
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND kind = $2 AND user_id = $3")
            .bind(id)
            .bind(kind)
            .bind(profile.id)
            .execute(&data.pool)
            .await
    };

    match result {
        Ok(r) if r.rows_affected() > 0 => HttpResponse::NoContent().finish(),
        Ok(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Notification not found".to_string(),
            details: None,
        }),
        Err(e) => db_error("deleting notification", e),
    }
}

#[get("/api/notifications")]
pub async fn list_notifications(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => list_kind(data.get_ref(), &profile, "notification", &*query).await,
        Err(resp) => resp,
    }
}

#[post("/api/notifications")]
pub async fn create_notification(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewNotificationIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin, Role::Teacher]) {
        return resp;
    }
    create_kind(data.get_ref(), &profile, "notification", &*body).await
}

#[patch("/api/notifications/{id}")]
pub async fn update_notification(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<StatusPatchIn>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => {
            patch_kind(data.get_ref(), &profile, "notification", path.into_inner(), body.status).await
        }
        Err(resp) => resp,
    }
}

#[delete("/api/notifications/{id}")]
pub async fn delete_notification(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => delete_kind(data.get_ref(), &profile, "notification", path.into_inner()).await,
        Err(resp) => resp,
    }
}

#[get("/api/alerts")]
pub async fn list_alerts(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => list_kind(data.get_ref(), &profile, "alert", &*query).await,
        Err(resp) => resp,
    }
}

#[post("/api/alerts")]
pub async fn create_alert(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewNotificationIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin, Role::Teacher]) {
        return resp;
    }
    create_kind(data.get_ref(), &profile, "alert", &*body).await
}

#[patch("/api/alerts/{id}")]
pub async fn update_alert(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<StatusPatchIn>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => patch_kind(data.get_ref(), &profile, "alert", path.into_inner(), body.status).await,
        Err(resp) => resp,
    }
}

#[delete("/api/alerts/{id}")]
pub async fn delete_alert(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> impl Responder {
    match resolve_principal(&req, &data.pool).await {
        Ok(profile) => delete_kind(data.get_ref(), &profile, "alert", path.into_inner()).await,
        Err(resp) => resp,
    }
}

/// Recipient-side acknowledgement of a broadcast: flips the caller's own
/// fan-out row for event `{id}`, whichever kind it was delivered as.
#[patch("/api/broadcast/{id}/status")]
pub async fn update_broadcast_status(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<StatusPatchIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let event_id = path.into_inner();

    let rec = sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET status = $1
         WHERE event_id = $2 AND user_id = $3
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(body.status)
    .bind(event_id)
    .bind(profile.id)
    .fetch_optional(&data.pool)
    .await;

    match rec {
        Ok(Some(row)) => HttpResponse::Ok().json(row),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: "No broadcast delivery for this user".to_string(),
            details: None,
        }),
        Err(e) => db_error("updating broadcast status", e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_notifications)
        .service(create_notification)
        .service(update_notification)
        .service(delete_notification)
        .service(list_alerts)
        .service(create_alert)
        .service(update_alert)
        .service(delete_alert)
        .service(update_broadcast_status);
}
