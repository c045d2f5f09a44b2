use crate::classes::models::*;
use crate::identity::models::Role;
use crate::identity::routes::{require_role, resolve_principal};
use crate::models::{db_error, AppState, ErrorResponse};
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use sqlx::PgPool;

#[get("/api/classes")]
pub async fn list_classes(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = resolve_principal(&req, &data.pool).await {
        return resp;
    }

    match sqlx::query_as::<_, Class>(
        "SELECT id, name, capacity, teacher_id FROM classes ORDER BY name",
    )
    .fetch_all(&data.pool)
    .await
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => db_error("listing classes", e),
    }
}

#[post("/api/classes")]
pub async fn create_class(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewClassIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin]) {
        return resp;
    }
    if body.capacity < 0 {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid class".to_string(),
            details: Some("capacity must be non-negative".to_string()),
        });
    }

    match sqlx::query_as::<_, Class>(
        "INSERT INTO classes (name, capacity, teacher_id) VALUES ($1, $2, $3)
         RETURNING id, name, capacity, teacher_id",
    )
    .bind(&body.name)
    .bind(body.capacity)
    .bind(body.teacher_id)
    .fetch_one(&data.pool)
    .await
    {
        Ok(class) => HttpResponse::Created().json(class),
        Err(e) => db_error("creating class", e),
    }
}

#[get("/api/classes/capacity")]
pub async fn get_capacity(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CapacityQuery>,
) -> impl Responder {
    if let Err(resp) = resolve_principal(&req, &data.pool).await {
        return resp;
    }

    let class = match sqlx::query_as::<_, Class>(
        "SELECT id, name, capacity, teacher_id FROM classes WHERE id = $1",
    )
    .bind(query.class_id)
    .fetch_optional(&data.pool)
    .await
    {
        Ok(Some(class)) => class,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Class not found".to_string(),
                details: None,
            })
        }
        Err(e) => return db_error("loading class", e),
    };

    let enrolled = match enrolled_count(&data.pool, class.id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting enrollment", e),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "class_id": class.id,
        "name": class.name,
        "capacity": class.capacity,
        "enrolled": enrolled,
    }))
}

#[put("/api/classes/capacity")]
pub async fn update_capacity(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CapacityQuery>,
    body: web::Json<CapacityIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Teacher]) {
        return resp;
    }

    // read-then-write; concurrent edits are last-writer-wins
    let enrolled = match enrolled_count(&data.pool, query.class_id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting enrollment", e),
    };

    if let Err(reason) = capacity_update_allowed(body.capacity, enrolled) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid capacity".to_string(),
            details: Some(reason),
        });
    }

    match sqlx::query_as::<_, Class>(
        "UPDATE classes SET capacity = $1 WHERE id = $2
         RETURNING id, name, capacity, teacher_id",
    )
    .bind(body.capacity)
    .bind(query.class_id)
    .fetch_optional(&data.pool)
    .await
    {
        Ok(Some(class)) => HttpResponse::Ok().json(class),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Class not found".to_string(),
            details: None,
        }),
        Err(e) => db_error("updating capacity", e),
    }
}

#[get("/api/classes/{id}/students")]
pub async fn list_roster(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> impl Responder {
    if let Err(resp) = resolve_principal(&req, &data.pool).await {
        return resp;
    }
    let class_id = path.into_inner();

    let rows = sqlx::query_as::<_, (i32, Option<String>, Option<String>)>(
        "SELECT p.id, p.full_name, p.email
         FROM enrollments e
         JOIN profiles p ON p.id = e.student_id
         WHERE e.class_id = $1
         ORDER BY p.full_name",
    )
    .bind(class_id)
    .fetch_all(&data.pool)
    .await;

    match rows {
        Ok(rows) => {
            let roster: Vec<_> = rows
                .into_iter()
                .map(|(id, full_name, email)| {
                    serde_json::json!({ "id": id, "full_name": full_name, "email": email })
                })
                .collect();
            HttpResponse::Ok().json(roster)
        }
        Err(e) => db_error("listing roster", e),
    }
}

#[post("/api/classes/{id}/students")]
pub async fn enroll_student(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<EnrollIn>,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin, Role::Teacher]) {
        return resp;
    }
    let class_id = path.into_inner();

    let capacity = match sqlx::query_scalar::<_, i32>("SELECT capacity FROM classes WHERE id = $1")
        .bind(class_id)
        .fetch_optional(&data.pool)
        .await
    {
        Ok(Some(capacity)) => capacity,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Class not found".to_string(),
                details: None,
            })
        }
        Err(e) => return db_error("loading class", e),
    };

    // same read-then-write gap as the capacity update
    let enrolled = match enrolled_count(&data.pool, class_id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting enrollment", e),
    };
    if enrolled >= i64::from(capacity) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Class is at capacity".to_string(),
            details: Some(format!("{} of {} seats taken", enrolled, capacity)),
        });
    }

    let res = sqlx::query(
        "INSERT INTO enrollments (class_id, student_id) VALUES ($1, $2)
         ON CONFLICT (class_id, student_id) DO NOTHING",
    )
    .bind(class_id)
    .bind(body.student_id)
    .execute(&data.pool)
    .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "class_id": class_id,
            "student_id": body.student_id,
        })),
        Ok(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Already enrolled".to_string(),
            details: None,
        }),
        Err(e) => db_error("enrolling student", e),
    }
}

#[post("/api/classes/{id}/students/import_csv")]
pub async fn import_roster_csv(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i32>,
    mut payload: Multipart,
) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&profile, &[Role::Admin]) {
        return resp;
    }
    let class_id = path.into_inner();

    let mut csv_data = Vec::new();
    while let Some(field_result) = payload.next().await {
        match field_result {
            Ok(mut field) => {
                while let Some(chunk_result) = field.next().await {
                    match chunk_result {
                        Ok(chunk) => csv_data.extend_from_slice(&chunk),
                        Err(e) => {
                            return HttpResponse::BadRequest().json(ErrorResponse {
                                error: "Error reading upload".to_string(),
                                details: Some(e.to_string()),
                            });
                        }
                    }
                }
                break;
            }
            Err(e) => {
                return HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Error reading upload".to_string(),
                    details: Some(e.to_string()),
                });
            }
        }
    }

    let content = String::from_utf8_lossy(&csv_data);
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 2 {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "File must have a header and at least one student".to_string(),
            details: None,
        });
    }

    let header = lines[0].to_lowercase();
    if !header.contains("email") {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "File must have an 'email' column".to_string(),
            details: None,
        });
    }

    let capacity = match sqlx::query_scalar::<_, i32>("SELECT capacity FROM classes WHERE id = $1")
        .bind(class_id)
        .fetch_optional(&data.pool)
        .await
    {
        Ok(Some(capacity)) => capacity,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Class not found".to_string(),
                details: None,
            })
        }
        Err(e) => return db_error("loading class", e),
    };

    let mut enrolled = match enrolled_count(&data.pool, class_id).await {
        Ok(n) => n,
        Err(e) => return db_error("counting enrollment", e),
    };

    let mut successes: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate().skip(1) {
        let email = line.trim();

        if enrolled >= i64::from(capacity) {
            errors.push(format!("row {}: class is at capacity", i + 1));
            continue;
        }

        let student_id = match sqlx::query_scalar::<_, i32>(
            "SELECT id FROM profiles WHERE email = $1 AND role = 'student'",
        )
        .bind(email)
        .fetch_optional(&data.pool)
        .await
        {
            Ok(Some(id)) => id,
            Ok(None) => {
                errors.push(format!("{}: no student profile", email));
                continue;
            }
            Err(e) => {
                tracing::error!("profile lookup for '{}': {:?}", email, e);
                errors.push(format!("{}: lookup failed", email));
                continue;
            }
        };

        let res = sqlx::query(
            "INSERT INTO enrollments (class_id, student_id) VALUES ($1, $2)
             ON CONFLICT (class_id, student_id) DO NOTHING",
        )
        .bind(class_id)
        .bind(student_id)
        .execute(&data.pool)
        .await;

        match res {
            Ok(r) if r.rows_affected() > 0 => {
                enrolled += 1;
                successes.push(email.to_string());
            }
            Ok(_) => errors.push(format!("{}: already enrolled", email)),
            Err(e) => {
                tracing::error!("enrolling '{}': {:?}", email, e);
                errors.push(format!("{}: enrollment failed", email));
            }
        }
    }

    HttpResponse::Ok().json(serde_json::json!({
        "imported": successes.len(),
        "successes": successes,
        "errors": errors,
    }))
}

async fn enrolled_count(pool: &PgPool, class_id: i32) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE class_id = $1")
        .bind(class_id)
        .fetch_one(pool)
        .await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_classes)
        .service(create_class)
        .service(get_capacity)
        .service(update_capacity)
        .service(list_roster)
        .service(enroll_student)
        .service(import_roster_csv);
}
