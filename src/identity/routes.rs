use crate::identity::models::*;
use crate::models::{db_error, ApiResponse, AppState, ErrorResponse};
use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse, Responder};
use sqlx::PgPool;

pub const SESSION_HEADER: &str = "X-Firebase-UID";

/// Principal id from the session header. 401 when absent or unreadable.
pub fn principal_uid(req: &HttpRequest) -> Result<String, HttpResponse> {
    match req.headers().get(SESSION_HEADER) {
        Some(value) => match value.to_str() {
            Ok(uid) if !uid.trim().is_empty() => Ok(uid.to_string()),
            _ => Err(HttpResponse::Unauthorized().json(ErrorResponse {
                error: "Not authenticated".to_string(),
                details: Some(format!("Invalid {} header", SESSION_HEADER)),
            })),
        },
        None => Err(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Not authenticated".to_string(),
            details: Some(format!("Missing {} header", SESSION_HEADER)),
        })),
    }
}

/// Resolve the calling session to its profile row. Every protected handler
/// calls this first and short-circuits on the error response.
pub async fn resolve_principal(
    req: &HttpRequest,
    pool: &PgPool,
) -> Result<Profile, HttpResponse> {
    let uid = principal_uid(req)?;

    match sqlx::query_as::<_, Profile>(
        "SELECT id, firebase_uid, email, full_name, role, class_id, created_at, last_login
         FROM profiles WHERE firebase_uid = $1",
    )
    .bind(&uid)
    .fetch_optional(pool)
    .await
    {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Not authenticated".to_string(),
            details: Some("No profile for this session".to_string()),
        })),
        Err(e) => Err(db_error("resolving principal", e)),
    }
}

pub fn require_role(profile: &Profile, allowed: &[Role]) -> Result<(), HttpResponse> {
    if allowed.contains(&profile.role) {
        Ok(())
    } else {
        Err(HttpResponse::Forbidden().json(ErrorResponse {
            error: "Forbidden".to_string(),
            details: Some(format!("Role '{}' is not allowed here", profile.role)),
        }))
    }
}

/// Insert-or-fetch-existing keyed on the session uid. Concurrent first
/// logins race into the unique constraint and both receive the same row;
/// an existing row's role is never overwritten.
pub async fn upsert_profile(
    pool: &PgPool,
    uid: &str,
    email: Option<&str>,
    full_name: Option<&str>,
    role: Role,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (firebase_uid, email, full_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (firebase_uid) DO UPDATE SET last_login = NOW()
        RETURNING id, firebase_uid, email, full_name, role, class_id, created_at, last_login
        "#,
    )
    .bind(uid)
    .bind(email)
    .bind(full_name)
    .bind(role)
    .fetch_one(pool)
    .await
}

#[post("/api/profiles")]
pub async fn create_profile(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpsertProfileRequest>,
) -> impl Responder {
    let uid = match principal_uid(&req) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };

    let role = body.role.unwrap_or(Role::Student);
    match upsert_profile(
        &data.pool,
        &uid,
        body.email.as_deref(),
        body.full_name.as_deref(),
        role,
    )
    .await
    {
        Ok(profile) => {
            tracing::info!("profile ready: id={}, role={}", profile.id, profile.role);
            HttpResponse::Ok().json(ApiResponse {
                success: true,
                message: "Profile ready".to_string(),
                data: Some(profile),
            })
        }
        Err(e) => db_error("upserting profile", e),
    }
}

#[get("/api/profiles/me")]
pub async fn get_current_profile(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let profile = match resolve_principal(&req, &data.pool).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: "Profile found".to_string(),
        data: Some(profile),
    })
}

#[get("/auth/callback")]
pub async fn auth_callback(
    data: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> impl Responder {
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("❌ building HTTP client: {:?}", e);
            return redirect_to("/auth/auth-code-error");
        }
    };

    let url = format!(
        "{}/token?grant_type=authorization_code",
        data.config.auth_api_url
    );
    let response = client
        .post(&url)
        .bearer_auth(&data.config.auth_service_key)
        .json(&serde_json::json!({ "code": query.code }))
        .send()
        .await;

    let exchange: ExchangeResponse = match response {
        Ok(resp) if resp.status().is_success() => match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("❌ parsing code-exchange response: {:?}", e);
                return redirect_to("/auth/auth-code-error");
            }
        },
        Ok(resp) => {
            tracing::warn!("⚠️ code exchange rejected with status {}", resp.status());
            return redirect_to("/auth/auth-code-error");
        }
        Err(e) => {
            tracing::error!("❌ reaching identity provider: {:?}", e);
            return redirect_to("/auth/auth-code-error");
        }
    };

    let profile = match upsert_profile(
        &data.pool,
        &exchange.user_id,
        exchange.email.as_deref(),
        exchange.full_name.as_deref(),
        Role::Student,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("❌ upserting profile after callback: {:?}", e);
            return redirect_to("/auth/auth-code-error");
        }
    };

    let target = query
        .next
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| dashboard_path(profile.role).to_string());
    tracing::info!("✅ session established for profile {}, redirecting", profile.id);
    redirect_to(&target)
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location.to_string()))
        .finish()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(create_profile)
        .service(get_current_profile)
        .service(auth_callback);
}
