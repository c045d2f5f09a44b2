use crate::config::AppConfig;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// 500 with a generic body; the real error stays in the server log.
pub fn db_error(context: &str, e: sqlx::Error) -> actix_web::HttpResponse {
    tracing::error!("❌ {}: {:?}", context, e);
    actix_web::HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Database error".to_string(),
        details: None,
    })
}
