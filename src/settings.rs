use crate::identity::routes::principal_uid;
use crate::models::{ApiResponse, AppState, ErrorResponse};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordIn {
    pub new_password: String,
}

pub const MIN_PASSWORD_CHARS: usize = 6;

pub fn password_acceptable(candidate: &str) -> bool {
    candidate.chars().count() >= MIN_PASSWORD_CHARS
}

/// Credentials live in the managed identity provider; this endpoint only
/// validates and forwards.
#[post("/api/settings/change-password")]
pub async fn change_password(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChangePasswordIn>,
) -> impl Responder {
    let uid = match principal_uid(&req) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };

    if !password_acceptable(&body.new_password) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Password too short".to_string(),
            details: Some(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )),
        });
    }

    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("❌ building HTTP client: {:?}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
                details: None,
            });
        }
    };

    let url = format!("{}/admin/users/{}/password", data.config.auth_api_url, uid);
    let response = client
        .put(&url)
        .bearer_auth(&data.config.auth_service_key)
        .json(&serde_json::json!({ "password": body.new_password }))
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("password updated for session {}", uid);
            HttpResponse::Ok().json(ApiResponse::<()> {
                success: true,
                message: "Password updated".to_string(),
                data: None,
            })
        }
        Ok(resp) => {
            tracing::error!("❌ identity provider rejected password update: {}", resp.status());
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Could not update password".to_string(),
                details: None,
            })
        }
        Err(e) => {
            tracing::error!("❌ reaching identity provider: {:?}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Could not update password".to_string(),
                details: None,
            })
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(change_password);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_characters_is_the_floor() {
        assert!(!password_acceptable(""));
        assert!(!password_acceptable("abc12"));
        assert!(password_acceptable("abc123"));
        // counted in characters, not bytes
        assert!(password_acceptable("señal1"));
        assert!(!password_acceptable("señal"));
    }
}
