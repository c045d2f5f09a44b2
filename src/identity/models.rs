use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i32,
    pub firebase_uid: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
    pub class_id: Option<i32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub next: Option<String>,
}

/// Shape of the identity provider's code-exchange response.
#[derive(Debug, Deserialize)]
pub struct ExchangeResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Dashboard landing path for a role, used by the auth callback redirect.
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin",
        Role::Teacher => "/teacher",
        Role::Student => "/student",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_paths_by_role() {
        assert_eq!(dashboard_path(Role::Admin), "/admin");
        assert_eq!(dashboard_path(Role::Teacher), "/teacher");
        assert_eq!(dashboard_path(Role::Student), "/student");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        assert_eq!(Role::Student.to_string(), "student");
    }
}
