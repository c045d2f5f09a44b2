use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub cron_secret: String,
    pub auth_api_url: String,
    pub auth_service_key: String,
    pub alert_lookahead_hours: i64,
    pub broadcast_include_class_teachers: bool,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        AppConfig {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            cron_secret: env::var("CRON_SECRET").expect("CRON_SECRET must be set"),
            auth_api_url: env::var("AUTH_API_URL")
                .unwrap_or_else(|_| "http://localhost:9999".to_string()),
            auth_service_key: env::var("AUTH_SERVICE_KEY").unwrap_or_default(),
            alert_lookahead_hours: parse_hours(env::var("ALERT_LOOKAHEAD_HOURS").ok()),
            broadcast_include_class_teachers: parse_flag(
                env::var("BROADCAST_INCLUDE_CLASS_TEACHERS").ok(),
                true,
            ),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

pub fn parse_hours(raw: Option<String>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(48)
}

pub fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(|s| s.trim().to_lowercase()).as_deref() {
        Some("1") | Some("true") | Some("on") | Some("yes") => true,
        Some("0") | Some("false") | Some("off") | Some("no") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookahead_defaults_to_48() {
        assert_eq!(parse_hours(None), 48);
        assert_eq!(parse_hours(Some("abc".to_string())), 48);
        assert_eq!(parse_hours(Some("0".to_string())), 48);
        assert_eq!(parse_hours(Some("-5".to_string())), 48);
    }

    #[test]
    fn lookahead_accepts_positive_hours() {
        assert_eq!(parse_hours(Some("72".to_string())), 72);
        assert_eq!(parse_hours(Some(" 24 ".to_string())), 24);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(None, false));
        assert!(parse_flag(Some("TRUE".to_string()), false));
        assert!(!parse_flag(Some("off".to_string()), true));
        assert!(parse_flag(Some("garbage".to_string()), true));
    }
}
