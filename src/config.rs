use crate::guard::AdminGuard;
use crate::models::invite::InvitePolicy;

const DEFAULT_PORT: u16 = 9700;
const DEFAULT_INVITE_TTL_HOURS: i64 = 24;
const DEFAULT_MAX_OTP_ATTEMPTS: u32 = 3;
const DEFAULT_MIN_ADMINS: i64 = 1;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub invite_ttl_hours: i64,
    pub max_otp_attempts: u32,
    pub min_admins: i64,
    /// Base of the link sent in invite emails; the code is appended.
    pub invite_base_url: String,
    pub notify_url: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let invite_ttl_hours = env_parse::<i64>("TENANTGATE_INVITE_TTL_HOURS")
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_INVITE_TTL_HOURS);
        let max_otp_attempts = env_parse::<u32>("TENANTGATE_MAX_OTP_ATTEMPTS")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_OTP_ATTEMPTS);
        let min_admins = env_parse::<i64>("TENANTGATE_MIN_ADMINS")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MIN_ADMINS);

        let invite_base_url = std::env::var("TENANTGATE_INVITE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:3000/invites".to_string());

        Self {
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:tenantgate.db?mode=rwc".to_string()),
            invite_ttl_hours,
            max_otp_attempts,
            min_admins,
            invite_base_url,
            notify_url: std::env::var("TENANTGATE_NOTIFY_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn invite_policy(&self) -> InvitePolicy {
        InvitePolicy {
            ttl: chrono::Duration::hours(self.invite_ttl_hours),
            max_attempts: self.max_otp_attempts,
        }
    }

    pub fn admin_guard(&self) -> AdminGuard {
        AdminGuard::new(self.min_admins)
    }
}
