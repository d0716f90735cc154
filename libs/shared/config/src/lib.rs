use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub frontend_origin: String,
    pub uploads_dir: String,
    pub public_base_url: String,
    pub twilio_account_sid: String,
    pub twilio_api_key_sid: String,
    pub twilio_api_key_secret: String,
    pub twilio_token_ttl_seconds: i64,
    pub chat_service_url: String,
    pub inventory_path: String,
    pub reminder_interval_seconds: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_hours: parse_or_default("TOKEN_TTL_HOURS", 168),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "*".to_string()),
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_api_key_sid: env::var("TWILIO_API_KEY_SID").unwrap_or_default(),
            twilio_api_key_secret: env::var("TWILIO_API_KEY_SECRET").unwrap_or_default(),
            twilio_token_ttl_seconds: parse_or_default("TWILIO_API_KEY_TTL", 3600),
            chat_service_url: env::var("CHAT_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5001/internal/respond".to_string()),
            inventory_path: env::var("INVENTORY_PATH")
                .unwrap_or_else(|_| "inventory.json".to_string()),
            reminder_interval_seconds: parse_or_default("REMINDER_INTERVAL_SECONDS", 60),
            port: parse_or_default("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Store access and token signing are the minimum needed to serve requests.
    /// A partially configured service still starts; store-backed routes fail
    /// with 500 until the store becomes reachable.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_video_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_api_key_sid.is_empty()
            && !self.twilio_api_key_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default {}", key, default);
            default
        }),
        Err(_) => default,
    }
}
