use std::env;
use tracing::warn;

pub const DEFAULT_SLOT_INTERVAL_MINUTES: u16 = 20;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub slot_interval_minutes: u16,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            supabase_jwt_secret: String::new(),
            slot_interval_minutes: DEFAULT_SLOT_INTERVAL_MINUTES,
            port: DEFAULT_PORT,
        }
    }
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
            // Optional: store calls fall back to the anon key alone
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            slot_interval_minutes: parse_slot_interval(env::var("SLOT_INTERVAL_MINUTES").ok()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set or invalid, using {}", DEFAULT_PORT);
                    DEFAULT_PORT
                }),
        };

        if !config.is_configured() {
            warn!("Supabase not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

/// Slot granularity has to fit at least once in a day; anything else falls
/// back to the default.
fn parse_slot_interval(raw: Option<String>) -> u16 {
    match raw.as_deref().map(str::parse::<u16>) {
        Some(Ok(minutes)) if minutes > 0 && minutes < 24 * 60 => minutes,
        Some(_) => {
            warn!(
                "SLOT_INTERVAL_MINUTES must be between 1 and 1439, using {}",
                DEFAULT_SLOT_INTERVAL_MINUTES
            );
            DEFAULT_SLOT_INTERVAL_MINUTES
        }
        None => DEFAULT_SLOT_INTERVAL_MINUTES,
    }
}
