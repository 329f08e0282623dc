use std::env;
use tracing::warn;

/// Granularity at which candidate slot start times are generated, unless
/// overridden via SLOT_STEP_MINUTES.
pub const DEFAULT_SLOT_STEP_MINUTES: i32 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub slot_step_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let slot_step_minutes = match env::var("SLOT_STEP_MINUTES") {
            Ok(raw) => match raw.parse::<i32>() {
                Ok(step) if step > 0 => step,
                _ => {
                    warn!(
                        "SLOT_STEP_MINUTES must be a positive integer, using default of {}",
                        DEFAULT_SLOT_STEP_MINUTES
                    );
                    DEFAULT_SLOT_STEP_MINUTES
                }
            },
            Err(_) => DEFAULT_SLOT_STEP_MINUTES,
        };

        let config = Self {
            supabase_url: env::var("SUPABASE_URL").unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            }),
            slot_step_minutes,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}
