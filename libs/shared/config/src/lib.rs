use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rest_store_url: String,
    pub rest_store_api_key: String,
    pub portal_jwt_secret: String,
    pub sweep_interval_secs: u64,
    pub no_show_grace_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            rest_store_url: env::var("REST_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("REST_STORE_URL not set, using empty value");
                    String::new()
                }),
            rest_store_api_key: env::var("REST_STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("REST_STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            portal_jwt_secret: env::var("PORTAL_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            no_show_grace_minutes: env::var("NO_SHOW_GRACE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.portal_jwt_secret.is_empty()
    }

    /// Whether the REST booking store is reachable by configuration.
    /// When false the API falls back to in-process stores.
    pub fn is_rest_store_configured(&self) -> bool {
        !self.rest_store_url.is_empty() && !self.rest_store_api_key.is_empty()
    }
}
