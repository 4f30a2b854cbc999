/// Configuration management
///
/// All settings come from the environment (optionally via a `.env` file).
use chrono::Duration;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: i64,
    #[serde(default = "default_max_failed_login_attempts")]
    pub max_failed_login_attempts: i32,
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: i64,
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    #[serde(default = "default_login_rate_window_secs")]
    pub login_rate_window_secs: i64,
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: i64,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_access_token_ttl_secs() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_ttl_secs() -> i64 {
    7 * 24 * 3600 // 7 days
}

fn default_max_failed_login_attempts() -> i32 {
    5
}

fn default_lockout_duration_secs() -> i64 {
    30 * 60
}

fn default_login_rate_limit() -> u32 {
    5
}

fn default_login_rate_window_secs() -> i64 {
    60
}

fn default_audit_retention_days() -> i64 {
    90
}

fn default_maintenance_interval_secs() -> u64 {
    3600
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl_secs)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(self.lockout_duration_secs)
    }

    pub fn login_rate_window(&self) -> Duration {
        Duration::seconds(self.login_rate_window_secs)
    }

    pub fn audit_retention(&self) -> Duration {
        Duration::days(self.audit_retention_days)
    }
}
