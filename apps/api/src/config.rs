use std::time::Duration;

use anyhow::{Context, Result};

use crate::preview::session::OrchestratorConfig;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub backend_url: String,
    pub backend_token: String,
    pub port: u16,
    pub rust_log: String,
    pub preview_debounce_ms: u64,
    pub manual_overrides_enabled: bool,
    pub session_idle_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            backend_url: require_env("CV_BACKEND_URL")?,
            backend_token: require_env("CV_BACKEND_TOKEN")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            preview_debounce_ms: optional_env("PREVIEW_DEBOUNCE_MS", "450")
                .parse::<u64>()
                .context("PREVIEW_DEBOUNCE_MS must be a number of milliseconds")?,
            manual_overrides_enabled: parse_flag(&optional_env("MANUAL_OVERRIDES_ENABLED", "true"))
                .context("MANUAL_OVERRIDES_ENABLED must be true or false")?,
            session_idle_timeout_secs: optional_env("SESSION_IDLE_TIMEOUT_SECS", "1800")
                .parse::<u64>()
                .context("SESSION_IDLE_TIMEOUT_SECS must be a number of seconds")?,
        })
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            debounce: Duration::from_millis(self.preview_debounce_ms),
            manual_overrides_enabled: self.manual_overrides_enabled,
        }
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}
