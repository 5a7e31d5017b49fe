//! Configuration utilities for querybot services

use serde::{Deserialize, Serialize};

/// Telemetry/observability settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Service name for tracing
    pub service_name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON log format
    pub json_logs: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: "querybot".into(),
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

impl TelemetrySettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env_or_default("SERVICE_NAME", &defaults.service_name),
            log_level: env_or_default("LOG_LEVEL", &defaults.log_level),
            json_logs: env_flag("JSON_LOGS", defaults.json_logs),
        }
    }
}

/// Load configuration from environment variables
pub fn load_from_env<T: for<'de> Deserialize<'de>>(prefix: &str) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(config::Environment::with_prefix(prefix).separator("__"))
        .build()?
        .try_deserialize()
}

/// Get environment variable with default
pub fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean flag ("true"/"1", case-insensitive) with default
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1"))
        .unwrap_or(default)
}
