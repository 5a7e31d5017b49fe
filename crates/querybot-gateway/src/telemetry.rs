//! Logging setup
//!
//! `tracing` with an `EnvFilter` (RUST_LOG wins over the configured level)
//! and either human-readable or JSON output.

use anyhow::Result;
use querybot_common::config::TelemetrySettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber
pub fn init(settings: &TelemetrySettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.json_logs {
        // JSON formatted logs for production
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    }

    tracing::debug!(service = %settings.service_name, "Telemetry initialized");
    Ok(())
}
