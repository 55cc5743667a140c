//! Logging and tracing bootstrap.

use anyhow::Context;
use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `telemetry.log_level` when set. Fails if a global
/// subscriber is already installed.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref(), &settings.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    match settings.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .context("failed to install tracing subscriber")?;

    tracing::info!(
        target: "bookshelf-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

/// Build the filter from an explicit override, falling back to the configured
/// level and then to `info` when neither parses.
fn env_filter(override_directive: Option<&str>, default_level: &str) -> EnvFilter {
    override_directive
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
