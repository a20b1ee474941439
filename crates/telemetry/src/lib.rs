//! Tracing bootstrap for shelf binaries.

use anyhow::anyhow;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the event filter: `RUST_LOG` when set, otherwise the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_filter)
            .map_err(|e| anyhow!("invalid log filter '{}': {}", settings.log_filter, e)),
    }
}

/// Install the global subscriber.
///
/// Calling this more than once is harmless: later calls leave the first subscriber in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match settings.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(
            target: "shelf-telemetry",
            format = ?settings.log_format,
            filter = %settings.log_filter,
            "telemetry initialized"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_filter: "shelf=notalevel".to_string(),
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(env_filter(&settings).is_err());
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
    }
}
