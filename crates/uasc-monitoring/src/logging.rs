//! Structured logging using tracing.
//!
//! Output goes to stderr so that stdout stays free for results.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::MonitoringConfig;

/// Filter from `RUST_LOG` when set, otherwise from `fallback`
pub fn build_filter(fallback: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("Invalid log filter: {}", fallback)),
    }
}

/// Initialize structured logging.
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let env_filter = build_filter(&config.log_filter)?;
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json_logs {
        // JSON logs for production
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(json_layer))
            .context("Failed to set global default subscriber")?;
    } else {
        // Pretty logs for development
        let fmt_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))
            .context("Failed to set global default subscriber")?;
    }

    info!(
        service_name = %config.service_name,
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Initializes test tracing for unit tests
#[cfg(test)]
pub fn init_test_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_target(false)
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_filter_parses() {
        assert!(build_filter("info,uasc_core=debug").is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        init_test_tracing();
        let result = init_logging(&MonitoringConfig::default());
        assert!(result.is_err());
    }
}
