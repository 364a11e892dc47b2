//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays reserved for command output and RPC responses.

use crate::core::config::{LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the configured filter directive.
pub const LOG_ENV: &str = "QUALITYGUARD_LOG";

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_logging(cfg: &LogConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match cfg.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %cfg.level, "logging initialized");
    }
}

/// Span wrapping one lifecycle operation.
pub fn operation_span(operation: &str, actor: &str, record_id: Option<i64>) -> tracing::Span {
    tracing::info_span!(
        "record_operation",
        operation = operation,
        actor = actor,
        record.id = record_id,
    )
}
