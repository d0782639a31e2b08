use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Build the log filter: `RUST_LOG` when set, otherwise the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => Ok(EnvFilter::new(directives)),
        _ => EnvFilter::try_new(level).map_err(|e| anyhow!("Invalid log level '{}': {}", level, e)),
    }
}

/// Initialize structured logging.
///
/// Logs go to stderr so command output (`status`) stays clean on stdout.
/// `json` switches to one JSON object per line with the active span stack.
pub fn init_telemetry(level: &str, json: bool) -> Result<()> {
    let filter = build_filter(level)?;

    let result = if json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()
    };
    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!(level = %level, json, "Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the log lines of one engine call
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping a single engine call
pub fn create_engine_span(operation: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "engine_call",
        operation = operation,
        correlation.id = correlation_id,
    )
}
