//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the output format and default level from configuration
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON lines in production (or when asked for), human-readable otherwise
//! - Pod identity is carried by a root span, not by each call site

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::error::{AppError, AppResult};

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig, json: bool) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.log_level)))
        .map_err(|e| AppError::LoggerInitFailed {
            cause: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| AppError::LoggerInitFailed {
        cause: e.to_string(),
    })?;

    tracing::info!(level = %config.log_level, json, "Logger initialized");
    Ok(())
}

fn default_directives(level: &str) -> String {
    format!("{},tiberius=warn", level.trim().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for level in ["trace", "debug", "INFO", " warn ", "error"] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_driver_noise_is_capped() {
        assert_eq!(default_directives("debug"), "debug,tiberius=warn");
    }
}
