//! Error taxonomy for the agent.
//!
//! Every error exposes a stable machine-readable code (`code()`), a human
//! message (`Display`) and, when one exists, the low-level cause that
//! produced it (`cause()`).

use std::path::PathBuf;
use thiserror::Error;

use crate::config::validation::ValidationError;

/// Boxed low-level error from a storage driver or I/O layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the agent.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required setting is empty.
    #[error("Required environment variable is missing: {field}")]
    EnvVarMissing { field: &'static str },

    /// The backing-store technology tag is not recognized.
    #[error("Unsupported database technology: {tag:?}")]
    UnsupportedTechnology { tag: String },

    /// Pool construction or the first verification probe failed.
    #[error("Failed to initialize database: {source}")]
    InitFailed {
        #[source]
        source: BoxError,
    },

    /// A liveness probe did not succeed within its deadline.
    #[error("Database health check failed: {source}")]
    HealthCheckFailed {
        #[source]
        source: BoxError,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .path.display())]
    ConfigFileNotFound { path: PathBuf },

    /// The configuration file or an environment value could not be decoded.
    #[error("Failed to decode configuration: {cause}")]
    ConfigDecodeFailed { cause: String },

    /// Semantic validation rejected the configuration.
    #[error("Invalid configuration: {}", join(.0))]
    ConfigInvalid(Vec<ValidationError>),

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logger: {cause}")]
    LoggerInitFailed { cause: String },
}

/// Result type used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable code for log pipelines and alerting rules.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::EnvVarMissing { .. } => "ENV_VAR_MISSING",
            AppError::UnsupportedTechnology { .. } => "UNSUPPORTED_DB_TECHNOLOGY",
            AppError::InitFailed { .. } => "DB_INIT_FAILED",
            AppError::HealthCheckFailed { .. } => "DB_HEALTH_CHECK_FAILED",
            AppError::ConfigFileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            AppError::ConfigDecodeFailed { .. } => "CONFIG_DECODE_FAILED",
            AppError::ConfigInvalid(_) => "CONFIG_INVALID",
            AppError::LoggerInitFailed { .. } => "LOGGER_INIT_FAILED",
        }
    }

    /// The wrapped low-level cause, if any.
    pub fn cause(&self) -> Option<String> {
        match self {
            AppError::InitFailed { source } | AppError::HealthCheckFailed { source } => {
                Some(source.to_string())
            }
            AppError::ConfigDecodeFailed { cause } | AppError::LoggerInitFailed { cause } => {
                Some(cause.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn init_failed(source: impl Into<BoxError>) -> Self {
        AppError::InitFailed {
            source: source.into(),
        }
    }

    pub(crate) fn health_check_failed(source: impl Into<BoxError>) -> Self {
        AppError::HealthCheckFailed {
            source: source.into(),
        }
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
