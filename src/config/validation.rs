//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool sizes coherent)
//! - Check the metrics listener address when metrics are enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Required connection fields are checked by the connection manager, not here

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

/// Validate an already-deserialized configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than zero",
        ));
    }

    let db = &config.database;
    if db.ping_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "database.ping_timeout_secs",
            "must be greater than zero",
        ));
    }
    if db.max_open_conns == 0 {
        errors.push(ValidationError::new(
            "database.max_open_conns",
            "must be greater than zero",
        ));
    }
    if db.max_idle_conns > db.max_open_conns {
        errors.push(ValidationError::new(
            "database.max_idle_conns",
            format!("must not exceed max_open_conns ({})", db.max_open_conns),
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("is not a valid socket address: {:?}", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
