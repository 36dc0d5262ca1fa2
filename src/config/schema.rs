//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Placeholder substituted for credentials whenever they are rendered.
pub const MASKED_SECRET: &str = "******";

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application identity.
    pub app: AppSection,

    /// Backing store connection and pool policy.
    pub database: DatabaseConfig,

    /// Periodic liveness monitoring.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Pod/container identity overrides.
    pub runtime: RuntimeConfig,
}

/// Application identity and process behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSection {
    /// Service name attached to diagnostics.
    pub name: String,

    /// Deployment environment (`dev`, `hml`, `prd`, ...).
    pub environment: String,

    /// Reported application version.
    pub version: String,

    /// Delay before exit so final diagnostics are flushed.
    pub shutdown_grace_ms: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "cdc-agent".to_string(),
            environment: "dev".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            shutdown_grace_ms: 500,
        }
    }
}

impl AppSection {
    /// True for the production environment.
    pub fn is_production(&self) -> bool {
        self.environment == "prd"
    }
}

/// Database connection and pool policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backing-store technology tag (e.g., "sqlserver").
    pub technology: String,

    /// Server host name or address.
    pub host: String,

    /// Server port, kept textual as it arrives from the environment.
    pub port: String,

    /// Login user.
    pub user: String,

    /// Login credential.
    pub password: Secret,

    /// Database (catalog) name.
    pub name: String,

    /// Maximum connections the pool may open.
    pub max_open_conns: usize,

    /// Maximum idle connections retained by the pool.
    pub max_idle_conns: usize,

    /// Maximum connection lifetime in minutes (0 = unlimited).
    pub conn_max_lifetime_mins: u64,

    /// Maximum connection idle time in minutes (0 = unlimited).
    pub conn_max_idle_time_mins: u64,

    /// Request TLS encryption.
    pub encrypt: bool,

    /// Accept the server certificate without validation.
    pub trust_server_certificate: bool,

    /// Deadline for a single liveness probe in seconds.
    pub ping_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            technology: String::new(),
            host: String::new(),
            port: String::new(),
            user: String::new(),
            password: Secret::default(),
            name: String::new(),
            max_open_conns: 25,
            max_idle_conns: 5,
            conn_max_lifetime_mins: 5,
            conn_max_idle_time_mins: 5,
            encrypt: true,
            trust_server_certificate: true,
            ping_timeout_secs: 3,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Health check interval in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Pod identity overrides. Anything left unset is discovered at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A credential that never renders in cleartext.
///
/// `Debug` and `Serialize` both emit [`MASKED_SECRET`]; the real value is
/// only reachable through [`Secret::expose`].
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cleartext value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASKED_SECRET)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(MASKED_SECRET)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
