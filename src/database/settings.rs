//! Connection settings and connection-string rendering.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::{DatabaseConfig, Secret, MASKED_SECRET};
use crate::error::AppError;

/// Backing-store technologies the agent knows how to pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    SqlServer,
}

impl Technology {
    /// Tag used in configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            Technology::SqlServer => "sqlserver",
        }
    }
}

impl FromStr for Technology {
    type Err = AppError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "sqlserver" => Ok(Technology::SqlServer),
            other => Err(AppError::UnsupportedTechnology {
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Immutable snapshot of everything needed to open and verify a pool.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: Secret,
    pub database: String,
    pub technology: String,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
    pub max_open_conns: usize,
    pub max_idle_conns: usize,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
    pub probe_timeout: Duration,
}

impl ConnectionSettings {
    /// Check that every required field is populated.
    ///
    /// Returns the first empty field in declaration order.
    pub fn ensure_complete(&self) -> Result<(), AppError> {
        let required = [
            ("host", self.host.is_empty()),
            ("port", self.port.is_empty()),
            ("user", self.user.is_empty()),
            ("password", self.password.is_empty()),
            ("database", self.database.is_empty()),
            ("technology", self.technology.is_empty()),
        ];

        match required.iter().find(|(_, empty)| *empty) {
            Some((field, _)) => Err(AppError::EnvVarMissing { field: *field }),
            None => Ok(()),
        }
    }

    /// Resolve the technology tag.
    pub fn technology(&self) -> Result<Technology, AppError> {
        self.technology.parse()
    }

    /// Render the connection string.
    ///
    /// With `show_password == false` the credential is replaced by
    /// [`MASKED_SECRET`]; only the driver ever asks for the real value.
    pub fn connection_string(&self, show_password: bool) -> String {
        let password = if show_password {
            self.password.expose()
        } else {
            MASKED_SECRET
        };

        format!(
            "server={};user id={};password={};port={};database={};encrypt={};trustservercertificate={};",
            self.host,
            self.user,
            password,
            self.port,
            self.database,
            self.encrypt,
            self.trust_server_certificate,
        )
    }
}

impl From<&DatabaseConfig> for ConnectionSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.name.clone(),
            technology: config.technology.clone(),
            encrypt: config.encrypt,
            trust_server_certificate: config.trust_server_certificate,
            max_open_conns: config.max_open_conns,
            max_idle_conns: config.max_idle_conns,
            conn_max_lifetime: Duration::from_secs(config.conn_max_lifetime_mins * 60),
            conn_max_idle_time: Duration::from_secs(config.conn_max_idle_time_mins * 60),
            probe_timeout: Duration::from_secs(config.ping_timeout_secs),
        }
    }
}
