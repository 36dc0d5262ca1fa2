//! Configuration loading from disk and the environment.

use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::{AppConfig, Secret};
use crate::config::validation::validate_config;
use crate::error::{AppError, AppResult};

/// Prefix shared by every environment variable the agent reads.
pub const ENV_PREFIX: &str = "CDC_AGENT_";

/// Load configuration from an optional TOML file, overlay the process
/// environment and validate the result.
pub fn load_config(path: Option<&Path>) -> AppResult<AppConfig> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => AppConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(AppError::ConfigInvalid)?;

    Ok(config)
}

fn read_file(path: &Path) -> AppResult<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::ConfigFileNotFound {
            path: path.to_path_buf(),
        },
        _ => AppError::ConfigDecodeFailed {
            cause: format!("{}: {}", path.display(), e),
        },
    })?;

    toml::from_str(&content).map_err(|e| AppError::ConfigDecodeFailed {
        cause: format!("{}: {}", path.display(), e),
    })
}

/// Overlay `CDC_AGENT_*` variables onto `config`. Unset or empty variables
/// leave the current value in place.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    env.string("NAME", &mut config.app.name);
    env.string("ENV", &mut config.app.environment);
    env.string("VERSION", &mut config.app.version);
    env.parse("SHUTDOWN_GRACE_MS", &mut config.app.shutdown_grace_ms)?;

    let db = &mut config.database;
    env.string("DB_TECHNOLOGY", &mut db.technology);
    env.string("DB_HOST", &mut db.host);
    env.string("DB_PORT", &mut db.port);
    env.string("DB_USER", &mut db.user);
    if let Some(pass) = env.get("DB_PASS") {
        db.password = Secret::new(pass);
    }
    env.string("DB_NAME", &mut db.name);
    env.parse("DB_MAX_OPEN_CONNS", &mut db.max_open_conns)?;
    env.parse("DB_MAX_IDLE_CONNS", &mut db.max_idle_conns)?;
    env.parse("DB_CONN_MAX_LIFETIME", &mut db.conn_max_lifetime_mins)?;
    env.parse("DB_CONN_MAX_IDLE_TIME", &mut db.conn_max_idle_time_mins)?;
    env.flag("DB_ENCRYPT", &mut db.encrypt)?;
    env.flag("DB_TRUST_SERVER_CERT", &mut db.trust_server_certificate)?;
    env.parse("DB_PING_TIMEOUT_SECONDS", &mut db.ping_timeout_secs)?;

    env.parse(
        "HEALTH_CHECK_INTERVAL_SECONDS",
        &mut config.health_check.interval_secs,
    )?;

    let obs = &mut config.observability;
    env.string("LOG_LEVEL", &mut obs.log_level);
    env.flag("LOG_JSON", &mut obs.json_logs)?;
    env.flag("METRICS_ENABLED", &mut obs.metrics_enabled)?;
    env.string("METRICS_ADDRESS", &mut obs.metrics_address);

    let rt = &mut config.runtime;
    env.optional("POD_HOSTNAME", &mut rt.pod_hostname);
    env.optional("POD_NAME", &mut rt.pod_name);
    env.optional("POD_IP", &mut rt.pod_ip);
    env.optional("NODE_NAME", &mut rt.node_name);
    env.optional("POD_NAMESPACE", &mut rt.namespace);

    Ok(())
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", ENV_PREFIX, key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value;
        }
    }

    fn optional(&self, key: &str, target: &mut Option<String>) {
        if let Some(value) = self.get(key) {
            *target = Some(value);
        }
    }

    fn parse<T>(&self, key: &str, target: &mut T) -> AppResult<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(key) {
            *target = value.parse().map_err(|e| AppError::ConfigDecodeFailed {
                cause: format!("{}{}={:?}: {}", ENV_PREFIX, key, value, e),
            })?;
        }
        Ok(())
    }

    fn flag(&self, key: &str, target: &mut bool) -> AppResult<()> {
        if let Some(value) = self.get(key) {
            *target = parse_flag(&value).ok_or_else(|| AppError::ConfigDecodeFailed {
                cause: format!("{}{}={:?}: expected a boolean", ENV_PREFIX, key, value),
            })?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}
