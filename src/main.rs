//! CDC Agent
//!
//! Opens a verified SQL Server connection pool and keeps probing it until
//! the process is told to stop.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                            CDC AGENT                             │
//!   │                                                                  │
//!   │  ┌─────────┐   ┌──────────┐   ┌────────────────────┐             │
//!   │  │ config  │──▶│ database │──▶│ ConnectionManager  │◀──┐         │
//!   │  │ TOML+env│   │ settings │   │  (verified pool)   │   │ probe   │
//!   │  └─────────┘   └──────────┘   └─────────┬──────────┘   │         │
//!   │                                         │        ┌─────┴──────┐  │
//!   │                                         ▼        │   health   │  │
//!   │                                    SQL Server    │  monitor   │  │
//!   │                                                  └─────┬──────┘  │
//!   │  ┌───────────────────────────────────────────────────  │ ──────┐ │
//!   │  │            Cross-Cutting Concerns                   ▼       │ │
//!   │  │  ┌───────────┐  ┌──────────────┐  ┌──────────────────────┐  │ │
//!   │  │  │ lifecycle │  │ observability│  │ runtime metadata     │  │ │
//!   │  │  │ signals   │  │ logs+metrics │  │ pod/host identity    │  │ │
//!   │  │  └───────────┘  └──────────────┘  └──────────────────────┘  │ │
//!   │  └─────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Process Exit
//! - `0` after a graceful shutdown (SIGINT/SIGTERM)
//! - non-zero when configuration, logging or the initial pool
//!   verification fails

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::Instrument;

use cdc_agent::config::loader::load_config;
use cdc_agent::config::AppConfig;
use cdc_agent::database::{ConnectionManager, ConnectionSettings};
use cdc_agent::error::AppError;
use cdc_agent::health::HealthMonitor;
use cdc_agent::lifecycle::{shutdown_signal, Shutdown};
use cdc_agent::observability::{logging, metrics};
use cdc_agent::runtime::RuntimeMetadata;

#[derive(Parser, Debug)]
#[command(name = "cdc-agent", version, about = "Verified SQL Server pool with liveness monitoring")]
struct Cli {
    /// Optional TOML configuration file; environment variables override it
    #[arg(short, long, env = "CDC_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Print the effective configuration (credentials masked) and exit
    #[arg(long)]
    print_config: bool,

    /// Open and verify the pool once, then exit
    #[arg(long, conflicts_with = "print_config")]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The logger depends on the configuration, so failures here go to stderr.
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cdc-agent: {e}");
            return Err(e.into());
        }
    };

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let json = config.observability.json_logs || config.app.is_production();
    if let Err(e) = logging::init_logging(&config.observability, json) {
        eprintln!("cdc-agent: {e}");
        return Err(e.into());
    }

    let metadata = RuntimeMetadata::discover(&config);
    let span = metadata.span(&config.app.name);

    let result = async {
        metadata.log();
        if cli.check {
            check(&config).await
        } else {
            run(config).await
        }
    }
    .instrument(span)
    .await;

    if let Err(e) = &result {
        tracing::error!(
            code = e.code(),
            cause = %e.cause().unwrap_or_default(),
            error = %e,
            "Application failed"
        );
    }
    result.map_err(Into::into)
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        app = %config.app.name,
        version = %config.app.version,
        environment = %config.app.environment,
        "Application starting"
    );
    tracing::debug!(config = ?config, "Configuration loaded");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let manager = Arc::new(ConnectionManager::init(ConnectionSettings::from(&config.database)).await?);
    tracing::info!("Connection pool verified");

    let shutdown = Shutdown::new();
    let monitor = HealthMonitor::new(
        manager.clone(),
        manager.target(),
        Duration::from_secs(config.health_check.interval_secs),
        Duration::from_secs(config.database.ping_timeout_secs),
    );
    let monitor_handle = tokio::spawn(monitor.run(shutdown.subscribe()).in_current_span());

    tracing::info!("Application started, waiting for shutdown signal");
    shutdown_signal().await;

    shutdown.trigger();
    if let Err(e) = monitor_handle.await {
        tracing::error!(error = %e, "Health monitor task failed");
    }

    manager.close();
    tracing::info!("Connection pool closed");

    tokio::time::sleep(Duration::from_millis(config.app.shutdown_grace_ms)).await;
    tracing::info!("Application stopped");
    Ok(())
}

/// One-shot verification: `init` already runs the first probe.
async fn check(config: &AppConfig) -> Result<(), AppError> {
    let manager = ConnectionManager::init(ConnectionSettings::from(&config.database)).await?;
    let status = manager.pool_status();
    tracing::info!(
        connection = %manager.settings().connection_string(false),
        max_size = status.max_size,
        size = status.size,
        idle = status.idle,
        "Connection check passed"
    );
    manager.close();
    Ok(())
}
