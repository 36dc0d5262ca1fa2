//! SQL Server driver.
//!
//! # Responsibilities
//! - Translate settings into a tiberius client configuration
//! - Pool clients with deadpool, capped at `max_open_conns`
//! - Enforce connection max lifetime / max idle time on checkout; a zero
//!   limit means unlimited
//! - Trim idle connections beyond `max_idle_conns` in the background
//!
//! # Design Decisions
//! - Liveness is `SELECT 1` on a pooled connection
//! - A probe abandoned mid-query detaches its connection instead of
//!   returning a half-read stream to the pool
//! - The reaper stops on its own once the pool is closed

use std::time::Duration;

use async_trait::async_trait;
use deadpool::managed::{self, Metrics, Object, RecycleError, RecycleResult};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::database::driver::{ConnectionPool, PoolDriver, PoolStatus};
use crate::database::settings::ConnectionSettings;
use crate::error::BoxError;

/// A single tiberius client over tokio TCP.
pub type SqlServerClient = Client<Compat<TcpStream>>;

const APPLICATION_NAME: &str = "cdc-agent";

/// Opens deadpool-backed SQL Server pools.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDriver;

#[async_trait]
impl PoolDriver for SqlServerDriver {
    async fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn ConnectionPool>, BoxError> {
        let policy = ExpiryPolicy::new(settings.conn_max_lifetime, settings.conn_max_idle_time);
        let manager = SqlServerManager {
            config: client_config(settings)?,
            policy,
        };

        let pool = managed::Pool::builder(manager)
            .max_size(settings.max_open_conns)
            .build()?;

        spawn_reaper(pool.clone(), policy, settings.max_idle_conns);

        tracing::debug!(
            max_open_conns = settings.max_open_conns,
            max_idle_conns = settings.max_idle_conns,
            conn_max_lifetime = ?settings.conn_max_lifetime,
            conn_max_idle_time = ?settings.conn_max_idle_time,
            "SQL Server pool configured"
        );

        Ok(Box::new(SqlServerPool { pool }))
    }
}

fn client_config(settings: &ConnectionSettings) -> Result<Config, BoxError> {
    let port: u16 = settings
        .port
        .parse()
        .map_err(|e| format!("invalid port {:?}: {}", settings.port, e))?;

    let mut config = Config::new();
    config.host(&settings.host);
    config.port(port);
    config.database(&settings.database);
    config.application_name(APPLICATION_NAME);
    config.authentication(AuthMethod::sql_server(
        &settings.user,
        settings.password.expose(),
    ));
    config.encryption(if settings.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if settings.trust_server_certificate {
        config.trust_cert();
    }

    Ok(config)
}

async fn connect(config: Config) -> Result<SqlServerClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        // Azure SQL gateways answer the first login with a redirect.
        Err(tiberius::error::Error::Routing { host, port }) => {
            tracing::debug!(host = %host, port, "Following SQL Server routing redirect");
            let mut config = config;
            config.host(&host);
            config.port(port);

            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Client::connect(config, tcp.compat_write()).await
        }
        other => other,
    }
}

/// Lifetime limits shared by checkout recycling and the idle reaper.
/// `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExpiryPolicy {
    max_lifetime: Option<Duration>,
    max_idle_time: Option<Duration>,
}

impl ExpiryPolicy {
    /// A zero duration disables the corresponding limit.
    fn new(max_lifetime: Duration, max_idle_time: Duration) -> Self {
        let limit = |d: Duration| (!d.is_zero()).then_some(d);
        Self {
            max_lifetime: limit(max_lifetime),
            max_idle_time: limit(max_idle_time),
        }
    }

    fn expired(&self, metrics: &Metrics) -> bool {
        self.max_lifetime.is_some_and(|max| metrics.age() >= max)
            || self.max_idle_time.is_some_and(|max| metrics.last_used() >= max)
    }

    /// Reaper period: half the shortest limit, at least one second. With
    /// no limits the reaper still runs to trim surplus idle connections.
    fn reap_every(&self) -> Duration {
        let shortest = match (self.max_lifetime, self.max_idle_time) {
            (Some(a), Some(b)) => a.min(b),
            (Some(d), None) | (None, Some(d)) => d,
            (None, None) => IDLE_TRIM_PERIOD * 2,
        };
        (shortest / 2).max(Duration::from_secs(1))
    }
}

/// Reaper period when neither lifetime limit is set.
const IDLE_TRIM_PERIOD: Duration = Duration::from_secs(30);

/// Decide whether the reaper keeps one idle connection.
///
/// `kept` counts connections already kept during this pass; anything past
/// `max_idle` is dropped, as is anything the policy considers expired.
fn keep_idle(policy: &ExpiryPolicy, metrics: &Metrics, kept: &mut usize, max_idle: usize) -> bool {
    if policy.expired(metrics) {
        return false;
    }
    *kept += 1;
    *kept <= max_idle
}

/// deadpool manager for tiberius clients.
struct SqlServerManager {
    config: Config,
    policy: ExpiryPolicy,
}

impl managed::Manager for SqlServerManager {
    type Type = SqlServerClient;
    type Error = tiberius::error::Error;

    async fn create(&self) -> Result<SqlServerClient, tiberius::error::Error> {
        connect(self.config.clone()).await
    }

    async fn recycle(
        &self,
        _client: &mut SqlServerClient,
        metrics: &Metrics,
    ) -> RecycleResult<tiberius::error::Error> {
        if self.policy.expired(metrics) {
            return Err(RecycleError::Message("connection expired".into()));
        }
        Ok(())
    }
}

fn spawn_reaper(
    pool: managed::Pool<SqlServerManager>,
    policy: ExpiryPolicy,
    max_idle: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(policy.reap_every());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }

            let mut kept = 0;
            let result = pool.retain(|_, metrics| keep_idle(&policy, &metrics, &mut kept, max_idle));

            if !result.removed.is_empty() {
                tracing::debug!(
                    removed = result.removed.len(),
                    retained = result.retained,
                    "Reaped idle SQL Server connections"
                );
            }
        }

        tracing::debug!("SQL Server pool reaper stopped");
    })
}

/// Open SQL Server pool.
struct SqlServerPool {
    pool: managed::Pool<SqlServerManager>,
}

#[async_trait]
impl ConnectionPool for SqlServerPool {
    async fn ping(&self) -> Result<(), BoxError> {
        let mut guard = InFlight::new(self.pool.get().await?);
        if let Some(conn) = guard.conn.as_mut() {
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }
        guard.complete();
        Ok(())
    }

    fn close(&self) {
        self.pool.close();
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            idle: status.available,
        }
    }
}

impl Drop for SqlServerPool {
    fn drop(&mut self) {
        self.pool.close();
    }
}

/// A checked-out connection that is only returned to the pool once the
/// round trip finished. If dropped early (deadline hit, task cancelled)
/// the connection is detached and closed.
struct InFlight {
    conn: Option<Object<SqlServerManager>>,
    completed: bool,
}

impl InFlight {
    fn new(conn: Object<SqlServerManager>) -> Self {
        Self {
            conn: Some(conn),
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if let Some(conn) = self.conn.take() {
            drop(Object::take(conn));
        }
    }
}
