//! Application state management.
//!
//! One [`DevlogState`] is built from configuration at startup and shared by
//! every request handler. Pools are created once and never replaced; an
//! environment whose pool could not be built stays absent until restart.

use crate::config::DevlogConfig;
use crate::error::DevlogError;
use crate::models::{Environment, EnvironmentStatus};
use crate::services::{ConnectionPool, LogRing};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Central application state.
pub struct DevlogState {
    /// Effective configuration
    config: DevlogConfig,
    /// Pools keyed by environment; absent when unconfigured or unusable
    pools: HashMap<Environment, Arc<ConnectionPool>>,
    /// Operational event log
    logs: LogRing,
    /// Process start, for uptime reporting
    started_at: Instant,
    /// Cancelled on shutdown to stop background tasks
    shutdown: CancellationToken,
}

impl DevlogState {
    /// Build state from configuration.
    ///
    /// Never fails: problems with one environment are recorded in the log
    /// ring and leave that environment without a pool.
    pub fn initialize(config: DevlogConfig) -> Self {
        let logs = LogRing::with_capacity(config.logs.capacity);
        let mut pools = HashMap::new();

        for env in Environment::ALL {
            let label = env.as_str().to_uppercase();
            let Some(url) = config.database(env).url.as_deref().filter(|u| !u.trim().is_empty())
            else {
                logs.warn(format!("{label} database URL is not configured"));
                continue;
            };

            match ConnectionPool::from_url(env, url, &config.pool) {
                Ok(pool) => {
                    pools.insert(env, Arc::new(pool));
                    logs.info(format!("{label} connection pool created"));
                }
                Err(e) => {
                    logs.error(format!("failed to create {label} connection pool"), e);
                }
            }
        }

        tracing::info!(pools = pools.len(), "DevlogState initialized");

        Self { config, pools, logs, started_at: Instant::now(), shutdown: CancellationToken::new() }
    }

    // ========== Pools ==========

    /// Get the pool for an environment, if one exists.
    pub fn pool(&self, env: Environment) -> Option<Arc<ConnectionPool>> {
        self.pools.get(&env).cloned()
    }

    /// Get the pool for an environment or fail with [`DevlogError::Disconnected`].
    pub fn require_pool(&self, env: Environment) -> Result<Arc<ConnectionPool>, DevlogError> {
        self.pool(env).ok_or_else(|| DevlogError::disconnected(env))
    }

    /// Get the (offline, online) pair used by transfers.
    pub fn transfer_pools(
        &self,
    ) -> Result<(Arc<ConnectionPool>, Arc<ConnectionPool>), DevlogError> {
        match (self.pool(Environment::Offline), self.pool(Environment::Online)) {
            (Some(offline), Some(online)) => Ok((offline, online)),
            _ => Err(DevlogError::IncompletePools),
        }
    }

    /// Probe every environment and report its status.
    ///
    /// Each configured pool runs `SELECT version()`; a failed probe is
    /// reported as an error status rather than returned.
    pub async fn environment_statuses(&self) -> BTreeMap<Environment, EnvironmentStatus> {
        let mut statuses = BTreeMap::new();
        for env in Environment::ALL {
            let status = match self.pool(env) {
                Some(pool) => match pool.server_version().await {
                    Ok(version) => EnvironmentStatus::connected(env, version, pool.status()),
                    Err(e) => EnvironmentStatus::failed(env, e.to_string()),
                },
                None => EnvironmentStatus::disconnected(env, self.config.database(env).is_configured()),
            };
            statuses.insert(env, status);
        }
        statuses
    }

    // ========== Lifecycle ==========

    /// Start the background task that drops idle connections.
    ///
    /// The task stops when [`DevlogState::shutdown`] is called.
    pub fn spawn_idle_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(self);
        let idle_timeout = self.config.pool.idle_timeout();
        let period = (idle_timeout / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = state.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        for pool in state.pools.values() {
                            pool.evict_idle(idle_timeout);
                        }
                    }
                }
            }
            tracing::debug!("Idle reaper stopped");
        })
    }

    /// Stop background tasks and close every pool.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        for pool in self.pools.values() {
            pool.close();
        }
        self.logs.info("connection pools closed");
    }

    /// Check if shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // ========== Accessors ==========

    /// Get the operational log ring.
    pub fn logs(&self) -> &LogRing {
        &self.logs
    }

    /// Time since state was initialized.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionStatus, LevelFilter, LogLevel};

    fn config_with(offline: Option<&str>, online: Option<&str>) -> DevlogConfig {
        let mut config = DevlogConfig::default();
        config.offline.url = offline.map(String::from);
        config.online.url = online.map(String::from);
        config.pool.connect_timeout_secs = 1;
        config
    }

    #[test]
    fn test_unconfigured_environments_have_no_pool() {
        let state = DevlogState::initialize(DevlogConfig::default());

        assert!(state.pool(Environment::Offline).is_none());
        assert!(matches!(
            state.require_pool(Environment::Online),
            Err(DevlogError::Disconnected { env: Environment::Online })
        ));
        assert!(matches!(state.transfer_pools(), Err(DevlogError::IncompletePools)));

        let warnings = state.logs().page(LevelFilter::Only(LogLevel::Warn), 10, 0);
        assert_eq!(warnings.total, 2);
    }

    #[tokio::test]
    async fn test_pools_created_for_configured_urls() {
        let state = DevlogState::initialize(config_with(
            Some("postgres://devlog@127.0.0.1:1/offline"),
            Some("postgres://devlog@127.0.0.1:1/online"),
        ));

        assert!(state.pool(Environment::Offline).is_some());
        assert!(state.transfer_pools().is_ok());

        state.shutdown();
        assert!(state.is_shutting_down());
        assert!(state.pool(Environment::Online).is_some_and(|p| p.is_closed()));
    }

    #[tokio::test]
    async fn test_invalid_url_logged_and_pool_absent() {
        let state = DevlogState::initialize(config_with(
            Some("postgres://devlog@127.0.0.1:1/offline"),
            Some("postgres://host:notaport/db"),
        ));

        assert!(state.pool(Environment::Online).is_none());
        assert!(matches!(state.transfer_pools(), Err(DevlogError::IncompletePools)));

        let errors = state.logs().page(LevelFilter::Only(LogLevel::Error), 10, 0);
        assert_eq!(errors.total, 1);
        assert_eq!(errors.logs[0].message, "failed to create ONLINE connection pool");
    }

    #[tokio::test]
    async fn test_environment_statuses() {
        let state =
            DevlogState::initialize(config_with(Some("postgres://devlog@127.0.0.1:1/offline"), None));
        let statuses = state.environment_statuses().await;

        let offline = &statuses[&Environment::Offline];
        assert_eq!(offline.status, ConnectionStatus::Error);
        assert!(offline.error.is_some());
        assert_eq!(offline.db_url, "configured");

        let online = &statuses[&Environment::Online];
        assert_eq!(online.status, ConnectionStatus::Disconnected);
        assert_eq!(online.db_url, "not configured");
    }

    #[tokio::test]
    async fn test_idle_reaper_stops_on_shutdown() {
        let state = Arc::new(DevlogState::initialize(DevlogConfig::default()));
        let reaper = state.spawn_idle_reaper();
        state.shutdown();
        tokio::time::timeout(Duration::from_secs(5), reaper).await.unwrap().unwrap();
    }
}
