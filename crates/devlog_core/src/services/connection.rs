//! Database connection pooling with deadpool-postgres.
//!
//! Provides:
//! - Pool construction from a connection string without connecting
//! - Pool status reporting for the environments view
//! - Idle connection eviction

use crate::config::PoolSettings;
use crate::error::DevlogError;
use crate::models::{Environment, PoolStatus};

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::NoTls;

/// A managed pool of database connections for one environment.
pub struct ConnectionPool {
    env: Environment,
    pool: Pool,
}

impl ConnectionPool {
    /// Create a pool from a connection string.
    ///
    /// No connection is opened here; the first checkout connects. Fails only
    /// when the connection string cannot be parsed or the pool cannot be built.
    pub fn from_url(
        env: Environment,
        url: &str,
        settings: &PoolSettings,
    ) -> Result<Self, DevlogError> {
        let mut pg_config = tokio_postgres::Config::from_str(url)
            .map_err(|e| DevlogError::connection(format!("Invalid connection string: {e}")))?;
        pg_config.connect_timeout(settings.connect_timeout());
        pg_config.application_name("devlog");
        pg_config.keepalives(true);

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );

        let pool = Pool::builder(manager)
            .max_size(settings.max_size)
            .wait_timeout(Some(settings.connect_timeout()))
            .create_timeout(Some(settings.connect_timeout()))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| DevlogError::connection(format!("Failed to create pool: {e}")))?;

        tracing::info!(env = %env, max_size = settings.max_size, "Connection pool created");

        Ok(Self { env, pool })
    }

    /// Get the environment this pool serves.
    pub fn env(&self) -> Environment {
        self.env
    }

    /// Acquire a connection from the pool.
    pub async fn get(&self) -> Result<PooledConnection, DevlogError> {
        let client = self.pool.get().await.map_err(|e| {
            tracing::warn!(env = %self.env, error = %e, "Failed to acquire connection");
            DevlogError::from(e)
        })?;
        Ok(PooledConnection { client, env: self.env })
    }

    /// Probe the server and return its version string.
    pub async fn server_version(&self) -> Result<String, DevlogError> {
        let conn = self.get().await?;
        let row = conn.query_one("SELECT version()", &[]).await?;
        Ok(row.get(0))
    }

    /// Get current pool status.
    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available as isize,
            waiting: status.waiting,
        }
    }

    /// Drop idle connections that have not been used for `idle_timeout`.
    ///
    /// Returns the number of connections removed.
    pub fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let result = self.pool.retain(|_, metrics| metrics.last_used() < idle_timeout);
        let removed = result.removed.len();
        if removed > 0 {
            tracing::debug!(env = %self.env, removed, "Evicted idle connections");
        }
        removed
    }

    /// Close the pool, dropping all connections.
    pub fn close(&self) {
        self.pool.close();
        tracing::info!(env = %self.env, "Connection pool closed");
    }

    /// Check if the pool is closed.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A connection acquired from the pool.
///
/// Automatically returns to the pool when dropped.
pub struct PooledConnection {
    client: deadpool_postgres::Client,
    env: Environment,
}

impl PooledConnection {
    /// Get the environment this connection belongs to.
    pub fn env(&self) -> Environment {
        self.env
    }

    /// Execute a query that returns rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, DevlogError> {
        self.client.query(sql, params).await.map_err(DevlogError::from)
    }

    /// Execute a query that returns exactly one row.
    pub async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<tokio_postgres::Row, DevlogError> {
        self.client.query_one(sql, params).await.map_err(DevlogError::from)
    }

    /// Run a prepared statement that returns rows.
    pub async fn query_prepared(
        &self,
        statement: &tokio_postgres::Statement,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, DevlogError> {
        self.client.query(statement, params).await.map_err(DevlogError::from)
    }

    /// Execute a query that doesn't return rows.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64, DevlogError> {
        self.client.execute(sql, params).await.map_err(DevlogError::from)
    }

    /// Run a prepared statement that doesn't return rows.
    pub async fn execute_prepared(
        &self,
        statement: &tokio_postgres::Statement,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64, DevlogError> {
        self.client.execute(statement, params).await.map_err(DevlogError::from)
    }

    /// Prepare a statement for repeated execution.
    pub async fn prepare(&self, sql: &str) -> Result<tokio_postgres::Statement, DevlogError> {
        self.client.prepare(sql).await.map_err(DevlogError::from)
    }

    /// Prepare a statement with explicit parameter types.
    pub async fn prepare_typed(
        &self,
        sql: &str,
        types: &[tokio_postgres::types::Type],
    ) -> Result<tokio_postgres::Statement, DevlogError> {
        self.client.prepare_typed(sql, types).await.map_err(DevlogError::from)
    }
}
