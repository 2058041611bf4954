//! Environment identity, connection status and pool status models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DevlogError;

/// One of the two fixed database targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Test database, the source of every transfer
    Offline,
    /// Production database, the destination of every transfer
    Online,
}

impl Environment {
    /// Every environment, in display order.
    pub const ALL: [Environment; 2] = [Environment::Offline, Environment::Online];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
        }
    }

    /// Human-readable name shown on the dashboard.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE (test)",
            Self::Online => "ONLINE (production)",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offline" => Some(Self::Offline),
            "online" => Some(Self::Online),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DevlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DevlogError::invalid_request("invalid environment"))
    }
}

/// Reachability of an environment as seen by the status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No pool configured
    #[default]
    Disconnected,
    /// Probe query succeeded
    Connected,
    /// Pool exists but the probe failed
    Error,
}

/// Connection pool status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    /// Maximum pool capacity
    pub max_size: usize,
    /// Current connections (idle + active)
    pub size: usize,
    /// Idle connections (can be negative during contention)
    pub available: isize,
    /// Tasks waiting for connections
    pub waiting: usize,
}

impl PoolStatus {
    /// Number of idle connections, never negative.
    pub fn idle(&self) -> usize {
        self.available.max(0) as usize
    }
}

/// Server details gathered by a successful probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInfo {
    /// Output of `SELECT version()`
    pub version: String,
    /// Open connections in the pool
    pub pool_size: usize,
    /// Idle connections in the pool
    pub idle_count: usize,
    /// Pool capacity
    pub max_size: usize,
}

/// Per-environment status reported to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    /// Display name
    pub name: &'static str,
    /// Reachability
    pub status: ConnectionStatus,
    /// Probe failure message
    pub error: Option<String>,
    /// Server details when connected
    pub db_info: Option<DbInfo>,
    /// Whether a connection string was supplied ("configured" / "not configured")
    pub db_url: &'static str,
}

impl EnvironmentStatus {
    /// Status for an environment that has no pool.
    pub fn disconnected(env: Environment, configured: bool) -> Self {
        Self {
            name: env.display_name(),
            status: ConnectionStatus::Disconnected,
            error: None,
            db_info: None,
            db_url: configured_label(configured),
        }
    }

    /// Status for a pool whose probe succeeded.
    pub fn connected(env: Environment, version: String, pool: PoolStatus) -> Self {
        Self {
            name: env.display_name(),
            status: ConnectionStatus::Connected,
            error: None,
            db_info: Some(DbInfo {
                version,
                pool_size: pool.size,
                idle_count: pool.idle(),
                max_size: pool.max_size,
            }),
            db_url: configured_label(true),
        }
    }

    /// Status for a pool whose probe failed.
    pub fn failed(env: Environment, message: impl Into<String>) -> Self {
        Self {
            name: env.display_name(),
            status: ConnectionStatus::Error,
            error: Some(message.into()),
            db_info: None,
            db_url: configured_label(true),
        }
    }
}

fn configured_label(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "not configured"
    }
}
