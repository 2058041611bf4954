//! Service configuration.
//!
//! Layering, lowest priority first: built-in defaults, an optional TOML file,
//! then environment variables. CLI flags are applied by the binary on top.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::DevlogError;
use crate::models::Environment;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default log-ring capacity.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DevlogConfig {
    pub server: ServerConfig,
    pub offline: DatabaseConfig,
    pub online: DatabaseConfig,
    pub pool: PoolSettings,
    pub logs: LogRingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: format!("0.0.0.0:{DEFAULT_PORT}") }
    }
}

/// Connection settings for one environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// libpq-style URL or key/value connection string
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// Check if a non-empty connection string is set.
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Pool sizing and timeouts shared by both environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_size: usize,
    pub idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { max_size: 5, idle_timeout_secs: 30, connect_timeout_secs: 2 }
    }
}

impl PoolSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRingConfig {
    pub capacity: usize,
}

impl Default for LogRingConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_LOG_CAPACITY }
    }
}

impl DevlogConfig {
    /// Connection settings for an environment.
    pub fn database(&self, env: Environment) -> &DatabaseConfig {
        match env {
            Environment::Offline => &self.offline,
            Environment::Online => &self.online,
        }
    }

    /// Overlay values from a variable lookup.
    ///
    /// `OFFLINE_DB_URL` falls back to `DATABASE_URL`; `PORT` rebinds to all
    /// interfaces on that port.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), DevlogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OFFLINE_DB_URL").or_else(|| lookup("DATABASE_URL")) {
            self.offline.url = Some(url);
        }
        if let Some(url) = lookup("ONLINE_DB_URL") {
            self.online.url = Some(url);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| DevlogError::config(format!("PORT is not a valid port: {port}")))?;
            self.server.bind = format!("0.0.0.0:{port}");
        }
        Ok(())
    }

    /// Reject settings that cannot produce a working service.
    pub fn validate(&self) -> Result<(), DevlogError> {
        if self.pool.max_size == 0 {
            return Err(DevlogError::config("pool.max_size must be at least 1"));
        }
        if self.logs.capacity == 0 {
            return Err(DevlogError::config("logs.capacity must be at least 1"));
        }
        Ok(())
    }

    /// Copy safe to print: connection strings replaced by a marker.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for db in [&mut copy.offline, &mut copy.online] {
            if db.url.is_some() {
                db.url = Some("<redacted>".to_string());
            }
        }
        copy
    }
}

/// Load configuration from an optional TOML file plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<DevlogConfig, DevlogError> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                DevlogError::config(format!("failed to read {}: {e}", path.display()))
            })?;
            toml::from_str::<DevlogConfig>(&raw)?
        }
        None => DevlogConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DevlogConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.pool.max_size, 5);
        assert_eq!(config.pool.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.pool.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.logs.capacity, 1000);
        assert!(!config.offline.is_configured());
        assert!(!config.online.is_configured());
    }

    #[test]
    fn test_env_overlay() {
        let mut config = DevlogConfig::default();
        config
            .apply_env(lookup(&[
                ("OFFLINE_DB_URL", "postgres://test@localhost/offline"),
                ("ONLINE_DB_URL", "postgres://prod@db/online"),
                ("PORT", "8080"),
            ]))
            .unwrap();
        assert_eq!(config.offline.url.as_deref(), Some("postgres://test@localhost/offline"));
        assert_eq!(config.online.url.as_deref(), Some("postgres://prod@db/online"));
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_database_url_fallback_for_offline() {
        let mut config = DevlogConfig::default();
        config.apply_env(lookup(&[("DATABASE_URL", "postgres://fallback/db")])).unwrap();
        assert_eq!(config.offline.url.as_deref(), Some("postgres://fallback/db"));
        assert!(config.online.url.is_none());

        let mut config = DevlogConfig::default();
        config
            .apply_env(lookup(&[
                ("DATABASE_URL", "postgres://fallback/db"),
                ("OFFLINE_DB_URL", "postgres://explicit/db"),
            ]))
            .unwrap();
        assert_eq!(config.offline.url.as_deref(), Some("postgres://explicit/db"));
    }

    #[test]
    fn test_invalid_port() {
        let mut config = DevlogConfig::default();
        let err = config.apply_env(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT is not a valid port"));
    }

    #[test]
    fn test_toml_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devlog.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "127.0.0.1:9000"

[online]
url = "postgres://prod@db/online"

[pool]
max_size = 8
"#,
        )
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let config: DevlogConfig = toml::from_str(&raw).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.online.url.as_deref(), Some("postgres://prod@db/online"));
        assert_eq!(config.pool.max_size, 8);
        assert_eq!(config.pool.idle_timeout_secs, 30);
        assert_eq!(config.logs.capacity, 1000);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, DevlogError::Config { .. }));
    }

    #[test]
    fn test_validate_and_redact() {
        let mut config = DevlogConfig::default();
        config.pool.max_size = 0;
        assert!(config.validate().is_err());

        let mut config = DevlogConfig::default();
        config.online.url = Some("postgres://user:secret@db/online".into());
        let redacted = config.redacted();
        assert_eq!(redacted.online.url.as_deref(), Some("<redacted>"));
        assert!(redacted.offline.url.is_none());
    }
}
