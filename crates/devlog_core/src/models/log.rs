//! Operational log entry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log-ring entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine progress
    Info,
    /// Something skipped or degraded
    Warn,
    /// A failed operation
    Error,
}

impl LogLevel {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One operational event.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Ring-assigned, strictly increasing identifier
    pub id: u64,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Short description with a context tag
    pub message: String,
    /// Optional payload (SQL excerpt, error text)
    pub data: Option<String>,
}

/// Filter applied when reading the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFilter {
    /// Every entry
    #[default]
    All,
    /// Only entries of one level
    Only(LogLevel),
}

impl LevelFilter {
    /// Parse a query-string value; absent or `all` means no filtering.
    pub fn from_param(param: Option<&str>) -> Result<Self, String> {
        match param {
            None | Some("") | Some("all") => Ok(Self::All),
            Some(level) => LogLevel::parse(level)
                .map(Self::Only)
                .ok_or_else(|| format!("unknown log level: {level}")),
        }
    }

    /// Check whether an entry passes the filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Only(level) => entry.level == *level,
        }
    }
}

/// A page of log entries, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    /// Entries matching the filter
    pub total: usize,
    /// Requested offset
    pub offset: usize,
    /// Requested limit
    pub limit: usize,
    /// The page itself
    pub logs: Vec<LogEntry>,
}
