//! Bounded in-memory log of operational events.
//!
//! Newest entries come first. Every entry is also emitted through `tracing`
//! at the matching level so the ring and the process log agree.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;

use crate::config::DEFAULT_LOG_CAPACITY;
use crate::models::{LevelFilter, LogEntry, LogLevel, LogPage};

struct Inner {
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

/// Process-wide ring buffer of [`LogEntry`] values.
pub struct LogRing {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogRing {
    /// Create a ring holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { entries: VecDeque::with_capacity(capacity), next_id: 0 }),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest one past capacity.
    pub fn push(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<String>,
    ) -> LogEntry {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(data = data.as_deref(), "{message}"),
            LogLevel::Warn => tracing::warn!(data = data.as_deref(), "{message}"),
            LogLevel::Error => tracing::error!(data = data.as_deref(), "{message}"),
        }

        let mut inner = self.inner.lock();
        let entry = LogEntry { id: inner.next_id, timestamp: Utc::now(), level, message, data };
        inner.next_id += 1;
        inner.entries.push_front(entry.clone());
        if inner.entries.len() > self.capacity {
            inner.entries.pop_back();
        }
        entry
    }

    /// Record an info entry.
    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.push(LogLevel::Info, message, None)
    }

    /// Record an info entry with a payload.
    pub fn info_with(&self, message: impl Into<String>, data: impl Into<String>) -> LogEntry {
        self.push(LogLevel::Info, message, Some(data.into()))
    }

    /// Record a warning.
    pub fn warn(&self, message: impl Into<String>) -> LogEntry {
        self.push(LogLevel::Warn, message, None)
    }

    /// Record an error with its detail.
    pub fn error(&self, message: impl Into<String>, detail: impl ToString) -> LogEntry {
        self.push(LogLevel::Error, message, Some(detail.to_string()))
    }

    /// Read a page of entries, newest first.
    pub fn page(&self, filter: LevelFilter, limit: usize, offset: usize) -> LogPage {
        let inner = self.inner.lock();
        let matching = inner.entries.iter().filter(|e| filter.matches(e));
        let total = matching.clone().count();
        let logs = matching.skip(offset).take(limit).cloned().collect();
        LogPage { total, offset, limit, logs }
    }

    /// Remove every entry. Ids keep increasing afterwards.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}
