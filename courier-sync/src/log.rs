//! Diagnostic log for the sync subsystem.
//!
//! Sync never interrupts the user; failures surface only here. The log is
//! a capped ring buffer whose tail the settings screen renders, and every
//! line also fans out through `tracing` for normal log collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Default number of retained lines.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => f.write_str("debug"),
            Self::Info => f.write_str("info"),
            Self::Warn => f.write_str("warn"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One timestamped log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Ring buffer of sync log lines.
pub struct SyncLog {
    capacity: usize,
    lines: Mutex<VecDeque<LogLine>>,
}

impl SyncLog {
    /// Creates a log retaining up to `capacity` lines.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn push(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "courier_sync", "{message}"),
            LogLevel::Info => tracing::info!(target: "courier_sync", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "courier_sync", "{message}"),
            LogLevel::Error => tracing::error!(target: "courier_sync", "{message}"),
        }

        let mut lines = self.lines.lock().unwrap();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(LogLine {
            at: Utc::now(),
            level,
            message,
        });
    }

    /// Records a debug line.
    pub fn debug(&self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into());
    }

    /// Records an info line.
    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    /// Records a warning line.
    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    /// Records an error line.
    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    /// Returns every retained line, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap().iter().cloned().collect()
    }

    /// Returns the newest `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogLine> {
        let lines = self.lines.lock().unwrap();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    /// Drops all retained lines.
    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }
}

impl Default for SyncLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}
