//! Per-store logging handle.
//!
//! The store never configures the global logger. Each store owns a
//! `StoreLogger` created from its configuration at open time; messages go
//! through the `log` facade under the configured target and are filtered by
//! the store's own level before reaching whatever logger the host installed.

use std::fmt;

use log::{Level, LevelFilter};

/// Logging handle owned by an [`AnnotationStore`](super::AnnotationStore).
#[derive(Debug, Clone)]
pub struct StoreLogger {
    target: String,
    max_level: LevelFilter,
}

impl StoreLogger {
    /// Create a logger for the given target and level.
    pub fn new(target: impl Into<String>, max_level: LevelFilter) -> Self {
        Self {
            target: target.into(),
            max_level,
        }
    }

    /// Log target used for every message.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Check whether messages at `level` pass this logger's filter.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    /// Emit a message at the given level.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(target: self.target.as_str(), level, "{}", args);
        }
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }
}
