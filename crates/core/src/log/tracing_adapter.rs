//! Adapter from [`Logger`] to the `tracing` macros.

use std::fmt::Arguments;

use crate::log::{LogLevel, Logger};

/// Forwards every message to `tracing`, so whatever subscriber the binary
/// installs (console, JSON, per-run file) receives it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", args),
            LogLevel::Debug => tracing::debug!("{}", args),
            LogLevel::Info => tracing::info!("{}", args),
            LogLevel::Warn => tracing::warn!("{}", args),
            LogLevel::Error => tracing::error!("{}", args),
        }
    }
}
