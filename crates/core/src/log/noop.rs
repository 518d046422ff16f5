//! Logger that discards everything.

use std::fmt::Arguments;

use crate::log::{LogLevel, Logger};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline]
    fn log(&self, _level: LogLevel, _args: Arguments<'_>) {}
}
