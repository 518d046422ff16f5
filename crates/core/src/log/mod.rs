//! Injected logging for pipeline components.
//!
//! Every component receives an `Arc<dyn Logger>` at construction instead of
//! reaching for a process-wide logger. The binary wires in [`TracingLogger`];
//! tests use [`NoOpLogger`] or `testing::MemoryLogger` to assert on messages.

mod noop;
mod tracing_adapter;
mod r#trait;

pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
