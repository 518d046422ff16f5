//! Per-point pipeline driver.
//!
//! Every point moves through an explicit state machine:
//! - **Skip check**: existing panorama, then the ledger
//! - **Resolution**: coordinates (rate limited), then panorama id (retried)
//! - **Tiles**: missing headings fetched, then evaluated against the policy
//! - **Assembly**: accelerated backend with CPU fallback
//!
//! Every terminal state is recorded in the ledger exactly once.

mod config;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use runner::PanoramaPipeline;
pub use types::{PipelineError, PointOutcome, PointReport, PointState, RunSummary, SkipReason};
