//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the per-point pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause after every processed point (milliseconds).
    /// Skipped points are not followed by a pause.
    #[serde(default = "default_inter_point_delay")]
    pub inter_point_delay_ms: u64,

    /// Process at most this many points per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<usize>,

    /// Write metrics in Prometheus text format here at the end of a run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<PathBuf>,
}

fn default_inter_point_delay() -> u64 {
    6000 // 6 seconds
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_point_delay_ms: default_inter_point_delay(),
            max_points: None,
            metrics_path: None,
        }
    }
}
