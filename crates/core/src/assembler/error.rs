//! Error types for the assembler module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::StitchStatus;

/// Engine-level failures: the stitch could not be run at all.
#[derive(Debug, Error)]
pub enum StitchError {
    /// Stitching program not found.
    #[error("stitching program not found: {program}")]
    EngineNotFound { program: String },

    /// Stitch timed out.
    #[error("stitch timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Program reported success but wrote nothing.
    #[error("stitch output not created: {path}")]
    OutputMissing { path: PathBuf },

    /// I/O error while running the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a tile set could not be turned into a panorama.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no tiles to assemble")]
    NoTiles,

    #[error("unreadable tile {path}: {reason}")]
    UnreadableTile { path: PathBuf, reason: String },

    #[error("tiles have different dimensions: {dimensions:?}")]
    InconsistentImageDimensions { dimensions: Vec<(u32, u32)> },

    /// Both backends were tried; `status` is the last one's.
    #[error("stitch failed with {status}")]
    StitchFailed {
        status: StitchStatus,
        detail: Option<String>,
    },
}

impl AssemblyError {
    /// Short label stored in the ledger after `AssemblyFailed: `.
    pub fn label(&self) -> String {
        match self {
            Self::NoTiles => "NoTiles".to_string(),
            Self::UnreadableTile { .. } => "UnreadableTile".to_string(),
            Self::InconsistentImageDimensions { .. } => "InconsistentImageDimensions".to_string(),
            Self::StitchFailed { status, .. } => status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(
            AssemblyError::StitchFailed {
                status: StitchStatus::CameraParameterAdjustmentFailed,
                detail: None
            }
            .label(),
            "CameraParameterAdjustmentFailed"
        );
        assert_eq!(
            AssemblyError::InconsistentImageDimensions {
                dimensions: vec![(1024, 512), (512, 256)]
            }
            .label(),
            "InconsistentImageDimensions"
        );
    }
}
