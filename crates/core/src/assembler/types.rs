//! Stitch request and status types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result of one stitch attempt, numbered like OpenCV's `Stitcher::Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StitchStatus {
    Ok,
    NeedMoreImages,
    HomographyEstimationFailed,
    CameraParameterAdjustmentFailed,
    OtherFailure,
}

impl StitchStatus {
    /// Map a stitching tool exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NeedMoreImages,
            2 => Self::HomographyEstimationFailed,
            3 => Self::CameraParameterAdjustmentFailed,
            _ => Self::OtherFailure,
        }
    }

    /// Recognize the failure messages `stitching_detailed` prints before
    /// exiting with -1.
    pub fn from_message(output: &str) -> Option<Self> {
        let output = output.to_ascii_lowercase();
        if output.contains("need more images") {
            Some(Self::NeedMoreImages)
        } else if output.contains("homography estimation failed") {
            Some(Self::HomographyEstimationFailed)
        } else if output.contains("camera parameters adjusting failed") {
            Some(Self::CameraParameterAdjustmentFailed)
        } else {
            None
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::NeedMoreImages => "NeedMoreImages",
            Self::HomographyEstimationFailed => "HomographyEstimationFailed",
            Self::CameraParameterAdjustmentFailed => "CameraParameterAdjustmentFailed",
            Self::OtherFailure => "OtherFailure",
        }
    }
}

impl fmt::Display for StitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the stitch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionBackend {
    /// GPU-accelerated pipeline.
    Accelerated,
    Cpu,
}

impl ExecutionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ExecutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stitch invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchRequest {
    /// Images in heading order.
    pub images: Vec<PathBuf>,
    pub output: PathBuf,
    pub backend: ExecutionBackend,
}
