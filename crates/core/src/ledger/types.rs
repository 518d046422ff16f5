use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Fid, Heading, Point};

/// Machine-readable reason a point ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureReason {
    CoordinateConversionFailed,
    PanoramaIdNotFound,
    InsufficientTiles,
    /// Assembly failed; carries the final stitch status or pre-check error.
    AssemblyFailed(String),
    /// A reason this version does not know, kept verbatim from an older ledger.
    Other(String),
}

/// Reason without its detail, used for configuration and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CoordinateConversionFailed,
    PanoramaIdNotFound,
    InsufficientTiles,
    AssemblyFailed,
    Other,
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::CoordinateConversionFailed => FailureKind::CoordinateConversionFailed,
            Self::PanoramaIdNotFound => FailureKind::PanoramaIdNotFound,
            Self::InsufficientTiles => FailureKind::InsufficientTiles,
            Self::AssemblyFailed(_) => FailureKind::AssemblyFailed,
            Self::Other(_) => FailureKind::Other,
        }
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoordinateConversionFailed => "coordinate_conversion_failed",
            Self::PanoramaIdNotFound => "panorama_id_not_found",
            Self::InsufficientTiles => "insufficient_tiles",
            Self::AssemblyFailed => "assembly_failed",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoordinateConversionFailed => f.write_str("CoordinateConversionFailed"),
            Self::PanoramaIdNotFound => f.write_str("PanoramaIdNotFound"),
            Self::InsufficientTiles => f.write_str("InsufficientTiles"),
            Self::AssemblyFailed(status) => write!(f, "AssemblyFailed: {}", status),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl FromStr for FailureReason {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "CoordinateConversionFailed" => Self::CoordinateConversionFailed,
            "PanoramaIdNotFound" => Self::PanoramaIdNotFound,
            "InsufficientTiles" => Self::InsufficientTiles,
            _ => match s.strip_prefix("AssemblyFailed") {
                Some(rest) => Self::AssemblyFailed(
                    rest.trim_start_matches(':').trim().to_string(),
                ),
                None => Self::Other(s.to_string()),
            },
        })
    }
}

/// Terminal outcome of one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        tile_count: usize,
    },
    Failed {
        reason: FailureReason,
        tile_count: Option<usize>,
    },
}

impl Outcome {
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed {
            reason,
            tile_count: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One ledger line: `FID,WGS_X,WGS_Y,Reason,TileCount,RecordedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    #[serde(rename = "FID")]
    pub fid: String,
    #[serde(rename = "WGS_X")]
    pub wgs_x: String,
    #[serde(rename = "WGS_Y")]
    pub wgs_y: String,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "TileCount")]
    pub tile_count: Option<usize>,
    #[serde(rename = "RecordedAt")]
    pub recorded_at: Option<String>,
}

impl LedgerRow {
    pub const HEADER: &'static [&'static str] =
        &["FID", "WGS_X", "WGS_Y", "Reason", "TileCount", "RecordedAt"];

    /// Rebuild a row from a CSV record by position.
    ///
    /// Older ledgers have only the first four columns; anything shorter is
    /// not a ledger row.
    pub fn from_record(record: &csv::StringRecord) -> Option<Self> {
        let field = |i: usize| record.get(i).map(|v| v.trim().to_string());
        let fid = field(0).filter(|v| !v.is_empty())?;

        Some(Self {
            fid,
            wgs_x: field(1)?,
            wgs_y: field(2)?,
            reason: field(3)?,
            tile_count: field(4).and_then(|v| v.parse().ok()),
            recorded_at: field(5).filter(|v| !v.is_empty()),
        })
    }
}

/// One line of the degraded-assembly record: `FID,ImageCount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteRow {
    #[serde(rename = "FID")]
    pub fid: String,
    #[serde(rename = "ImageCount")]
    pub image_count: usize,
}

impl IncompleteRow {
    pub const HEADER: &'static [&'static str] = &["FID", "ImageCount"];

    pub fn new(fid: &Fid, image_count: usize) -> Self {
        Self {
            fid: fid.to_string(),
            image_count,
        }
    }
}

/// One line of the failed-heading record: `FID,WGS_X,WGS_Y,Heading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileFailureRow {
    #[serde(rename = "FID")]
    pub fid: String,
    #[serde(rename = "WGS_X")]
    pub wgs_x: String,
    #[serde(rename = "WGS_Y")]
    pub wgs_y: String,
    #[serde(rename = "Heading")]
    pub heading: u16,
}

impl TileFailureRow {
    pub const HEADER: &'static [&'static str] = &["FID", "WGS_X", "WGS_Y", "Heading"];

    pub fn new(point: &Point, heading: Heading) -> Self {
        Self {
            fid: point.fid.to_string(),
            wgs_x: point.wgs_x.clone(),
            wgs_y: point.wgs_y.clone(),
            heading: heading.degrees(),
        }
    }
}
