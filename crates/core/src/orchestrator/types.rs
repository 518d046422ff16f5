//! Types for the point pipeline.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::assembler::ExecutionBackend;
use crate::ledger::{FailureReason, LedgerError};
use crate::tiles::TileStoreError;
use crate::types::Fid;

/// Errors that prevent the pipeline from starting.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("tile store error: {0}")]
    TileStore(#[from] TileStoreError),
}

/// Where a point is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointState {
    NotStarted,
    CoordinatesResolved,
    IdResolved,
    TilesEvaluated,
    Assembled,
    Failed(FailureReason),
}

impl fmt::Display for PointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("NotStarted"),
            Self::CoordinatesResolved => f.write_str("CoordinatesResolved"),
            Self::IdResolved => f.write_str("IdResolved"),
            Self::TilesEvaluated => f.write_str("TilesEvaluated"),
            Self::Assembled => f.write_str("Assembled"),
            Self::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Why a point did no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `<panoramas>/<FID>.png` already exists.
    PanoramaExists,
    /// The ledger holds a terminal entry.
    Ledger,
}

/// Terminal result of one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointOutcome {
    Skipped(SkipReason),
    Assembled {
        tile_count: usize,
        backend: ExecutionBackend,
        fell_back: bool,
    },
    Failed {
        reason: FailureReason,
        tile_count: Option<usize>,
    },
}

impl PointOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// What happened to one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointReport {
    pub fid: Fid,
    pub outcome: PointOutcome,
    /// States visited, starting with `NotStarted`.
    pub states: Vec<PointState>,
    pub tiles_downloaded: usize,
    pub tiles_failed: usize,
    /// The ledger append for this point failed.
    pub ledger_write_failed: bool,
}

impl PointReport {
    pub fn final_state(&self) -> Option<&PointState> {
        self.states.last()
    }
}

/// A point's progress while it is still being worked on.
#[derive(Debug)]
pub(crate) struct PointProgress {
    fid: Fid,
    states: Vec<PointState>,
    pub tiles_downloaded: usize,
    pub tiles_failed: usize,
    pub ledger_write_failed: bool,
}

impl PointProgress {
    pub fn new(fid: Fid) -> Self {
        Self {
            fid,
            states: vec![PointState::NotStarted],
            tiles_downloaded: 0,
            tiles_failed: 0,
            ledger_write_failed: false,
        }
    }

    pub fn state(&self) -> Option<&PointState> {
        self.states.last()
    }

    pub fn push_state(&mut self, next: PointState) {
        self.states.push(next);
    }

    pub fn finish(self, outcome: PointOutcome) -> PointReport {
        PointReport {
            fid: self.fid,
            outcome,
            states: self.states,
            tiles_downloaded: self.tiles_downloaded,
            tiles_failed: self.tiles_failed,
            ledger_write_failed: self.ledger_write_failed,
        }
    }
}

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped_existing: usize,
    pub skipped_ledger: usize,
    pub assembled: usize,
    /// Assembled from fewer than all headings.
    pub degraded: usize,
    /// Assembled on the CPU after the primary backend failed.
    pub fell_back: usize,
    /// Failed points by failure kind.
    pub failed: BTreeMap<&'static str, usize>,
    pub tiles_downloaded: usize,
    pub tiles_failed: usize,
    pub ledger_write_errors: usize,
    /// Input rows dropped before the run.
    pub malformed_rows: usize,
}

impl RunSummary {
    pub fn failed_total(&self) -> usize {
        self.failed.values().sum()
    }

    pub(crate) fn add(&mut self, report: &PointReport) {
        self.total += 1;
        self.tiles_downloaded += report.tiles_downloaded;
        self.tiles_failed += report.tiles_failed;
        if report.ledger_write_failed {
            self.ledger_write_errors += 1;
        }

        match &report.outcome {
            PointOutcome::Skipped(SkipReason::PanoramaExists) => self.skipped_existing += 1,
            PointOutcome::Skipped(SkipReason::Ledger) => self.skipped_ledger += 1,
            PointOutcome::Assembled {
                tile_count,
                fell_back,
                ..
            } => {
                self.assembled += 1;
                if *tile_count < crate::types::Heading::COUNT {
                    self.degraded += 1;
                }
                if *fell_back {
                    self.fell_back += 1;
                }
            }
            PointOutcome::Failed { reason, .. } => {
                *self.failed.entry(reason.kind().as_str()).or_insert(0) += 1;
            }
        }
    }
}
