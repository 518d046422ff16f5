//! Persistent record of per-point terminal outcomes.
//!
//! The ledger file is loaded once when a run starts; from then on the
//! in-memory index decides which points are skipped. Failed outcomes are
//! appended to the file and synced before [`ProgressLedger::record`]
//! returns. Successes stay in memory only: the panorama on disk is their
//! durable signal.

mod append;
mod types;

pub use append::CsvAppendLog;
pub use types::*;

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log::Logger;
use crate::types::{Fid, Point};
use crate::{log_info, log_warn};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("ledger CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Ledger behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Failure kinds that are not loaded into the skip index, so points that
    /// failed that way are tried again on the next run.
    #[serde(default)]
    pub retry_reasons: Vec<FailureKind>,
}

/// Counts from loading an existing ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerLoadStats {
    /// Entries placed in the skip index.
    pub loaded: usize,
    /// Entries left out because their kind is in `retry_reasons`.
    pub requeued: usize,
    /// Lines that were not ledger rows.
    pub malformed: usize,
}

pub struct ProgressLedger {
    log: CsvAppendLog<LedgerRow>,
    index: HashMap<Fid, Outcome>,
    stats: LedgerLoadStats,
    logger: Arc<dyn Logger>,
}

impl ProgressLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn open(
        path: impl Into<PathBuf>,
        config: &LedgerConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let retry_kinds: HashSet<FailureKind> = config.retry_reasons.iter().copied().collect();
        let mut index = HashMap::new();
        let mut stats = LedgerLoadStats::default();

        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(&path)?;

            for record in reader.records() {
                let row = match record.ok().as_ref().and_then(LedgerRow::from_record) {
                    Some(row) => row,
                    None => {
                        stats.malformed += 1;
                        continue;
                    }
                };

                let reason: FailureReason = match row.reason.parse() {
                    Ok(reason) => reason,
                    Err(never) => match never {},
                };
                if retry_kinds.contains(&reason.kind()) {
                    stats.requeued += 1;
                    continue;
                }

                index.insert(
                    Fid::new(row.fid),
                    Outcome::Failed {
                        reason,
                        tile_count: row.tile_count,
                    },
                );
                stats.loaded += 1;
            }

            log_info!(
                logger,
                "ledger {}: {} entries loaded, {} requeued for retry",
                path.display(),
                stats.loaded,
                stats.requeued
            );
            if stats.malformed > 0 {
                log_warn!(
                    logger,
                    "ledger {}: {} malformed lines ignored",
                    path.display(),
                    stats.malformed
                );
            }
        }

        Ok(Self {
            log: CsvAppendLog::new(path, LedgerRow::HEADER),
            index,
            stats,
            logger,
        })
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn load_stats(&self) -> LedgerLoadStats {
        self.stats
    }

    /// Whether `fid` already has a terminal outcome.
    pub fn is_resolved(&self, fid: &Fid) -> bool {
        self.index.contains_key(fid)
    }

    pub fn status(&self, fid: &Fid) -> Option<&Outcome> {
        self.index.get(fid)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Record the terminal outcome of `point`.
    ///
    /// The index is updated before the append, so a point is never retried
    /// within the run even when the write fails.
    pub fn record(&mut self, point: &Point, outcome: Outcome) -> Result<(), LedgerError> {
        let row = match &outcome {
            Outcome::Success { .. } => None,
            Outcome::Failed { reason, tile_count } => Some(LedgerRow {
                fid: point.fid.to_string(),
                wgs_x: point.wgs_x.clone(),
                wgs_y: point.wgs_y.clone(),
                reason: reason.to_string(),
                tile_count: *tile_count,
                recorded_at: Some(chrono::Utc::now().to_rfc3339()),
            }),
        };

        self.index.insert(point.fid.clone(), outcome);

        if let Some(row) = row {
            self.log.append(&row)?;
            log_info!(
                self.logger,
                "FID {}: recorded {} in ledger",
                row.fid,
                row.reason
            );
        }
        Ok(())
    }

    /// Move the ledger aside so every recorded failure is retried.
    ///
    /// Returns the archive path, or `None` when there was no ledger.
    pub fn reset(path: &Path) -> Result<Option<PathBuf>, LedgerError> {
        if !path.exists() {
            return Ok(None);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let archive = path.with_file_name(format!("{}.{}.csv", stem, stamp));

        std::fs::rename(path, &archive).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(archive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoOpLogger;
    use tempfile::TempDir;

    fn open(path: &Path, retry_reasons: Vec<FailureKind>) -> ProgressLedger {
        ProgressLedger::open(
            path,
            &LedgerConfig { retry_reasons },
            Arc::new(NoOpLogger),
        )
        .unwrap()
    }

    fn point(fid: &str) -> Point {
        Point::new(fid, "116.39", "39.91")
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let temp = TempDir::new().unwrap();
        let ledger = open(&temp.path().join("ledger.csv"), vec![]);
        assert!(ledger.is_empty());
        assert!(!ledger.is_resolved(&Fid::new("1")));
    }

    #[test]
    fn test_failure_is_durable_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");

        {
            let mut ledger = open(&path, vec![]);
            ledger
                .record(&point("3"), Outcome::failed(FailureReason::PanoramaIdNotFound))
                .unwrap();
            assert!(ledger.is_resolved(&Fid::new("3")));
        }

        let reopened = open(&path, vec![]);
        assert!(reopened.is_resolved(&Fid::new("3")));
        assert_eq!(
            reopened.status(&Fid::new("3")),
            Some(&Outcome::failed(FailureReason::PanoramaIdNotFound))
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("FID,WGS_X,WGS_Y,Reason,TileCount,RecordedAt\n"));
        assert!(content.contains("3,116.39,39.91,PanoramaIdNotFound,,"));
    }

    #[test]
    fn test_success_is_not_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        let mut ledger = open(&path, vec![]);

        ledger
            .record(&point("1"), Outcome::Success { tile_count: 8 })
            .unwrap();

        assert!(ledger.is_resolved(&Fid::new("1")));
        assert!(!path.exists());
    }

    #[test]
    fn test_retry_reasons_are_not_indexed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        {
            let mut ledger = open(&path, vec![]);
            ledger
                .record(
                    &point("1"),
                    Outcome::Failed {
                        reason: FailureReason::InsufficientTiles,
                        tile_count: Some(6),
                    },
                )
                .unwrap();
            ledger
                .record(&point("2"), Outcome::failed(FailureReason::PanoramaIdNotFound))
                .unwrap();
        }

        let ledger = open(&path, vec![FailureKind::InsufficientTiles]);
        assert!(!ledger.is_resolved(&Fid::new("1")));
        assert!(ledger.is_resolved(&Fid::new("2")));
        assert_eq!(
            ledger.load_stats(),
            LedgerLoadStats {
                loaded: 1,
                requeued: 1,
                malformed: 0
            }
        );
    }

    #[test]
    fn test_legacy_four_column_ledger_loads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        std::fs::write(&path, "FID,X,Y,Heading\n10,116.1,39.1,45\n11,116.2,39.2,90\n").unwrap();

        let ledger = open(&path, vec![]);
        assert!(ledger.is_resolved(&Fid::new("10")));
        assert!(ledger.is_resolved(&Fid::new("11")));
        assert_eq!(
            ledger.status(&Fid::new("10")),
            Some(&Outcome::failed(FailureReason::Other("45".to_string())))
        );
    }

    #[test]
    fn test_reset_archives_ledger() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        {
            let mut ledger = open(&path, vec![]);
            ledger
                .record(&point("1"), Outcome::failed(FailureReason::InsufficientTiles))
                .unwrap();
        }

        let archive = ProgressLedger::reset(&path).unwrap().unwrap();
        assert!(!path.exists());
        assert!(archive.exists());
        assert!(open(&path, vec![]).is_empty());

        assert_eq!(ProgressLedger::reset(&path).unwrap(), None);
    }
}
