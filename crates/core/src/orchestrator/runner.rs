//! The point pipeline.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use super::types::{
    PipelineError, PointOutcome, PointProgress, PointReport, PointState, RunSummary, SkipReason,
};
use crate::assembler::{PanoramaAssembler, StitchEngine};
use crate::clock::Clock;
use crate::config::Config;
use crate::ledger::{
    CsvAppendLog, FailureReason, IncompleteRow, Outcome, ProgressLedger, TileFailureRow,
};
use crate::log::Logger;
use crate::metrics;
use crate::provider::StreetViewApi;
use crate::rate_limiter::RateLimiter;
use crate::resolver::{CoordinateResolver, PanoramaIdResolver};
use crate::retry::RetryPolicy;
use crate::tiles::{Evaluation, TileAcquirer, TileSetEvaluator, TileStore};
use crate::types::{Heading, PanoramaId, Point};
use crate::{log_debug, log_error, log_info, log_warn};

/// Drives points from input row to panorama.
pub struct PanoramaPipeline<S: StitchEngine> {
    store: TileStore,
    evaluator: TileSetEvaluator,
    coordinates: CoordinateResolver,
    panoramas: PanoramaIdResolver,
    acquirer: TileAcquirer,
    assembler: PanoramaAssembler<S>,
    ledger: ProgressLedger,
    incomplete: CsvAppendLog<IncompleteRow>,
    tile_failures: CsvAppendLog<TileFailureRow>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    inter_point_delay: Duration,
    tile_concurrency: usize,
    max_points: Option<usize>,
}

impl<S: StitchEngine> PanoramaPipeline<S> {
    /// Wire every component from `config`.
    ///
    /// Creates the image and panorama directories and loads the ledger.
    pub fn from_config(
        config: &Config,
        api: Arc<dyn StreetViewApi>,
        engine: S,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, PipelineError> {
        let paths = &config.paths;
        let store = TileStore::new(paths.images_path(), paths.panoramas_path());
        store.ensure_dirs()?;

        let ledger = ProgressLedger::open(paths.ledger_path(), &config.ledger, Arc::clone(&logger))?;
        let retry = RetryPolicy::from(&config.retry);
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.calls,
            Duration::from_secs(config.rate_limit.period_secs),
            Arc::clone(&clock),
        ));

        Ok(Self {
            evaluator: TileSetEvaluator::new(store.clone(), config.tiles.policy),
            coordinates: CoordinateResolver::new(Arc::clone(&api), limiter, Arc::clone(&logger)),
            panoramas: PanoramaIdResolver::new(
                Arc::clone(&api),
                retry,
                Arc::clone(&clock),
                Arc::clone(&logger),
            ),
            acquirer: TileAcquirer::new(
                api,
                retry,
                Arc::clone(&clock),
                Arc::clone(&logger),
                config.tiles.expected_content_type.clone(),
                Duration::from_millis(config.tiles.inter_tile_delay_ms),
            ),
            assembler: PanoramaAssembler::new(
                engine,
                Arc::clone(&logger),
                config.stitcher.prefer_accelerated,
            ),
            store,
            ledger,
            incomplete: CsvAppendLog::new(paths.incomplete_path(), IncompleteRow::HEADER),
            tile_failures: CsvAppendLog::new(paths.tile_failures_path(), TileFailureRow::HEADER),
            clock,
            logger,
            inter_point_delay: Duration::from_millis(config.pipeline.inter_point_delay_ms),
            tile_concurrency: config.tiles.concurrency.max(1),
            max_points: config.pipeline.max_points,
        })
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn assembler(&self) -> &PanoramaAssembler<S> {
        &self.assembler
    }

    /// Process `points` in order and return the run totals.
    ///
    /// Only the first `pipeline.max_points` points are looked at when that
    /// limit is set.
    pub async fn run(&mut self, points: &[Point]) -> RunSummary {
        let points = match self.max_points {
            Some(limit) if limit < points.len() => &points[..limit],
            _ => points,
        };
        let mut summary = RunSummary::default();
        let total = points.len();
        log_info!(self.logger, "starting run over {} points", total);

        for (index, point) in points.iter().enumerate() {
            log_info!(self.logger, "processing point {}/{}: {}", index + 1, total, point);
            let report = self.process_point(point).await;
            summary.add(&report);

            if !report.outcome.is_skipped() {
                self.clock.sleep(self.inter_point_delay).await;
            }
        }

        self.log_summary(&summary);
        summary
    }

    /// Take one point to a terminal state.
    pub async fn process_point(&mut self, point: &Point) -> PointReport {
        let mut progress = PointProgress::new(point.fid.clone());

        if self.store.panorama_exists(&point.fid) {
            log_info!(self.logger, "FID {}: panorama already exists, skipping", point.fid);
            return self.skip(progress, SkipReason::PanoramaExists);
        }
        if self.ledger.is_resolved(&point.fid) {
            log_info!(self.logger, "FID {}: already in ledger, skipping", point.fid);
            return self.skip(progress, SkipReason::Ledger);
        }

        let missing = self.store.missing_headings(point);
        metrics::TILES_TOTAL
            .with_label_values(&["reused"])
            .inc_by((Heading::COUNT - missing.len()) as u64);

        if missing.is_empty() {
            log_info!(
                self.logger,
                "FID {}: all tiles present, skipping download",
                point.fid
            );
        } else {
            let coordinate = match self.coordinates.resolve(point).await {
                Ok(coordinate) => coordinate,
                Err(_) => {
                    return self.fail(point, progress, FailureReason::CoordinateConversionFailed, None)
                }
            };
            self.transition(point, &mut progress, PointState::CoordinatesResolved);

            let panorama = match self.panoramas.resolve(&coordinate).await {
                Ok(panorama) => panorama,
                Err(e) => {
                    log_error!(self.logger, "FID {}: {}", point.fid, e);
                    return self.fail(point, progress, FailureReason::PanoramaIdNotFound, None);
                }
            };
            log_info!(self.logger, "FID {}: panorama {}", point.fid, panorama);
            self.transition(point, &mut progress, PointState::IdResolved);

            let (downloaded, failed) = self.fetch_missing(point, &panorama, &missing).await;
            progress.tiles_downloaded = downloaded;
            progress.tiles_failed = failed;
        }

        let tiles = match self.evaluator.evaluate(point) {
            Evaluation::Ready(tiles) => tiles,
            Evaluation::Insufficient { found } => {
                log_warn!(
                    self.logger,
                    "FID {}: {} of {} tiles present, not enough to assemble",
                    point.fid,
                    found,
                    Heading::COUNT
                );
                return self.fail(point, progress, FailureReason::InsufficientTiles, Some(found));
            }
        };
        self.transition(point, &mut progress, PointState::TilesEvaluated);

        if !tiles.is_complete() {
            log_warn!(
                self.logger,
                "FID {}: assembling degraded panorama from {} tiles",
                point.fid,
                tiles.len()
            );
            if let Err(e) = self.incomplete.append(&IncompleteRow::new(&point.fid, tiles.len())) {
                log_error!(
                    self.logger,
                    "FID {}: failed to record incomplete tile set: {}",
                    point.fid,
                    e
                );
            }
        }

        let output = self.store.panorama_path(&point.fid);
        match self.assembler.assemble(&tiles, &output).await {
            Ok(assembled) => {
                self.transition(point, &mut progress, PointState::Assembled);
                progress.ledger_write_failed = !self.record(
                    point,
                    Outcome::Success {
                        tile_count: assembled.tile_count,
                    },
                );
                metrics::POINTS_TOTAL.with_label_values(&["assembled"]).inc();
                progress.finish(PointOutcome::Assembled {
                    tile_count: assembled.tile_count,
                    backend: assembled.backend,
                    fell_back: assembled.fell_back,
                })
            }
            Err(e) => {
                log_error!(self.logger, "FID {}: assembly failed: {}", point.fid, e);
                let tile_count = tiles.len();
                self.fail(
                    point,
                    progress,
                    FailureReason::AssemblyFailed(e.label()),
                    Some(tile_count),
                )
            }
        }
    }

    /// Fetch and store `missing` headings. Returns (downloaded, failed).
    async fn fetch_missing(
        &self,
        point: &Point,
        panorama: &PanoramaId,
        missing: &[Heading],
    ) -> (usize, usize) {
        let mut downloaded = 0;
        let mut failed = 0;

        let mut fetches = stream::iter(missing.iter().copied())
            .map(|heading| async move { (heading, self.acquirer.fetch(panorama, heading).await) })
            .buffered(self.tile_concurrency);

        while let Some((heading, result)) = fetches.next().await {
            let stored = match result {
                Ok(bytes) => self
                    .store
                    .write_tile(point, heading, &bytes)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match stored {
                Ok(path) => {
                    downloaded += 1;
                    metrics::TILES_TOTAL.with_label_values(&["downloaded"]).inc();
                    log_debug!(self.logger, "FID {}: saved {}", point.fid, path.display());
                }
                Err(e) => {
                    failed += 1;
                    metrics::TILES_TOTAL.with_label_values(&["failed"]).inc();
                    log_error!(
                        self.logger,
                        "FID {}: heading {} failed: {}",
                        point.fid,
                        heading,
                        e
                    );
                    if let Err(e) = self
                        .tile_failures
                        .append(&TileFailureRow::new(point, heading))
                    {
                        log_error!(
                            self.logger,
                            "FID {}: failed to record tile failure: {}",
                            point.fid,
                            e
                        );
                    }
                }
            }
        }

        (downloaded, failed)
    }

    fn transition(&self, point: &Point, progress: &mut PointProgress, next: PointState) {
        log_debug!(
            self.logger,
            "FID {}: {} -> {}",
            point.fid,
            progress
                .state()
                .map(ToString::to_string)
                .unwrap_or_default(),
            next
        );
        progress.push_state(next);
    }

    fn skip(&self, progress: PointProgress, reason: SkipReason) -> PointReport {
        metrics::POINTS_TOTAL.with_label_values(&["skipped"]).inc();
        progress.finish(PointOutcome::Skipped(reason))
    }

    fn fail(
        &mut self,
        point: &Point,
        mut progress: PointProgress,
        reason: FailureReason,
        tile_count: Option<usize>,
    ) -> PointReport {
        self.transition(point, &mut progress, PointState::Failed(reason.clone()));
        metrics::POINTS_TOTAL.with_label_values(&["failed"]).inc();
        metrics::POINT_FAILURES
            .with_label_values(&[reason.kind().as_str()])
            .inc();

        progress.ledger_write_failed = !self.record(
            point,
            Outcome::Failed {
                reason: reason.clone(),
                tile_count,
            },
        );
        progress.finish(PointOutcome::Failed { reason, tile_count })
    }

    /// Record a terminal outcome; a write failure is logged, not fatal.
    fn record(&mut self, point: &Point, outcome: Outcome) -> bool {
        match self.ledger.record(point, outcome) {
            Ok(()) => true,
            Err(e) => {
                metrics::LEDGER_WRITE_ERRORS.inc();
                log_error!(
                    self.logger,
                    "FID {}: ledger write failed, continuing: {}",
                    point.fid,
                    e
                );
                false
            }
        }
    }

    fn log_summary(&self, summary: &RunSummary) {
        log_info!(
            self.logger,
            "run finished: {} points, {} assembled ({} degraded, {} on CPU fallback), \
             {} failed, {} skipped (panorama exists), {} skipped (ledger)",
            summary.total,
            summary.assembled,
            summary.degraded,
            summary.fell_back,
            summary.failed_total(),
            summary.skipped_existing,
            summary.skipped_ledger
        );
        for (kind, count) in &summary.failed {
            log_info!(self.logger, "  failed {}: {}", kind, count);
        }
        log_info!(
            self.logger,
            "tiles: {} downloaded, {} failed; {} ledger write errors",
            summary.tiles_downloaded,
            summary.tiles_failed,
            summary.ledger_write_errors
        );
    }
}
