//! Pre-check, primary stitch and CPU fallback.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::ImageReader;

use super::error::{AssemblyError, StitchError};
use super::traits::StitchEngine;
use super::types::{ExecutionBackend, StitchRequest, StitchStatus};
use crate::log::Logger;
use crate::metrics;
use crate::tiles::TileSet;
use crate::{log_debug, log_info, log_warn};

/// A successful assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assembled {
    /// Backend that produced the panorama.
    pub backend: ExecutionBackend,
    /// Whether the primary backend failed first.
    pub fell_back: bool,
    pub tile_count: usize,
}

/// Turns an ordered [`TileSet`] into one panorama image.
pub struct PanoramaAssembler<S: StitchEngine> {
    engine: S,
    logger: Arc<dyn Logger>,
    prefer_accelerated: bool,
}

impl<S: StitchEngine> PanoramaAssembler<S> {
    pub fn new(engine: S, logger: Arc<dyn Logger>, prefer_accelerated: bool) -> Self {
        Self {
            engine,
            logger,
            prefer_accelerated,
        }
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    /// Check that every tile decodes its header and all share one size.
    pub fn precheck(&self, tiles: &TileSet) -> Result<(u32, u32), AssemblyError> {
        let mut dimensions = Vec::with_capacity(tiles.len());
        for tile in &tiles.tiles {
            dimensions.push(read_dimensions(&tile.path)?);
        }

        let first = *dimensions.first().ok_or(AssemblyError::NoTiles)?;
        if dimensions.iter().any(|d| *d != first) {
            return Err(AssemblyError::InconsistentImageDimensions { dimensions });
        }
        Ok(first)
    }

    /// Assemble `tiles` into `output`.
    ///
    /// The primary backend is tried first; any non-`Ok` status or engine
    /// error leads to exactly one CPU attempt, whose status is reported if it
    /// fails too.
    pub async fn assemble(
        &self,
        tiles: &TileSet,
        output: &Path,
    ) -> Result<Assembled, AssemblyError> {
        if tiles.is_empty() {
            return Err(AssemblyError::NoTiles);
        }
        let (width, height) = self.precheck(tiles)?;
        log_debug!(
            self.logger,
            "FID {}: {} tiles of {}x{} pass the pre-check",
            tiles.fid,
            tiles.len(),
            width,
            height
        );

        if let Some(parent) = output.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Err(AssemblyError::StitchFailed {
                    status: StitchStatus::OtherFailure,
                    detail: Some(format!("cannot create {}: {}", parent.display(), e)),
                });
            }
        }

        let mut request = StitchRequest {
            images: tiles.paths(),
            output: output.to_path_buf(),
            backend: if self.prefer_accelerated {
                ExecutionBackend::Accelerated
            } else {
                ExecutionBackend::Cpu
            },
        };

        let primary = self.attempt(&request).await;
        if matches!(primary, Ok(StitchStatus::Ok)) {
            return Ok(self.assembled(tiles, request.backend, false));
        }

        if request.backend == ExecutionBackend::Cpu {
            return Err(failure(primary));
        }

        log_warn!(
            self.logger,
            "FID {}: accelerated stitch failed ({}), falling back to CPU",
            tiles.fid,
            describe(&primary)
        );
        request.backend = ExecutionBackend::Cpu;

        let fallback = self.attempt(&request).await;
        if matches!(fallback, Ok(StitchStatus::Ok)) {
            return Ok(self.assembled(tiles, ExecutionBackend::Cpu, true));
        }
        Err(failure(fallback))
    }

    async fn attempt(&self, request: &StitchRequest) -> Result<StitchStatus, StitchError> {
        let backend = request.backend.as_str();
        let started = Instant::now();
        let result = self.engine.stitch(request).await;

        metrics::ASSEMBLY_DURATION
            .with_label_values(&[backend])
            .observe(started.elapsed().as_secs_f64());
        let status_label = match &result {
            Ok(status) => status.as_str(),
            Err(_) => "EngineError",
        };
        metrics::ASSEMBLY_ATTEMPTS
            .with_label_values(&[backend, status_label])
            .inc();

        result
    }

    fn assembled(&self, tiles: &TileSet, backend: ExecutionBackend, fell_back: bool) -> Assembled {
        log_info!(
            self.logger,
            "FID {}: panorama assembled from {} tiles on {}",
            tiles.fid,
            tiles.len(),
            backend
        );
        Assembled {
            backend,
            fell_back,
            tile_count: tiles.len(),
        }
    }
}

fn read_dimensions(path: &Path) -> Result<(u32, u32), AssemblyError> {
    let unreadable = |reason: String| AssemblyError::UnreadableTile {
        path: path.to_path_buf(),
        reason,
    };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| unreadable(e.to_string()))
}

fn describe(result: &Result<StitchStatus, StitchError>) -> String {
    match result {
        Ok(status) => status.to_string(),
        Err(e) => e.to_string(),
    }
}

fn failure(result: Result<StitchStatus, StitchError>) -> AssemblyError {
    match result {
        Ok(status) => AssemblyError::StitchFailed {
            status,
            detail: None,
        },
        Err(e) => AssemblyError::StitchFailed {
            status: StitchStatus::OtherFailure,
            detail: Some(e.to_string()),
        },
    }
}
