//! Shared harness for pipeline integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use streetpano_core::{
    testing::{fixtures, ManualClock, MemoryLogger, MockStitchEngine, MockStreetViewApi},
    Clock, Config, Logger, PanoramaPipeline, Point, StreetViewApi,
};

/// Pipeline wired to mocks inside a temporary root.
pub struct TestHarness {
    pub pipeline: PanoramaPipeline<MockStitchEngine>,
    pub api: Arc<MockStreetViewApi>,
    pub engine: MockStitchEngine,
    pub clock: Arc<ManualClock>,
    pub logger: Arc<MemoryLogger>,
    pub config: Config,
    pub temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = fixtures::config(temp_dir.path());
        configure(&mut config);

        let (pipeline, api, engine, clock, logger) = build(&config);
        Self {
            pipeline,
            api,
            engine,
            clock,
            logger,
            config,
            temp_dir,
        }
    }

    /// Start a new "process" over the same root: fresh mocks, clock and
    /// pipeline, ledger reloaded from disk.
    pub fn restart(&mut self, configure: impl FnOnce(&mut Config)) {
        configure(&mut self.config);
        let (pipeline, api, engine, clock, logger) = build(&self.config);
        self.pipeline = pipeline;
        self.api = api;
        self.engine = engine;
        self.clock = clock;
        self.logger = logger;
    }

    pub fn panorama_path(&self, fid: &str) -> PathBuf {
        self.config.paths.panoramas_path().join(format!("{}.png", fid))
    }

    pub fn ledger_content(&self) -> String {
        std::fs::read_to_string(self.config.paths.ledger_path()).unwrap_or_default()
    }

    /// File names in the images directory starting with `<fid>_`.
    pub fn tile_files(&self, fid: &str) -> Vec<String> {
        let prefix = format!("{}_", fid);
        let mut names: Vec<String> = std::fs::read_dir(self.config.paths.images_path())
            .expect("images dir exists")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&prefix))
            .collect();
        names.sort();
        names
    }

    pub fn point(&self, fid: &str) -> Point {
        fixtures::point(fid)
    }
}

fn build(
    config: &Config,
) -> (
    PanoramaPipeline<MockStitchEngine>,
    Arc<MockStreetViewApi>,
    MockStitchEngine,
    Arc<ManualClock>,
    Arc<MemoryLogger>,
) {
    let clock = Arc::new(ManualClock::new());
    let logger = Arc::new(MemoryLogger::new());
    let api = Arc::new(
        MockStreetViewApi::new().with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
    );
    let engine = MockStitchEngine::new();

    let pipeline = PanoramaPipeline::from_config(
        config,
        Arc::clone(&api) as Arc<dyn StreetViewApi>,
        engine.clone(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&logger) as Arc<dyn Logger>,
    )
    .expect("Failed to build pipeline");

    (pipeline, api, engine, clock, logger)
}
