//! Testing utilities and mock implementations.
//!
//! This module provides mocks of the provider and the stitching engine, a
//! virtual clock and a capturing logger, so the whole pipeline can run in
//! tests without network access, OpenCV or real sleeps.
//!
//! # Example
//!
//! ```rust,ignore
//! use streetpano_core::testing::{ManualClock, MockStitchEngine, MockStreetViewApi};
//!
//! let api = Arc::new(MockStreetViewApi::new());
//! let clock = Arc::new(ManualClock::new());
//! let engine = MockStitchEngine::new();
//!
//! // Configure failures
//! api.fail_tile("3", Heading::from_degrees(45).unwrap());
//!
//! // Build the pipeline with them...
//! ```

mod manual_clock;
mod memory_logger;
mod mock_provider;
mod mock_stitcher;

pub use manual_clock::ManualClock;
pub use memory_logger::{LogEntry, MemoryLogger};
pub use mock_provider::MockStreetViewApi;
pub use mock_stitcher::MockStitchEngine;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;
    use std::path::Path;

    use image::{ImageFormat, Rgb, RgbImage};

    use crate::config::{Config, PathsConfig};
    use crate::provider::ProviderConfig;
    use crate::tiles::TileStore;
    use crate::types::{Heading, Point};

    /// A `width` x `height` PNG.
    pub fn tile_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encoding an in-memory PNG cannot fail");
        bytes.into_inner()
    }

    /// A point near Beijing with the given FID.
    pub fn point(fid: &str) -> Point {
        Point::new(fid, "116.391", "39.907")
    }

    /// Write tiles for `headings` of `point` into `store`.
    pub fn write_tiles(store: &TileStore, point: &Point, headings: &[Heading]) {
        for heading in headings {
            std::fs::write(store.tile_path(point, *heading), tile_png(64, 32))
                .expect("writing test tile");
        }
    }

    /// Write an input table with columns `FID,name,x,y`.
    pub fn write_points_csv(path: &Path, points: &[Point]) {
        let mut content = String::from("FID,name,x,y\n");
        for point in points {
            content.push_str(&format!(
                "{},p{},{},{}\n",
                point.fid, point.fid, point.wgs_x, point.wgs_y
            ));
        }
        std::fs::write(path, content).expect("writing test input");
    }

    /// Config rooted at `root` using the column layout of
    /// [`write_points_csv`].
    pub fn config(root: &Path) -> Config {
        let mut config: Config = toml::from_str("[provider]\naccess_key = \"test-key\"\n")
            .expect("static test config parses");
        config.paths = PathsConfig::under(root);
        config.provider = ProviderConfig::with_access_key("test-key");
        config.input.x_column = 2;
        config.input.y_column = 3;
        config
    }
}
