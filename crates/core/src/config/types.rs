use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assembler::StitcherConfig;
use crate::ledger::LedgerConfig;
use crate::orchestrator::PipelineConfig;
use crate::provider::ProviderConfig;
use crate::retry::RetryConfig;
use crate::tiles::TilesConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub input: InputConfig,
    /// Provider credentials are required.
    pub provider: ProviderConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub tiles: TilesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub stitcher: StitcherConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// On-disk layout. Relative paths are resolved against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Input point table.
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Directional tiles.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    /// Assembled panoramas.
    #[serde(default = "default_panoramas_dir")]
    pub panoramas_dir: PathBuf,
    /// Progress ledger.
    #[serde(default = "default_ledger")]
    pub ledger: PathBuf,
    /// Degraded assemblies.
    #[serde(default = "default_incomplete")]
    pub incomplete: PathBuf,
    /// Headings that exhausted their retries.
    #[serde(default = "default_tile_failures")]
    pub tile_failures: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_input() -> PathBuf {
    PathBuf::from("point_coordinate_intersect.csv")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_panoramas_dir() -> PathBuf {
    PathBuf::from("panoramas")
}

fn default_ledger() -> PathBuf {
    PathBuf::from("error_road_intersection.csv")
}

fn default_incomplete() -> PathBuf {
    PathBuf::from("incomplete_panoramas.csv")
}

fn default_tile_failures() -> PathBuf {
    PathBuf::from("failed_tiles.csv")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            input: default_input(),
            images_dir: default_images_dir(),
            panoramas_dir: default_panoramas_dir(),
            ledger: default_ledger(),
            incomplete: default_incomplete(),
            tile_failures: default_tile_failures(),
        }
    }
}

impl PathsConfig {
    /// Default layout under `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Resolve `path` against `root` unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn input_path(&self) -> PathBuf {
        self.resolve(&self.input)
    }

    pub fn images_path(&self) -> PathBuf {
        self.resolve(&self.images_dir)
    }

    pub fn panoramas_path(&self) -> PathBuf {
        self.resolve(&self.panoramas_dir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.ledger)
    }

    pub fn incomplete_path(&self) -> PathBuf {
        self.resolve(&self.incomplete)
    }

    pub fn tile_failures_path(&self) -> PathBuf {
        self.resolve(&self.tile_failures)
    }
}

/// Zero-based column positions in the input point table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub fid_column: usize,
    #[serde(default = "default_x_column")]
    pub x_column: usize,
    #[serde(default = "default_y_column")]
    pub y_column: usize,
}

fn default_x_column() -> usize {
    17
}

fn default_y_column() -> usize {
    18
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            fid_column: 0,
            x_column: default_x_column(),
            y_column: default_y_column(),
        }
    }
}

/// Coordinate conversion budget: `calls` per rolling `period_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_calls")]
    pub calls: u32,
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_calls() -> u32 {
    30
}

fn default_period_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: default_calls(),
            period_secs: default_period_secs(),
        }
    }
}

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Log filter, console format and the per-run log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Write `run_log_<timestamp>.log` for every run.
    #[serde(default = "default_file")]
    pub file: bool,
    /// Directory of the per-run log files, relative to `paths.root`.
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file() -> bool {
    true
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: default_file(),
            directory: default_log_directory(),
        }
    }
}

/// Config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub paths: PathsConfig,
    pub input: InputConfig,
    pub provider: SanitizedProviderConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub tiles: TilesConfig,
    pub pipeline: PipelineConfig,
    pub stitcher: StitcherConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

/// Provider config with the access key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub geoconv_url: String,
    pub panorama_url: String,
    pub tile_url: String,
    pub access_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            paths: config.paths.clone(),
            input: config.input.clone(),
            provider: SanitizedProviderConfig {
                geoconv_url: config.provider.geoconv_url.clone(),
                panorama_url: config.provider.panorama_url.clone(),
                tile_url: config.provider.tile_url.clone(),
                access_key_configured: !config.provider.access_key.trim().is_empty(),
                timeout_secs: config.provider.timeout_secs,
            },
            rate_limit: config.rate_limit.clone(),
            retry: config.retry.clone(),
            tiles: config.tiles.clone(),
            pipeline: config.pipeline.clone(),
            stitcher: config.stitcher.clone(),
            ledger: config.ledger.clone(),
            logging: config.logging.clone(),
        }
    }
}
