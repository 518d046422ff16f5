pub mod assembler;
pub mod clock;
pub mod config;
pub mod input;
pub mod ledger;
pub mod log;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod rate_limiter;
pub mod resolver;
pub mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tiles;
pub mod types;

pub use assembler::{
    AssemblyError, CommandStitchEngine, ExecutionBackend, PanoramaAssembler, StitchEngine,
    StitchError, StitchStatus, StitcherConfig,
};
pub use clock::{Clock, TokioClock};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use input::{read_points, InputError, PointTable};
pub use ledger::{FailureKind, FailureReason, LedgerError, Outcome, ProgressLedger};
pub use log::{LogLevel, Logger, NoOpLogger, TracingLogger};
pub use orchestrator::{PanoramaPipeline, PipelineError, PointOutcome, PointReport, RunSummary};
pub use provider::{BaiduClient, ProviderError, StreetViewApi};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryConfig, RetryPolicy};
pub use tiles::{SufficiencyPolicy, TileStore};
pub use types::{Fid, Heading, PanoramaId, Point, ProjectedCoordinate};
