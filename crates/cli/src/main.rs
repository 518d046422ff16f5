mod metrics;

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streetpano_core::{
    load_config, read_points, validate_config, BaiduClient, CommandStitchEngine, Config,
    LogFormat, PanoramaPipeline, ProgressLedger, SanitizedConfig, StitchEngine, StreetViewApi,
    TokioClock, TracingLogger,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: streetpano [run | reset-ledger]

Configuration is read from $STREETPANO_CONFIG (default: streetpano.toml).
Any key can be overridden with STREETPANO_<SECTION>__<KEY>.";

enum Command {
    Run,
    ResetLedger,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let command = match std::env::args().nth(1).as_deref() {
        None | Some("run") => Command::Run,
        Some("reset-ledger") => Command::ResetLedger,
        Some("-h") | Some("--help") | Some("help") => {
            println!("{}", USAGE);
            return Ok(());
        }
        Some(other) => bail!("unknown command {:?}\n\n{}", other, USAGE),
    };

    // Determine config path
    let config_path = std::env::var("STREETPANO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("streetpano.toml"));

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let log_file = init_logging(&config)?;

    let run_id = uuid::Uuid::new_v4();
    info!(%run_id, version = VERSION, "streetpano starting");
    if let Some(path) = &log_file {
        info!("Writing run log to {:?}", path);
    }
    info!(
        "Configuration: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    match command {
        Command::Run => run_pipeline(&config).await,
        Command::ResetLedger => reset_ledger(&config),
    }
}

/// Console output plus an optional per-run log file.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &Config) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging.level")?;

    let (file, path) = if config.logging.file {
        let dir = config.paths.resolve(&config.logging.directory);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {:?}", dir))?;
        let path = dir.join(format!(
            "run_log_{}.log",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;
        (Some(file), Some(path))
    } else {
        (None, None)
    };

    let pretty = matches!(config.logging.format, LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer());
    let json = matches!(config.logging.format, LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json());
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file_layer)
        .init();

    Ok(path)
}

async fn run_pipeline(config: &Config) -> Result<()> {
    let input = config.paths.input_path();
    let table = read_points(&input, &config.input, &TracingLogger)
        .with_context(|| format!("Failed to read points from {:?}", input))?;
    info!(
        "Loaded {} points from {:?} ({} rows skipped)",
        table.points.len(),
        input,
        table.skipped_rows
    );

    let api: Arc<dyn StreetViewApi> = Arc::new(
        BaiduClient::new(config.provider.clone()).context("Failed to create provider client")?,
    );
    let engine = CommandStitchEngine::new(config.stitcher.clone());
    if let Err(e) = engine.validate().await {
        warn!("Stitch engine check failed, assembly will fail: {}", e);
    }

    let mut pipeline = PanoramaPipeline::from_config(
        config,
        api,
        engine,
        Arc::new(TokioClock),
        Arc::new(TracingLogger),
    )
    .context("Failed to initialize pipeline")?;

    let stats = pipeline.ledger().load_stats();
    info!(
        "Ledger {:?}: {} entries loaded, {} requeued, {} malformed",
        pipeline.ledger().path(),
        stats.loaded,
        stats.requeued,
        stats.malformed
    );

    let mut summary = pipeline.run(&table.points).await;
    summary.malformed_rows = table.skipped_rows;
    if summary.malformed_rows > 0 {
        warn!("{} input rows were skipped as malformed", summary.malformed_rows);
    }

    if let Some(path) = &config.pipeline.metrics_path {
        let path = config.paths.resolve(path);
        metrics::write_metrics(&path)?;
        info!("Metrics written to {:?}", path);
    }

    Ok(())
}

fn reset_ledger(config: &Config) -> Result<()> {
    let path = config.paths.ledger_path();
    match ProgressLedger::reset(&path).context("Failed to reset ledger")? {
        Some(archive) => info!("Ledger {:?} archived to {:?}", path, archive),
        None => info!("No ledger at {:?}, nothing to reset", path),
    }
    Ok(())
}
