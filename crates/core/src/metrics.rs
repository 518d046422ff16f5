//! Prometheus metrics for pipeline components.
//!
//! This module provides metrics for:
//! - Points (processed, skipped, failed by reason)
//! - Remote calls (conversion, panorama lookup, tiles) and retries
//! - Panorama assembly (backend, status, duration)
//! - Ledger durability

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Points
// =============================================================================

/// Points handled by the orchestrator, by result.
pub static POINTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_points_total", "Points handled by the pipeline"),
        &["result"], // "assembled", "failed", "skipped"
    )
    .unwrap()
});

/// Failed points by failure kind.
pub static POINT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_point_failures_total", "Failed points by reason"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Remote calls
// =============================================================================

/// Provider calls by endpoint and result.
pub static REMOTE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_remote_requests_total", "Provider calls issued"),
        &["endpoint", "result"], // endpoint: "geoconv", "panorama", "tile"
    )
    .unwrap()
});

/// Failed attempts that were followed by another attempt.
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_retry_attempts_total", "Retried provider calls"),
        &["stage"],
    )
    .unwrap()
});

/// Times a caller had to wait for the conversion rate limit.
pub static RATE_LIMIT_WAITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "streetpano_rate_limit_waits_total",
        "Coordinate conversions delayed by the rate limiter",
    )
    .unwrap()
});

/// Tiles by outcome.
pub static TILES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_tiles_total", "Directional tiles by outcome"),
        &["result"], // "downloaded", "reused", "failed"
    )
    .unwrap()
});

// =============================================================================
// Assembly
// =============================================================================

/// Stitch attempts by backend and status.
pub static ASSEMBLY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streetpano_assembly_attempts_total", "Stitch attempts"),
        &["backend", "status"],
    )
    .unwrap()
});

/// Stitch duration in seconds.
pub static ASSEMBLY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streetpano_assembly_duration_seconds",
            "Duration of a single stitch attempt",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["backend"],
    )
    .unwrap()
});

// =============================================================================
// Ledger
// =============================================================================

/// Ledger appends that could not be made durable.
pub static LEDGER_WRITE_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "streetpano_ledger_write_errors_total",
        "Failed ledger appends",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(POINTS_TOTAL.clone()),
        Box::new(POINT_FAILURES.clone()),
        Box::new(REMOTE_REQUESTS.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
        Box::new(RATE_LIMIT_WAITS.clone()),
        Box::new(TILES_TOTAL.clone()),
        Box::new(ASSEMBLY_ATTEMPTS.clone()),
        Box::new(ASSEMBLY_DURATION.clone()),
        Box::new(LEDGER_WRITE_ERRORS.clone()),
    ]
}
