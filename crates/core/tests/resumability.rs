//! Resumability and pacing integration tests.
//!
//! Verifies that:
//! - A second run over finished points makes no remote calls
//! - Ledger entries survive a restart and block retries
//! - Requeued failure kinds and ledger reset allow a retry
//! - Coordinate conversion honours the rate limit across points
//! - The inter-point delay follows only points that did work

mod common;

use std::time::Duration;

use common::TestHarness;
use streetpano_core::{
    orchestrator::{PointOutcome, SkipReason},
    read_points,
    testing::fixtures,
    FailureKind, Fid, Heading, NoOpLogger, ProgressLedger,
};

fn heading(degrees: u16) -> Heading {
    Heading::from_degrees(degrees).unwrap()
}

#[tokio::test]
async fn test_rerun_after_failure_makes_no_remote_calls() {
    let mut harness = TestHarness::new();
    harness.api.fail_tile("3", heading(180));
    harness.pipeline.run(&[harness.point("3")]).await;
    let ledger_before = harness.ledger_content();

    harness.restart(|_| {});
    assert_eq!(harness.pipeline.ledger().load_stats().loaded, 1);

    let report = harness.pipeline.process_point(&harness.point("3")).await;

    assert_eq!(report.outcome, PointOutcome::Skipped(SkipReason::Ledger));
    assert_eq!(harness.api.remote_calls(), 0);
    assert_eq!(harness.ledger_content(), ledger_before);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mut harness = TestHarness::new();
    harness.api.fail_conversion("2");
    let points = vec![harness.point("1"), harness.point("2"), harness.point("3")];

    let first = harness.pipeline.run(&points).await;
    assert_eq!(first.assembled, 2);
    assert_eq!(first.failed_total(), 1);

    let ledger_before = harness.ledger_content();
    let tiles_before = harness.tile_files("1");
    let panorama_before = std::fs::read(harness.panorama_path("1")).unwrap();

    harness.restart(|_| {});
    let second = harness.pipeline.run(&points).await;

    assert_eq!(second.skipped_existing, 2);
    assert_eq!(second.skipped_ledger, 1);
    assert_eq!(harness.api.remote_calls(), 0);
    assert!(harness.engine.requests().is_empty());
    assert_eq!(harness.ledger_content(), ledger_before);
    assert_eq!(harness.tile_files("1"), tiles_before);
    assert_eq!(std::fs::read(harness.panorama_path("1")).unwrap(), panorama_before);
    // Nothing processed, so no pacing either
    assert_eq!(harness.clock.total_slept(), Duration::ZERO);
}

#[tokio::test]
async fn test_requeued_kind_retries_only_missing_tiles() {
    let mut harness = TestHarness::new();
    harness.api.fail_tile("3", heading(180));
    harness.pipeline.run(&[harness.point("3")]).await;

    harness.restart(|config| {
        config.ledger.retry_reasons = vec![FailureKind::InsufficientTiles];
    });
    let stats = harness.pipeline.ledger().load_stats();
    assert_eq!(stats.loaded, 0);
    assert_eq!(stats.requeued, 1);

    let summary = harness.pipeline.run(&[harness.point("3")]).await;

    assert_eq!(summary.assembled, 1);
    assert_eq!(harness.api.tile_calls(), 1);
    assert_eq!(harness.api.tile_requests()[0].1, heading(180));
    assert!(harness.panorama_path("3").exists());
}

#[tokio::test]
async fn test_non_requeued_kinds_stay_resolved() {
    let mut harness = TestHarness::new();
    harness.api.fail_conversion("8");
    harness.pipeline.run(&[harness.point("8")]).await;

    harness.restart(|config| {
        config.ledger.retry_reasons = vec![FailureKind::InsufficientTiles];
    });

    assert!(harness.pipeline.ledger().is_resolved(&Fid::new("8")));
}

#[tokio::test]
async fn test_reset_archives_ledger_and_allows_retry() {
    let mut harness = TestHarness::new();
    harness.api.fail_conversion("9");
    harness.pipeline.run(&[harness.point("9")]).await;

    let ledger_path = harness.config.paths.ledger_path();
    let archived = ProgressLedger::reset(&ledger_path)
        .unwrap()
        .expect("ledger existed");
    assert!(!ledger_path.exists());
    assert!(std::fs::read_to_string(&archived)
        .unwrap()
        .contains("9,116.391,39.907,CoordinateConversionFailed"));

    harness.restart(|_| {});
    let summary = harness.pipeline.run(&[harness.point("9")]).await;

    assert_eq!(summary.assembled, 1);
    assert_eq!(harness.api.conversion_calls(), 1);
}

#[tokio::test]
async fn test_reset_without_ledger_is_noop() {
    let harness = TestHarness::new();
    let result = ProgressLedger::reset(&harness.config.paths.ledger_path()).unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_conversions_respect_rate_limit() {
    let mut harness = TestHarness::with_config(|config| {
        config.rate_limit.calls = 2;
        config.rate_limit.period_secs = 60;
        config.pipeline.inter_point_delay_ms = 0;
        config.tiles.inter_tile_delay_ms = 0;
    });
    let points: Vec<_> = (1..=5).map(|i| harness.point(&i.to_string())).collect();

    let summary = harness.pipeline.run(&points).await;
    assert_eq!(summary.assembled, 5);

    let times = harness.api.conversion_times();
    assert_eq!(times.len(), 5);
    for (i, start) in times.iter().enumerate() {
        let in_window = times[i..]
            .iter()
            .filter(|t| t.duration_since(*start) < Duration::from_secs(60))
            .count();
        assert!(in_window <= 2, "window at call {} holds {} calls", i, in_window);
    }
    // Calls 3 and 5 each waited out a full window
    assert_eq!(harness.clock.elapsed(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_inter_point_delay_only_after_processed_points() {
    let mut harness = TestHarness::with_config(|config| {
        config.tiles.inter_tile_delay_ms = 0;
    });
    std::fs::write(harness.panorama_path("1"), fixtures::tile_png(8, 4)).unwrap();
    harness.api.fail_conversion("3");
    let points = vec![harness.point("1"), harness.point("2"), harness.point("3")];

    harness.pipeline.run(&points).await;

    assert_eq!(
        harness.clock.sleeps(),
        vec![Duration::from_secs(6), Duration::from_secs(6)]
    );
}

#[tokio::test]
async fn test_max_points_limits_the_run() {
    let mut harness = TestHarness::with_config(|config| {
        config.pipeline.max_points = Some(2);
    });
    let points: Vec<_> = (1..=4).map(|i| harness.point(&i.to_string())).collect();

    let summary = harness.pipeline.run(&points).await;

    assert_eq!(summary.total, 2);
    assert_eq!(harness.api.conversion_calls(), 2);
    assert!(!harness.panorama_path("3").exists());
}

#[tokio::test]
async fn test_run_from_input_table() {
    let mut harness = TestHarness::new();
    let input = harness.config.paths.input_path();
    fixtures::write_points_csv(&input, &[harness.point("100"), harness.point("101")]);
    let mut content = std::fs::read_to_string(&input).unwrap();
    content.push_str("102,broken,not-a-number,39.9\n");
    std::fs::write(&input, content).unwrap();

    let table = read_points(&input, &harness.config.input, &NoOpLogger).unwrap();
    assert_eq!(table.points.len(), 2);
    assert_eq!(table.skipped_rows, 1);

    let summary = harness.pipeline.run(&table.points).await;

    assert_eq!(summary.assembled, 2);
    assert!(harness.panorama_path("100").exists());
    assert!(harness.panorama_path("101").exists());
}
