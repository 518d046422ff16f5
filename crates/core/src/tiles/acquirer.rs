//! Download of single directional tiles.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::clock::Clock;
use crate::log::Logger;
use crate::metrics;
use crate::provider::{StreetViewApi, TileResponse};
use crate::retry::RetryPolicy;
use crate::types::{Heading, PanoramaId};
use crate::{log_debug, log_warn};

/// A heading whose retries were exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tile {heading} of panorama {panorama} failed after {attempts} attempts: {last_error}")]
pub struct TileDownloadFailed {
    pub panorama: PanoramaId,
    pub heading: Heading,
    pub attempts: u32,
    pub last_error: String,
}

/// Fetches tiles with bounded retry and a fixed pause after every fetch.
pub struct TileAcquirer {
    api: Arc<dyn StreetViewApi>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    expected_content_type: String,
    inter_tile_delay: Duration,
}

impl TileAcquirer {
    pub fn new(
        api: Arc<dyn StreetViewApi>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
        expected_content_type: impl Into<String>,
        inter_tile_delay: Duration,
    ) -> Self {
        Self {
            api,
            retry,
            clock,
            logger,
            expected_content_type: expected_content_type.into().to_ascii_lowercase(),
            inter_tile_delay,
        }
    }

    /// Check a response against the acceptance rule: HTTP 200, the expected
    /// media type and a non-empty body.
    fn accept(&self, response: TileResponse) -> Result<Vec<u8>, String> {
        if response.status != 200 {
            return Err(format!("HTTP status {}", response.status));
        }

        match response.media_type() {
            Some(media_type) if media_type == self.expected_content_type => {}
            other => {
                return Err(format!(
                    "unexpected content type {}",
                    other.as_deref().unwrap_or("<none>")
                ))
            }
        }

        if response.body.is_empty() {
            return Err("empty tile body".to_string());
        }

        Ok(response.body)
    }

    /// Fetch one tile.
    ///
    /// Exhausted retries fail this heading only. The inter-tile pause is
    /// taken after the last attempt either way.
    pub async fn fetch(
        &self,
        panorama: &PanoramaId,
        heading: Heading,
    ) -> Result<Vec<u8>, TileDownloadFailed> {
        let attempts = self.retry.attempts();

        let result = self
            .retry
            .run(
                self.clock.as_ref(),
                |attempt, error: &String| {
                    metrics::REMOTE_REQUESTS
                        .with_label_values(&["tile", "error"])
                        .inc();
                    if attempt < attempts {
                        metrics::RETRY_ATTEMPTS.with_label_values(&["tile"]).inc();
                    }
                    log_warn!(
                        self.logger,
                        "tile {} of {} failed (attempt {}/{}): {}",
                        heading,
                        panorama,
                        attempt,
                        attempts,
                        error
                    );
                },
                |_| async move {
                    match self.api.fetch_tile(panorama, heading).await {
                        Ok(response) => self.accept(response),
                        Err(e) => Err(e.to_string()),
                    }
                },
            )
            .await;

        self.clock.sleep(self.inter_tile_delay).await;

        match result {
            Ok(bytes) => {
                metrics::REMOTE_REQUESTS
                    .with_label_values(&["tile", "ok"])
                    .inc();
                log_debug!(
                    self.logger,
                    "tile {} of {}: {} bytes",
                    heading,
                    panorama,
                    bytes.len()
                );
                Ok(bytes)
            }
            Err(last_error) => Err(TileDownloadFailed {
                panorama: panorama.clone(),
                heading,
                attempts,
                last_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, MemoryLogger, MockStreetViewApi};
    use crate::types::Fid;

    fn acquirer(api: Arc<MockStreetViewApi>) -> (TileAcquirer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let acquirer = TileAcquirer::new(
            api,
            RetryPolicy::new(3, Duration::from_secs(5)),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(MemoryLogger::new()),
            "image/jpeg",
            Duration::from_millis(500),
        );
        (acquirer, clock)
    }

    fn panorama() -> PanoramaId {
        MockStreetViewApi::panorama_id_for(&Fid::new("9"))
    }

    #[tokio::test]
    async fn test_fetch_success_then_inter_tile_delay() {
        let api = Arc::new(MockStreetViewApi::new());
        let (acquirer, clock) = acquirer(Arc::clone(&api));

        let bytes = acquirer.fetch(&panorama(), Heading::ALL[2]).await.unwrap();

        assert!(!bytes.is_empty());
        assert_eq!(api.tile_calls(), 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_retried_then_fails() {
        let api = Arc::new(MockStreetViewApi::new());
        api.set_tile_content_type("text/html; charset=utf-8");
        let (acquirer, clock) = acquirer(Arc::clone(&api));

        let err = acquirer.fetch(&panorama(), Heading::ALL[0]).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(err.last_error.contains("text/html"));
        assert_eq!(api.tile_calls(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(5),
                Duration::from_secs(5),
                Duration::from_millis(500)
            ]
        );
    }

    #[tokio::test]
    async fn test_content_type_parameters_are_ignored() {
        let api = Arc::new(MockStreetViewApi::new());
        api.set_tile_content_type("image/jpeg;charset=binary");
        let (acquirer, _clock) = acquirer(Arc::clone(&api));

        assert!(acquirer.fetch(&panorama(), Heading::ALL[0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_heading_recovers_within_retry_budget() {
        let api = Arc::new(MockStreetViewApi::new());
        api.fail_tile_times("9", Heading::ALL[4], 2);
        let (acquirer, _clock) = acquirer(Arc::clone(&api));

        assert!(acquirer.fetch(&panorama(), Heading::ALL[4]).await.is_ok());
        assert_eq!(api.tile_calls(), 3);
    }

    #[test]
    fn test_accept_rejects_non_200() {
        let api = Arc::new(MockStreetViewApi::new());
        let (acquirer, _clock) = acquirer(api);
        let response = TileResponse {
            status: 404,
            content_type: Some("image/jpeg".to_string()),
            body: vec![1],
        };
        assert_eq!(acquirer.accept(response).unwrap_err(), "HTTP status 404");
    }
}
