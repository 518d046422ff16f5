//! Projected coordinate -> panorama id, with bounded retry.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::ResolveError;
use crate::clock::Clock;
use crate::log::Logger;
use crate::metrics;
use crate::provider::StreetViewApi;
use crate::retry::RetryPolicy;
use crate::types::{PanoramaId, ProjectedCoordinate};
use crate::{log_debug, log_warn};

static PANORAMA_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""id":"(.+?)","#).ok());

/// First panorama id token in a lookup response body.
pub fn extract_panorama_id(body: &str) -> Option<PanoramaId> {
    let pattern = PANORAMA_ID_PATTERN.as_ref()?;
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| PanoramaId::new(m.as_str()))
}

/// Looks up the panorama nearest to a projected coordinate.
pub struct PanoramaIdResolver {
    api: Arc<dyn StreetViewApi>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl PanoramaIdResolver {
    pub fn new(
        api: Arc<dyn StreetViewApi>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            api,
            retry,
            clock,
            logger,
        }
    }

    /// Resolve the panorama id, retrying on remote errors, empty bodies and
    /// bodies without an id.
    pub async fn resolve(
        &self,
        coordinate: &ProjectedCoordinate,
    ) -> Result<PanoramaId, ResolveError> {
        let attempts = self.retry.attempts();

        let result = self
            .retry
            .run(
                self.clock.as_ref(),
                |attempt, error: &String| {
                    metrics::REMOTE_REQUESTS
                        .with_label_values(&["panorama", "error"])
                        .inc();
                    if attempt < attempts {
                        metrics::RETRY_ATTEMPTS.with_label_values(&["panorama"]).inc();
                    }
                    log_warn!(
                        self.logger,
                        "panorama lookup at {} failed (attempt {}/{}): {}",
                        coordinate,
                        attempt,
                        attempts,
                        error
                    );
                },
                |_| async move {
                    match self.api.query_panorama(coordinate).await {
                        Ok(body) if body.trim().is_empty() => Err("empty response body".to_string()),
                        Ok(body) => extract_panorama_id(&body)
                            .ok_or_else(|| "no panorama id in response".to_string()),
                        Err(e) => Err(e.to_string()),
                    }
                },
            )
            .await;

        match result {
            Ok(id) => {
                metrics::REMOTE_REQUESTS
                    .with_label_values(&["panorama", "ok"])
                    .inc();
                log_debug!(self.logger, "panorama at {} is {}", coordinate, id);
                Ok(id)
            }
            Err(last_error) => Err(ResolveError::PanoramaIdNotFound {
                attempts,
                last_error,
            }),
        }
    }
}
