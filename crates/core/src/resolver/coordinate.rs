//! WGS84 -> bd09mc conversion, gated by the shared rate limiter.

use std::sync::Arc;

use serde::Deserialize;

use super::ResolveError;
use crate::log::Logger;
use crate::metrics;
use crate::provider::StreetViewApi;
use crate::rate_limiter::RateLimiter;
use crate::types::{Point, ProjectedCoordinate};
use crate::{log_debug, log_warn};

#[derive(Debug, Deserialize)]
struct GeoconvResponse {
    status: i64,
    #[serde(default)]
    result: Vec<GeoconvPoint>,
}

#[derive(Debug, Deserialize)]
struct GeoconvPoint {
    x: f64,
    y: f64,
}

/// Parse a conversion response body.
///
/// Only `status == 0` with a first result carrying numeric `x` and `y`
/// counts as success.
pub(crate) fn parse_geoconv(body: &str) -> Result<ProjectedCoordinate, String> {
    let response: GeoconvResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {}", e))?;

    if response.status != 0 {
        return Err(format!("provider status {}", response.status));
    }

    let first = response
        .result
        .first()
        .ok_or_else(|| "empty result".to_string())?;

    if !first.x.is_finite() || !first.y.is_finite() {
        return Err("non-finite coordinates".to_string());
    }

    Ok(ProjectedCoordinate {
        x: first.x,
        y: first.y,
    })
}

/// Converts point coordinates with one remote call, no retries.
pub struct CoordinateResolver {
    api: Arc<dyn StreetViewApi>,
    limiter: Arc<RateLimiter>,
    logger: Arc<dyn Logger>,
}

impl CoordinateResolver {
    pub fn new(
        api: Arc<dyn StreetViewApi>,
        limiter: Arc<RateLimiter>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            api,
            limiter,
            logger,
        }
    }

    /// Resolve the projected coordinate of `point`.
    ///
    /// Waits on the rate limiter first; the wait never turns into a failure.
    pub async fn resolve(&self, point: &Point) -> Result<ProjectedCoordinate, ResolveError> {
        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            log_debug!(
                self.logger,
                "FID {}: waited {:?} for the conversion rate limit",
                point.fid,
                waited
            );
        }

        let outcome = match self.api.convert_coordinates(point).await {
            Ok(body) => parse_geoconv(&body),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(coordinate) => {
                metrics::REMOTE_REQUESTS
                    .with_label_values(&["geoconv", "ok"])
                    .inc();
                log_debug!(
                    self.logger,
                    "FID {}: converted to {}",
                    point.fid,
                    coordinate
                );
                Ok(coordinate)
            }
            Err(detail) => {
                metrics::REMOTE_REQUESTS
                    .with_label_values(&["geoconv", "error"])
                    .inc();
                log_warn!(
                    self.logger,
                    "FID {}: coordinate conversion failed: {}",
                    point.fid,
                    detail
                );
                Err(ResolveError::CoordinateConversionFailed(detail))
            }
        }
    }
}
