//! Street view provider access.
//!
//! [`StreetViewApi`] is one raw remote call per method: no retries, no rate
//! limiting and no response interpretation beyond the HTTP layer. The
//! resolvers and the tile acquirer build the pipeline semantics on top, so
//! the same logic runs against [`BaiduClient`] in production and
//! `testing::MockStreetViewApi` in tests.

mod baidu;
mod config;

pub use baidu::BaiduClient;
pub use config::{ProviderConfig, TileRequestConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Heading, PanoramaId, Point, ProjectedCoordinate};

/// Errors from a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// Server answered 200 with nothing in the body.
    #[error("empty response body")]
    EmptyBody,

    /// Client could not be constructed.
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Raw tile response; acceptance is decided by the tile acquirer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TileResponse {
    /// Media type without parameters, lowercased (`image/jpeg; q=1` -> `image/jpeg`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mt| mt.trim().to_ascii_lowercase())
            .filter(|mt| !mt.is_empty())
    }
}

/// One remote call per pipeline stage.
#[async_trait]
pub trait StreetViewApi: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Coordinate conversion call. Returns the response body of a 200 reply.
    async fn convert_coordinates(&self, point: &Point) -> Result<String, ProviderError>;

    /// Panorama lookup call. Returns the response body of a 200 reply.
    async fn query_panorama(
        &self,
        coordinate: &ProjectedCoordinate,
    ) -> Result<String, ProviderError>;

    /// Tile call. Returns whatever the server answered.
    async fn fetch_tile(
        &self,
        panorama: &PanoramaId,
        heading: Heading,
    ) -> Result<TileResponse, ProviderError>;
}
