//! Baidu street view client.
//!
//! Three endpoints are involved: `geoconv/v1` converts WGS84 coordinates to
//! the provider's projected system, `qt=qsdata` returns the panorama nearest
//! to a projected point and `qt=pr3d` renders one view of a panorama.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use tracing::debug;

use super::config::ProviderConfig;
use super::{ProviderError, StreetViewApi, TileResponse};
use crate::types::{Heading, PanoramaId, Point, ProjectedCoordinate};

/// Zoom level sent with panorama lookups.
const PANORAMA_LEVEL: &str = "17.031000000000002";

/// HTTP client for the Baidu map endpoints.
pub struct BaiduClient {
    client: Client,
    config: ProviderConfig,
}

impl BaiduClient {
    /// Create a client with the configured headers and timeout.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.access_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "provider access key is required".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer)
                .map_err(|e| ProviderError::NotConfigured(format!("invalid referer: {}", e)))?,
        );
        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static(r#"" Not A;Brand";v="99", "Chromium";v="90", "Google Chrome";v="90""#),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ProviderError::NotConfigured(format!("invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Read the body of a successful text response.
    async fn text_body(response: Response) -> Result<String, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(ProviderError::EmptyBody);
        }
        Ok(body)
    }
}

#[async_trait]
impl StreetViewApi for BaiduClient {
    fn name(&self) -> &str {
        "baidu"
    }

    async fn convert_coordinates(&self, point: &Point) -> Result<String, ProviderError> {
        let coords = format!("{},{}", point.wgs_x, point.wgs_y);
        debug!("geoconv request: fid={}, coords={}", point.fid, coords);

        let response = self
            .client
            .get(&self.config.geoconv_url)
            .query(&[
                ("coords", coords.as_str()),
                ("from", "1"),
                ("to", "6"),
                ("output", "json"),
                ("ak", self.config.access_key.as_str()),
            ])
            .send()
            .await?;

        Self::text_body(response).await
    }

    async fn query_panorama(
        &self,
        coordinate: &ProjectedCoordinate,
    ) -> Result<String, ProviderError> {
        let x = coordinate.x.to_string();
        let y = coordinate.y.to_string();
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        debug!("panorama lookup: x={}, y={}", x, y);

        let response = self
            .client
            .get(&self.config.panorama_url)
            .query(&[
                ("qt", "qsdata"),
                ("x", x.as_str()),
                ("y", y.as_str()),
                ("l", PANORAMA_LEVEL),
                ("action", "0"),
                ("mode", "day"),
                ("t", timestamp.as_str()),
            ])
            .send()
            .await?;

        Self::text_body(response).await
    }

    async fn fetch_tile(
        &self,
        panorama: &PanoramaId,
        heading: Heading,
    ) -> Result<TileResponse, ProviderError> {
        let tile = &self.config.tile;
        debug!("tile request: panoid={}, heading={}", panorama, heading);

        let response = self
            .client
            .get(&self.config.tile_url)
            .query(&[
                ("qt", "pr3d".to_string()),
                ("fovy", tile.fovy.to_string()),
                ("quality", tile.quality.to_string()),
                ("panoid", panorama.as_str().to_string()),
                ("heading", heading.degrees().to_string()),
                ("pitch", tile.pitch.to_string()),
                ("width", tile.width.to_string()),
                ("height", tile.height.to_string()),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(TileResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_access_key() {
        let result = BaiduClient::new(ProviderConfig::with_access_key("  "));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_new_with_key() {
        let client = BaiduClient::new(ProviderConfig::with_access_key("key")).unwrap();
        assert_eq!(client.name(), "baidu");
    }

    #[test]
    fn test_new_rejects_invalid_header() {
        let mut config = ProviderConfig::with_access_key("key");
        config.referer = "bad\nvalue".to_string();
        let result = BaiduClient::new(config);
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
