//! Provider endpoint configuration.

use serde::{Deserialize, Serialize};

/// Endpoints, credentials and static headers for the street view provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Access key for the coordinate conversion API (`ak`).
    /// Prefer setting it through `STREETPANO_PROVIDER__ACCESS_KEY`.
    pub access_key: String,

    /// Coordinate conversion endpoint.
    #[serde(default = "default_geoconv_url")]
    pub geoconv_url: String,

    /// Panorama lookup endpoint.
    #[serde(default = "default_panorama_url")]
    pub panorama_url: String,

    /// Tile endpoint.
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer sent with tile requests.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Tile geometry and quality.
    #[serde(default)]
    pub tile: TileRequestConfig,
}

/// Fixed query parameters of the tile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequestConfig {
    #[serde(default)]
    pub pitch: i32,
    #[serde(default = "default_fovy")]
    pub fovy: u32,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_geoconv_url() -> String {
    "http://api.map.baidu.com/geoconv/v1/".to_string()
}

fn default_panorama_url() -> String {
    "https://mapsv0.bdimg.com/".to_string()
}

fn default_tile_url() -> String {
    "https://mapsv0.bdimg.com/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36".to_string()
}

fn default_referer() -> String {
    "https://map.baidu.com/".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_fovy() -> u32 {
    90
}

fn default_quality() -> u32 {
    100
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    512
}

impl ProviderConfig {
    /// Config with the given key and default endpoints.
    pub fn with_access_key(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            geoconv_url: default_geoconv_url(),
            panorama_url: default_panorama_url(),
            tile_url: default_tile_url(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            timeout_secs: default_timeout(),
            tile: TileRequestConfig::default(),
        }
    }
}

impl Default for TileRequestConfig {
    fn default() -> Self {
        Self {
            pitch: 0,
            fovy: default_fovy(),
            quality: default_quality(),
            width: default_width(),
            height: default_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: ProviderConfig = toml::from_str(r#"access_key = "abc""#).unwrap();
        assert_eq!(config.access_key, "abc");
        assert_eq!(config.geoconv_url, "http://api.map.baidu.com/geoconv/v1/");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.tile, TileRequestConfig::default());
        assert_eq!(config.tile.width, 1024);
        assert_eq!(config.tile.height, 512);
    }

    #[test]
    fn test_deserialize_tile_override() {
        let toml = r#"
access_key = "abc"
tile_url = "http://localhost:9000/"

[tile]
width = 512
height = 256
pitch = 10
"#;
        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tile_url, "http://localhost:9000/");
        assert_eq!(config.tile.width, 512);
        assert_eq!(config.tile.pitch, 10);
        assert_eq!(config.tile.quality, 100);
    }

    #[test]
    fn test_missing_access_key_fails() {
        let result: Result<ProviderConfig, _> = toml::from_str(r#"timeout_secs = 5"#);
        assert!(result.is_err());
    }
}
