//! Directional tiles: on-disk store, remote acquisition and sufficiency.

mod acquirer;
mod evaluator;
mod store;

pub use acquirer::{TileAcquirer, TileDownloadFailed};
pub use evaluator::{Evaluation, StoredTile, SufficiencyPolicy, TileSet, TileSetEvaluator};
pub use store::{TileStore, TileStoreError};

use serde::{Deserialize, Serialize};

/// Tile acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Which tile sets may be assembled.
    #[serde(default)]
    pub policy: SufficiencyPolicy,

    /// Pause after every tile fetch, success or failure.
    #[serde(default = "default_inter_tile_delay_ms")]
    pub inter_tile_delay_ms: u64,

    /// Media type a tile response must carry.
    #[serde(default = "default_expected_content_type")]
    pub expected_content_type: String,

    /// Headings fetched at once for one point.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_inter_tile_delay_ms() -> u64 {
    500
}

fn default_expected_content_type() -> String {
    "image/jpeg".to_string()
}

fn default_concurrency() -> usize {
    1
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            policy: SufficiencyPolicy::default(),
            inter_tile_delay_ms: default_inter_tile_delay_ms(),
            expected_content_type: default_expected_content_type(),
            concurrency: default_concurrency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_config_defaults() {
        let config: TilesConfig = toml::from_str("").unwrap();
        assert_eq!(config.policy, SufficiencyPolicy::Complete);
        assert_eq!(config.inter_tile_delay_ms, 500);
        assert_eq!(config.expected_content_type, "image/jpeg");
        assert_eq!(config.concurrency, 1);
    }
}
