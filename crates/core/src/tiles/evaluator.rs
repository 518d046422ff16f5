//! Decides whether a point's tiles can be assembled.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::store::TileStore;
use crate::types::{Fid, Heading, Point};

/// Which tile sets are good enough to stitch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SufficiencyPolicy {
    /// All eight headings are required.
    #[default]
    Complete,
    /// Any non-empty subset is assembled.
    Degraded,
}

/// A tile on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTile {
    pub heading: Heading,
    pub path: PathBuf,
}

/// Tiles of one point in heading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet {
    pub fid: Fid,
    pub tiles: Vec<StoredTile>,
}

impl TileSet {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.tiles.len() == Heading::COUNT
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.tiles.iter().map(|tile| tile.path.clone()).collect()
    }

    pub fn headings(&self) -> Vec<Heading> {
        self.tiles.iter().map(|tile| tile.heading).collect()
    }
}

/// Result of evaluating a point's tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Ready(TileSet),
    Insufficient { found: usize },
}

/// Applies a [`SufficiencyPolicy`] to the tiles in a [`TileStore`].
#[derive(Debug, Clone)]
pub struct TileSetEvaluator {
    store: TileStore,
    policy: SufficiencyPolicy,
}

impl TileSetEvaluator {
    pub fn new(store: TileStore, policy: SufficiencyPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SufficiencyPolicy {
        self.policy
    }

    pub fn evaluate(&self, point: &Point) -> Evaluation {
        let tiles: Vec<StoredTile> = self
            .store
            .present_headings(point)
            .into_iter()
            .map(|heading| StoredTile {
                heading,
                path: self.store.tile_path(point, heading),
            })
            .collect();

        let sufficient = match self.policy {
            SufficiencyPolicy::Complete => tiles.len() == Heading::COUNT,
            SufficiencyPolicy::Degraded => !tiles.is_empty(),
        };

        if sufficient {
            Evaluation::Ready(TileSet {
                fid: point.fid.clone(),
                tiles,
            })
        } else {
            Evaluation::Insufficient { found: tiles.len() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(headings: &[u16]) -> (TempDir, TileStore, Point) {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path().join("images"), temp.path().join("panoramas"));
        store.ensure_dirs().unwrap();
        let point = Point::new("5", "121.47", "31.23");

        // Written out of order on purpose
        for degrees in headings.iter().rev() {
            let heading = Heading::from_degrees(*degrees).unwrap();
            std::fs::write(store.tile_path(&point, heading), b"tile").unwrap();
        }
        (temp, store, point)
    }

    #[test]
    fn test_complete_set_is_ordered_by_heading() {
        let (_temp, store, point) = setup(&[0, 45, 90, 135, 180, 225, 270, 315]);
        let evaluator = TileSetEvaluator::new(store, SufficiencyPolicy::Complete);

        match evaluator.evaluate(&point) {
            Evaluation::Ready(set) => {
                assert!(set.is_complete());
                assert_eq!(set.headings(), Heading::ALL.to_vec());
                assert!(set.paths()[0].ends_with("5_121.47_31.23_0.png"));
                assert!(set.paths()[7].ends_with("5_121.47_31.23_315.png"));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_policy_rejects_partial_set() {
        let (_temp, store, point) = setup(&[0, 45, 90, 135, 180, 225, 270]);
        let evaluator = TileSetEvaluator::new(store, SufficiencyPolicy::Complete);

        assert_eq!(
            evaluator.evaluate(&point),
            Evaluation::Insufficient { found: 7 }
        );
    }

    #[test]
    fn test_degraded_policy_accepts_subset_in_order() {
        let (_temp, store, point) = setup(&[315, 0, 180]);
        let evaluator = TileSetEvaluator::new(store, SufficiencyPolicy::Degraded);

        match evaluator.evaluate(&point) {
            Evaluation::Ready(set) => {
                let degrees: Vec<u16> = set.headings().iter().map(|h| h.degrees()).collect();
                assert_eq!(degrees, vec![0, 180, 315]);
                assert!(!set.is_complete());
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_degraded_policy_rejects_empty_set() {
        let (_temp, store, point) = setup(&[]);
        let evaluator = TileSetEvaluator::new(store, SufficiencyPolicy::Degraded);

        assert_eq!(
            evaluator.evaluate(&point),
            Evaluation::Insufficient { found: 0 }
        );
    }

    #[test]
    fn test_policy_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: SufficiencyPolicy,
        }
        let wrapper: Wrapper = toml::from_str(r#"policy = "degraded""#).unwrap();
        assert_eq!(wrapper.policy, SufficiencyPolicy::Degraded);
    }
}
