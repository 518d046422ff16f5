//! Mock street view provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::fixtures;
use crate::clock::Clock;
use crate::provider::{ProviderError, StreetViewApi, TileResponse};
use crate::types::{Fid, Heading, PanoramaId, Point, ProjectedCoordinate};

/// Metres per degree used for the fake projection.
const FAKE_SCALE: f64 = 111_319.49;

#[derive(Debug)]
struct MockState {
    conversion_calls: usize,
    panorama_calls: usize,
    tile_calls: usize,
    conversion_times: Vec<Instant>,
    tile_requests: Vec<(PanoramaId, Heading)>,
    failing_conversions: HashSet<String>,
    fail_all_panoramas: bool,
    fail_next_panoramas: u32,
    no_panorama: HashSet<String>,
    /// Projected coordinate key -> FID, filled by conversions.
    projected: HashMap<String, String>,
    /// `None` fails forever, `Some(n)` fails the next `n` requests.
    tile_failures: HashMap<(String, Heading), Option<u32>>,
    tile_content_type: String,
    tile_size: (u32, u32),
}

/// Mock implementation of the [`StreetViewApi`] trait.
///
/// Provides controllable behavior for testing:
/// - Conversions succeed with a deterministic fake projection
/// - Every converted point has panorama `pano-<FID>`
/// - Tiles are small PNG images served as `image/jpeg`
/// - Failures can be scripted per FID and heading
/// - Calls are counted, conversion calls timestamped with an optional clock
///
/// # Example
///
/// ```rust,ignore
/// use streetpano_core::testing::MockStreetViewApi;
///
/// let api = MockStreetViewApi::new();
/// api.fail_tile("7", Heading::from_degrees(90).unwrap());
///
/// // ... run the pipeline ...
///
/// assert_eq!(api.tile_calls(), 10);
/// ```
pub struct MockStreetViewApi {
    state: Mutex<MockState>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for MockStreetViewApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStreetViewApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                conversion_calls: 0,
                panorama_calls: 0,
                tile_calls: 0,
                conversion_times: Vec::new(),
                tile_requests: Vec::new(),
                failing_conversions: HashSet::new(),
                fail_all_panoramas: false,
                fail_next_panoramas: 0,
                no_panorama: HashSet::new(),
                projected: HashMap::new(),
                tile_failures: HashMap::new(),
                tile_content_type: "image/jpeg".to_string(),
                tile_size: (64, 32),
            }),
            clock: None,
        }
    }

    /// Timestamp conversion calls with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Panorama id the mock hands out for `fid`.
    pub fn panorama_id_for(fid: &Fid) -> PanoramaId {
        PanoramaId::new(format!("pano-{}", fid))
    }

    fn projected_key(coordinate: &ProjectedCoordinate) -> String {
        format!("{:.3},{:.3}", coordinate.x, coordinate.y)
    }

    // ---- scripting ----

    /// Answer conversions for `fid` with a non-zero provider status.
    pub fn fail_conversion(&self, fid: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_conversions
            .insert(fid.to_string());
    }

    /// Every panorama lookup returns a body without an id.
    pub fn fail_all_panorama_lookups(&self) {
        self.state.lock().unwrap().fail_all_panoramas = true;
    }

    /// The next `n` panorama lookups fail with HTTP 503.
    pub fn fail_next_panorama_lookups(&self, n: u32) {
        self.state.lock().unwrap().fail_next_panoramas = n;
    }

    /// Lookups for `fid` never find a panorama.
    pub fn no_panorama_for(&self, fid: &str) {
        self.state.lock().unwrap().no_panorama.insert(fid.to_string());
    }

    /// Tile `heading` of `fid` always answers 404.
    pub fn fail_tile(&self, fid: &str, heading: Heading) {
        self.state
            .lock()
            .unwrap()
            .tile_failures
            .insert((fid.to_string(), heading), None);
    }

    /// Tile `heading` of `fid` answers 404 for the next `times` requests.
    pub fn fail_tile_times(&self, fid: &str, heading: Heading, times: u32) {
        self.state
            .lock()
            .unwrap()
            .tile_failures
            .insert((fid.to_string(), heading), Some(times));
    }

    /// Content type of successful tile responses.
    pub fn set_tile_content_type(&self, content_type: &str) {
        self.state.lock().unwrap().tile_content_type = content_type.to_string();
    }

    /// Pixel size of served tiles.
    pub fn set_tile_size(&self, width: u32, height: u32) {
        self.state.lock().unwrap().tile_size = (width, height);
    }

    // ---- inspection ----

    pub fn conversion_calls(&self) -> usize {
        self.state.lock().unwrap().conversion_calls
    }

    pub fn panorama_calls(&self) -> usize {
        self.state.lock().unwrap().panorama_calls
    }

    pub fn tile_calls(&self) -> usize {
        self.state.lock().unwrap().tile_calls
    }

    /// All remote calls of any kind.
    pub fn remote_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.conversion_calls + state.panorama_calls + state.tile_calls
    }

    /// Clock readings at each conversion call (empty without a clock).
    pub fn conversion_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().conversion_times.clone()
    }

    pub fn tile_requests(&self) -> Vec<(PanoramaId, Heading)> {
        self.state.lock().unwrap().tile_requests.clone()
    }
}

#[async_trait]
impl StreetViewApi for MockStreetViewApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert_coordinates(&self, point: &Point) -> Result<String, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.conversion_calls += 1;
        if let Some(clock) = &self.clock {
            state.conversion_times.push(clock.now());
        }

        if state.failing_conversions.contains(point.fid.as_str()) {
            return Ok(r#"{"status":24,"message":"param error","result":[]}"#.to_string());
        }

        let x = point.wgs_x.parse::<f64>().unwrap_or(0.0) * FAKE_SCALE;
        let y = point.wgs_y.parse::<f64>().unwrap_or(0.0) * FAKE_SCALE;
        let key = Self::projected_key(&ProjectedCoordinate { x, y });
        state.projected.insert(key, point.fid.to_string());

        Ok(serde_json::json!({ "status": 0, "result": [{ "x": x, "y": y }] }).to_string())
    }

    async fn query_panorama(
        &self,
        coordinate: &ProjectedCoordinate,
    ) -> Result<String, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.panorama_calls += 1;

        if state.fail_next_panoramas > 0 {
            state.fail_next_panoramas -= 1;
            return Err(ProviderError::Status { status: 503 });
        }

        let fid = state
            .projected
            .get(&Self::projected_key(coordinate))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        if state.fail_all_panoramas || state.no_panorama.contains(&fid) {
            return Ok(r#"{"content":[],"result":{"error":0}}"#.to_string());
        }

        Ok(format!(
            r#"{{"content":{{"id":"{}","x":{},"y":{}}},"result":{{"error":0}}}}"#,
            Self::panorama_id_for(&Fid::new(fid)),
            coordinate.x,
            coordinate.y
        ))
    }

    async fn fetch_tile(
        &self,
        panorama: &PanoramaId,
        heading: Heading,
    ) -> Result<TileResponse, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.tile_calls += 1;
        state.tile_requests.push((panorama.clone(), heading));

        let fid = panorama
            .as_str()
            .strip_prefix("pano-")
            .unwrap_or(panorama.as_str())
            .to_string();

        let failing = match state.tile_failures.get_mut(&(fid, heading)) {
            Some(None) => true,
            Some(Some(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        if failing {
            return Ok(TileResponse {
                status: 404,
                content_type: Some("text/html".to_string()),
                body: b"<html>not found</html>".to_vec(),
            });
        }

        let (width, height) = state.tile_size;
        Ok(TileResponse {
            status: 200,
            content_type: Some(state.tile_content_type.clone()),
            body: fixtures::tile_png(width, height),
        })
    }
}
