//! Mock stitching engine for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::fixtures;
use crate::assembler::{ExecutionBackend, StitchEngine, StitchError, StitchRequest, StitchStatus};

#[derive(Debug, Default)]
struct StitcherState {
    statuses: HashMap<ExecutionBackend, StitchStatus>,
    unavailable: HashSet<ExecutionBackend>,
    requests: Vec<StitchRequest>,
}

/// Mock implementation of the [`StitchEngine`] trait.
///
/// Every backend returns `Ok` and writes a small PNG to the output path
/// unless scripted otherwise. Clones share state, so a test can keep one
/// handle while the assembler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockStitchEngine {
    state: Arc<Mutex<StitcherState>>,
}

impl MockStitchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned by `backend`.
    pub fn set_status(&self, backend: ExecutionBackend, status: StitchStatus) {
        self.state.lock().unwrap().statuses.insert(backend, status);
    }

    /// `backend` fails with an engine error instead of a status.
    pub fn set_engine_unavailable(&self, backend: ExecutionBackend) {
        self.state.lock().unwrap().unavailable.insert(backend);
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<StitchRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Backends tried, in order.
    pub fn backends(&self) -> Vec<ExecutionBackend> {
        self.requests().iter().map(|r| r.backend).collect()
    }
}

#[async_trait]
impl StitchEngine for MockStitchEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stitch(&self, request: &StitchRequest) -> Result<StitchStatus, StitchError> {
        let status = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());

            if state.unavailable.contains(&request.backend) {
                return Err(StitchError::EngineNotFound {
                    program: "mock".to_string(),
                });
            }
            state
                .statuses
                .get(&request.backend)
                .copied()
                .unwrap_or(StitchStatus::Ok)
        };

        if status.is_ok() {
            std::fs::write(&request.output, fixtures::tile_png(16, 8))?;
        }
        Ok(status)
    }

    async fn validate(&self) -> Result<(), StitchError> {
        Ok(())
    }
}
