//! Trait definitions for the assembler module.

use async_trait::async_trait;

use super::error::StitchError;
use super::types::{StitchRequest, StitchStatus};

/// Black-box panorama stitcher.
///
/// A non-`Ok` [`StitchStatus`] means the engine ran and gave up on these
/// images; `Err` means it could not run.
#[async_trait]
pub trait StitchEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Stitch `request.images` into `request.output` on `request.backend`.
    async fn stitch(&self, request: &StitchRequest) -> Result<StitchStatus, StitchError>;

    /// Checks that the engine is installed and runnable.
    async fn validate(&self) -> Result<(), StitchError>;
}
