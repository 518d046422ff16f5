//! Point -> projected coordinate -> panorama id.

mod coordinate;
mod panorama;

pub use coordinate::CoordinateResolver;
pub use panorama::{extract_panorama_id, PanoramaIdResolver};

use thiserror::Error;

/// Point-fatal resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The conversion call failed or returned an unusable answer.
    #[error("coordinate conversion failed: {0}")]
    CoordinateConversionFailed(String),

    /// No panorama id after every attempt.
    #[error("panorama id not found after {attempts} attempts: {last_error}")]
    PanoramaIdNotFound { attempts: u32, last_error: String },
}
