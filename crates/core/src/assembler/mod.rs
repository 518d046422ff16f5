//! Panorama assembly with an accelerated backend and a CPU fallback.
//!
//! The feature matching itself is delegated to a [`StitchEngine`]; the
//! production engine runs OpenCV's stitching tool as an external process.

mod assembler;
mod command;
mod config;
mod error;
mod traits;
mod types;

pub use assembler::{Assembled, PanoramaAssembler};
pub use command::CommandStitchEngine;
pub use config::StitcherConfig;
pub use error::{AssemblyError, StitchError};
pub use traits::StitchEngine;
pub use types::{ExecutionBackend, StitchRequest, StitchStatus};
