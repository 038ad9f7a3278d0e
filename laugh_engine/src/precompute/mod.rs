//! Precompute: BRDF LUT and irradiance maps
//!
//! Each artifact is loaded from its DDS cache file when present, otherwise
//! computed on the GPU at startup and written back at shutdown.

pub mod dds;
mod artifact_cache;
mod orchestrator;

pub use artifact_cache::{ArtifactCache, ArtifactKind};
pub use dds::DdsImage;
pub use orchestrator::{ArtifactState, PersistReport, PrecomputeContext, PrecomputeOrchestrator};

#[cfg(test)]
#[path = "precompute_tests.rs"]
mod tests;
