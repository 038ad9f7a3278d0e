/*!
# Laugh Engine

Core of a deferred PBR renderer with image-based lighting and bloom.

This crate is backend-agnostic: GPU objects are reached through the trait layer in
`graphics_device`, and a backend crate (Vulkan) provides the concrete device and
swapchain. Everything above that layer is plain data plus orchestration.

## Architecture

- **PassGraphBuilder**: render passes, subpass dependencies, reverse teardown
- **PipelineRegistry**: one pipeline per (pass, subpass, kind), built from a manifest
- **DescriptorBinder**: pre-sized pool, sets written once at load
- **UniformBlob**: aligned arena over one host-visible uniform buffer
- **Command recorder**: reusable command lists for every unit of work
- **FrameScheduler**: acquire, three chained submissions, present
- **PrecomputeOrchestrator**: BRDF LUT and irradiance maps, cached as DDS
- **DeferredRenderer**: the `RendererCore` lifecycle composing all of the above
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod uniform_blob;
pub mod uniforms;
pub mod asset;
pub mod pass_graph;
pub mod pipeline_registry;
pub mod descriptor_binder;
pub mod command_recorder;
pub mod frame_scheduler;
pub mod precompute;
pub mod renderer_core;

#[cfg(test)]
mod mock_asset_loader;

// Main laugh namespace module
pub mod laugh {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{EnvironmentConfig, ModelConfig, PrecomputeConfig, RendererConfig, WindowConfig};

    // Renderer lifecycle
    pub use crate::renderer_core::{model_transform, DeferredRenderer, FrameCamera, RendererCore};
    pub use crate::frame_scheduler::FrameStatus;
    pub use crate::precompute::{ArtifactKind, ArtifactState, PersistReport};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device trait layer implemented by backends
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // Asset loading seam
    pub mod asset {
        pub use crate::asset::*;
    }
}

// Re-export math library at crate root
pub use glam;
