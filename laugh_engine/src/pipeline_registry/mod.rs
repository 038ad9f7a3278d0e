//! Pipeline registry
//!
//! One immutable pipeline per `(pass, subpass, kind)` key. Descriptions are
//! checked against the target pass before the device sees them.

pub mod manifest;
mod shader_library;

pub use manifest::{
    build_from_manifest, deferred_manifest, ManifestContext, PipelineEntry, ShaderSet, SpecValue,
    VertexInput, ViewportMode,
};
pub use shader_library::ShaderLibrary;

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    ComputePipelineDesc, GraphicsDevice, GraphicsPipelineDesc, Pipeline, PushConstantRange,
    RenderPassDesc, Shader, ShaderStage,
};
use crate::pass_graph::PassId;
use crate::{engine_debug, engine_info};

/// Upper bound of push constant data, in bytes
pub const MAX_PUSH_CONSTANT_BYTES: u32 = 128;

/// Material or effect a pipeline renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    BrdfLut,
    DiffusePrefilter,
    SpecularPrefilter,
    Skybox,
    StaticMesh,
    Lighting,
    BloomBrightness,
    BloomBlur,
    BloomMerge,
    FinalOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub pass: PassId,
    pub subpass: u32,
    pub kind: PipelineKind,
}

impl PipelineKey {
    pub const fn new(pass: PassId, subpass: u32, kind: PipelineKind) -> Self {
        Self { pass, subpass, kind }
    }
}

struct RegisteredPipeline {
    pipeline: Arc<dyn Pipeline>,
    baked_viewport: bool,
}

pub struct PipelineRegistry {
    pipelines: FxHashMap<PipelineKey, RegisteredPipeline>,
    max_push_constant_bytes: u32,
}

impl PipelineRegistry {
    /// Registry honoring the device push constant limit (capped at 128 bytes)
    pub fn new(max_push_constants_size: u32) -> Self {
        Self {
            pipelines: FxHashMap::default(),
            max_push_constant_bytes: max_push_constants_size.min(MAX_PUSH_CONSTANT_BYTES),
        }
    }

    /// Validate and create a graphics pipeline for `key`
    ///
    /// `pass_desc` is the description `desc.render_pass` was created from.
    pub fn create_graphics(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: PipelineKey,
        desc: &GraphicsPipelineDesc,
        pass_desc: &RenderPassDesc,
    ) -> Result<Arc<dyn Pipeline>> {
        self.check_unique(key)?;
        expect_stage(&desc.name, &desc.vertex_shader, ShaderStage::Vertex)?;
        expect_stage(&desc.name, &desc.fragment_shader, ShaderStage::Fragment)?;
        if let Some(geometry) = &desc.geometry_shader {
            expect_stage(&desc.name, geometry, ShaderStage::Geometry)?;
        }

        if desc.subpass != key.subpass {
            return Err(invalid(&desc.name, format!(
                "description targets subpass {} but key says {}", desc.subpass, key.subpass
            )));
        }
        let subpass_count = desc.render_pass.subpass_count();
        let color_count = match pass_desc.color_attachment_count(key.subpass) {
            Some(count) if key.subpass < subpass_count => count,
            _ => {
                return Err(invalid(&desc.name, format!(
                    "subpass {} out of range ({} subpasses)", key.subpass, subpass_count
                )));
            }
        };
        if desc.color_blend.len() != color_count {
            return Err(invalid(&desc.name, format!(
                "{} blend attachment(s) for {} color attachment(s)", desc.color_blend.len(), color_count
            )));
        }
        self.check_push_constants(&desc.name, &desc.push_constant_ranges)?;

        let pipeline = device.create_graphics_pipeline(desc)?;
        engine_debug!("laugh::PipelineRegistry", "Created pipeline '{}' for {:?}", desc.name, key);
        self.pipelines.insert(key, RegisteredPipeline {
            pipeline: Arc::clone(&pipeline),
            baked_viewport: desc.viewport.is_baked(),
        });
        Ok(pipeline)
    }

    pub fn create_compute(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: PipelineKey,
        desc: &ComputePipelineDesc,
    ) -> Result<Arc<dyn Pipeline>> {
        self.check_unique(key)?;
        expect_stage(&desc.name, &desc.shader, ShaderStage::Compute)?;
        self.check_push_constants(&desc.name, &desc.push_constant_ranges)?;

        let pipeline = device.create_compute_pipeline(desc)?;
        engine_debug!("laugh::PipelineRegistry", "Created compute pipeline '{}'", desc.name);
        self.pipelines.insert(key, RegisteredPipeline {
            pipeline: Arc::clone(&pipeline),
            baked_viewport: false,
        });
        Ok(pipeline)
    }

    pub fn get(&self, key: PipelineKey) -> Result<&Arc<dyn Pipeline>> {
        self.pipelines
            .get(&key)
            .map(|p| &p.pipeline)
            .ok_or_else(|| Error::InvalidResource(format!("no pipeline registered for {:?}", key)))
    }

    pub fn contains(&self, key: PipelineKey) -> bool {
        self.pipelines.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Drop every pipeline with a baked viewport; returns how many were dropped
    pub fn invalidate_baked(&mut self) -> usize {
        let before = self.pipelines.len();
        self.pipelines.retain(|_, p| !p.baked_viewport);
        let dropped = before - self.pipelines.len();
        engine_info!("laugh::PipelineRegistry", "Invalidated {} baked-viewport pipeline(s)", dropped);
        dropped
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }

    fn check_unique(&self, key: PipelineKey) -> Result<()> {
        if self.pipelines.contains_key(&key) {
            return Err(Error::InvalidResource(format!("pipeline already registered for {:?}", key)));
        }
        Ok(())
    }

    fn check_push_constants(&self, name: &str, ranges: &[PushConstantRange]) -> Result<()> {
        for range in ranges {
            if range.size == 0 {
                return Err(invalid(name, "empty push constant range".to_string()));
            }
            if range.offset % 4 != 0 || range.size % 4 != 0 {
                return Err(invalid(name, format!(
                    "push constant range {}+{} is not 4-byte aligned", range.offset, range.size
                )));
            }
            if range.offset + range.size > self.max_push_constant_bytes {
                return Err(invalid(name, format!(
                    "push constant range {}+{} exceeds {} bytes",
                    range.offset, range.size, self.max_push_constant_bytes
                )));
            }
        }
        Ok(())
    }
}

fn invalid(name: &str, msg: String) -> Error {
    Error::InvalidResource(format!("pipeline '{}': {}", name, msg))
}

fn expect_stage(name: &str, shader: &Arc<dyn Shader>, stage: ShaderStage) -> Result<()> {
    if shader.stage() != stage {
        return Err(invalid(name, format!(
            "shader '{}' is a {:?} module used as {:?}", shader.name(), shader.stage(), stage
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_registry_tests.rs"]
mod tests;
