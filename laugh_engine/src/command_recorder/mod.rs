//! Command recorder
//!
//! Records the reusable command lists of the renderer: the two precompute
//! jobs, geometry+lighting, post effects and one present list per swapchain
//! image. Steady-state lists are recorded once with `SimultaneousUse` and
//! resubmitted every frame until the swapchain is recreated.

mod bloom;
mod readback;

pub use bloom::{record_post_effect, BloomSchedule, BloomStep, BloomWork, BLOOM_BLUR_ITERATIONS};
pub use readback::{read_back_texture, record_readback};

use std::sync::Arc;

use crate::asset::{GpuEnvironment, GpuMesh, GpuModel};
use crate::engine_trace;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AccessFlags, ClearValue, CommandList, CommandListUsage, DescriptorSet, Framebuffer,
    GraphicsDevice, ImageBarrier, ImageLayout, IndexType, Pipeline, PipelineStages, QueueKind,
    Rect2D, RenderPass, ShaderStageFlags, Texture, Viewport,
};

/// Work group edge of the BRDF LUT compute shader
pub const BRDF_LUT_GROUP_SIZE: u32 = 16;

/// Begin `cmd`, run `record`, end it
pub(crate) fn record_with<F>(cmd: &mut dyn CommandList, usage: CommandListUsage, record: F) -> Result<()>
where
    F: FnOnce(&mut dyn CommandList) -> Result<()>,
{
    cmd.begin(usage)?;
    record(cmd)?;
    cmd.end()
}

/// Bind `pipeline` with `set` at index 0 and draw a full-screen triangle
pub(crate) fn draw_full_screen(
    cmd: &mut dyn CommandList,
    pipeline: &Arc<dyn Pipeline>,
    set: &Arc<dyn DescriptorSet>,
) -> Result<()> {
    cmd.bind_pipeline(pipeline)?;
    cmd.bind_descriptor_set(pipeline, 0, set)?;
    cmd.draw(3, 0)
}

fn push_words(cmd: &mut dyn CommandList, words: &[u32]) -> Result<()> {
    cmd.push_constants(ShaderStageFlags::FRAGMENT, 0, bytemuck::cast_slice(words))
}

fn bind_mesh(cmd: &mut dyn CommandList, mesh: &GpuMesh) -> Result<()> {
    cmd.bind_vertex_buffer(&mesh.vertex_buffer, 0)?;
    cmd.bind_index_buffer(&mesh.index_buffer, 0, IndexType::U32)
}

fn full_viewport(width: u32, height: u32) -> Viewport {
    Viewport {
        x: 0.0,
        y: 0.0,
        width: width as f32,
        height: height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

// ============================================================================
// BRDF LUT
// ============================================================================

/// Compute job filling the BRDF LUT (left in `General` layout)
pub fn record_brdf_lut(
    device: &mut dyn GraphicsDevice,
    pipeline: &Arc<dyn Pipeline>,
    set: &Arc<dyn DescriptorSet>,
    lut: &Arc<dyn Texture>,
) -> Result<Box<dyn CommandList>> {
    let (width, height) = (lut.info().width, lut.info().height);
    if width % BRDF_LUT_GROUP_SIZE != 0 || height % BRDF_LUT_GROUP_SIZE != 0 {
        return Err(Error::InvalidResource(format!(
            "BRDF LUT {}x{} is not a multiple of {}", width, height, BRDF_LUT_GROUP_SIZE
        )));
    }

    let mut cmd = device.create_command_list(QueueKind::Compute, "brdf_lut")?;
    record_with(cmd.as_mut(), CommandListUsage::OneTimeSubmit, |cmd| {
        cmd.pipeline_barrier(
            PipelineStages::TOP_OF_PIPE,
            PipelineStages::COMPUTE_SHADER,
            &[ImageBarrier::whole(lut, ImageLayout::Undefined, ImageLayout::General,
                AccessFlags::empty(), AccessFlags::SHADER_WRITE)],
        )?;
        cmd.bind_pipeline(pipeline)?;
        cmd.bind_descriptor_set(pipeline, 0, set)?;
        cmd.dispatch(width / BRDF_LUT_GROUP_SIZE, height / BRDF_LUT_GROUP_SIZE, 1)
    })?;
    Ok(cmd)
}

// ============================================================================
// ENVIRONMENT PREFILTER
// ============================================================================

/// One irradiance cube map to filter
pub struct PrefilterTarget<'a> {
    pub pipeline: &'a Arc<dyn Pipeline>,
    /// One layered framebuffer per mip level
    pub framebuffers: &'a [Arc<dyn Framebuffer>],
    /// Face edge at mip 0
    pub face_size: u32,
}

pub struct EnvPrefilterWork<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub set: &'a Arc<dyn DescriptorSet>,
    /// Cube drawn once per mip; the geometry stage fans it out to 6 faces
    pub skybox: &'a GpuMesh,
    pub diffuse: Option<PrefilterTarget<'a>>,
    pub specular: Option<PrefilterTarget<'a>>,
}

/// Roughness filtered into `level` of a chain of `mip_levels`
pub fn roughness_for_level(level: u32, mip_levels: u32) -> f32 {
    if mip_levels <= 1 {
        0.0
    } else {
        level as f32 / (mip_levels - 1) as f32
    }
}

fn record_prefilter_level(
    cmd: &mut dyn CommandList,
    work: &EnvPrefilterWork<'_>,
    target: &PrefilterTarget<'_>,
    level: u32,
    roughness: Option<f32>,
) -> Result<()> {
    let size = (target.face_size >> level).max(1);
    let framebuffer = target.framebuffers.get(level as usize).ok_or_else(|| {
        Error::InvalidResource(format!("no prefilter framebuffer for mip {}", level))
    })?;

    cmd.begin_render_pass(
        work.render_pass,
        framebuffer,
        Rect2D::from_extent(size, size),
        &[ClearValue::Color([0.0; 4])],
    )?;
    cmd.set_viewport(full_viewport(size, size))?;
    cmd.set_scissor(Rect2D::from_extent(size, size))?;
    cmd.bind_pipeline(target.pipeline)?;
    cmd.bind_descriptor_set(target.pipeline, 0, work.set)?;
    if let Some(roughness) = roughness {
        cmd.push_constants(ShaderStageFlags::FRAGMENT, 0, bytemuck::bytes_of(&roughness))?;
    }
    bind_mesh(cmd, work.skybox)?;
    cmd.draw_indexed(work.skybox.index_count, 0, 0)?;
    cmd.end_render_pass()
}

/// Graphics job filtering the radiance map into the irradiance maps that need it
pub fn record_env_prefilter(
    device: &mut dyn GraphicsDevice,
    work: &EnvPrefilterWork<'_>,
) -> Result<Box<dyn CommandList>> {
    let mut cmd = device.create_command_list(QueueKind::Graphics, "env_prefilter")?;
    record_with(cmd.as_mut(), CommandListUsage::OneTimeSubmit, |cmd| {
        if let Some(diffuse) = &work.diffuse {
            record_prefilter_level(cmd, work, diffuse, 0, None)?;
        }
        if let Some(specular) = &work.specular {
            let mip_levels = specular.framebuffers.len() as u32;
            for level in 0..mip_levels {
                let roughness = roughness_for_level(level, mip_levels);
                engine_trace!("laugh::CommandRecorder", "Specular mip {} roughness {:.3}", level, roughness);
                record_prefilter_level(cmd, work, specular, level, Some(roughness))?;
            }
        }
        Ok(())
    })?;
    Ok(cmd)
}

// ============================================================================
// GEOMETRY + LIGHTING
// ============================================================================

pub struct GeometryLightingWork<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub framebuffer: &'a Arc<dyn Framebuffer>,
    pub extent: (u32, u32),
    pub skybox_pipeline: &'a Arc<dyn Pipeline>,
    pub skybox_set: &'a Arc<dyn DescriptorSet>,
    pub environment: &'a GpuEnvironment,
    pub mesh_pipeline: &'a Arc<dyn Pipeline>,
    pub models: &'a [GpuModel],
    /// One set per model, same order
    pub model_sets: &'a [Arc<dyn DescriptorSet>],
    pub lighting_pipeline: &'a Arc<dyn Pipeline>,
    pub lighting_set: &'a Arc<dyn DescriptorSet>,
    pub specular_mip_levels: u32,
}

/// Depth cleared to the far plane, every color attachment to zero
pub fn geometry_clear_values() -> [ClearValue; 5] {
    [
        ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ClearValue::Color([0.0; 4]),
        ClearValue::Color([0.0; 4]),
        ClearValue::Color([0.0; 4]),
        ClearValue::Color([0.0; 4]),
    ]
}

pub fn record_geometry_lighting(
    device: &mut dyn GraphicsDevice,
    work: &GeometryLightingWork<'_>,
) -> Result<Box<dyn CommandList>> {
    if work.models.len() != work.model_sets.len() {
        return Err(Error::InvalidResource(format!(
            "{} model(s) but {} descriptor set(s)", work.models.len(), work.model_sets.len()
        )));
    }

    let (width, height) = work.extent;
    let mut cmd = device.create_command_list(QueueKind::Graphics, "geometry_lighting")?;
    record_with(cmd.as_mut(), CommandListUsage::SimultaneousUse, |cmd| {
        cmd.begin_render_pass(
            work.render_pass,
            work.framebuffer,
            Rect2D::from_extent(width, height),
            &geometry_clear_values(),
        )?;

        let sky = &work.environment.mesh;
        cmd.bind_pipeline(work.skybox_pipeline)?;
        cmd.bind_descriptor_set(work.skybox_pipeline, 0, work.skybox_set)?;
        push_words(cmd, &[work.environment.material_type])?;
        bind_mesh(cmd, sky)?;
        cmd.draw_indexed(sky.index_count, 0, 0)?;

        cmd.bind_pipeline(work.mesh_pipeline)?;
        for (model, set) in work.models.iter().zip(work.model_sets) {
            cmd.bind_descriptor_set(work.mesh_pipeline, 0, set)?;
            push_words(cmd, &[model.material_id, model.has_ao_map() as u32])?;
            bind_mesh(cmd, &model.mesh)?;
            cmd.draw_indexed(model.mesh.index_count, 0, 0)?;
        }

        cmd.next_subpass()?;
        cmd.bind_pipeline(work.lighting_pipeline)?;
        cmd.bind_descriptor_set(work.lighting_pipeline, 0, work.lighting_set)?;
        push_words(cmd, &[work.specular_mip_levels])?;
        cmd.draw(3, 0)?;
        cmd.end_render_pass()
    })?;
    Ok(cmd)
}

// ============================================================================
// PRESENT
// ============================================================================

pub struct PresentWork<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// One framebuffer per swapchain image
    pub framebuffers: &'a [Arc<dyn Framebuffer>],
    pub pipeline: &'a Arc<dyn Pipeline>,
    pub set: &'a Arc<dyn DescriptorSet>,
    pub extent: (u32, u32),
}

/// One list per swapchain image, indexed like the swapchain images
pub fn record_present(
    device: &mut dyn GraphicsDevice,
    work: &PresentWork<'_>,
) -> Result<Vec<Box<dyn CommandList>>> {
    let (width, height) = work.extent;
    let mut lists = Vec::with_capacity(work.framebuffers.len());
    for (index, framebuffer) in work.framebuffers.iter().enumerate() {
        let mut cmd = device.create_command_list(QueueKind::Graphics, &format!("present_{}", index))?;
        record_with(cmd.as_mut(), CommandListUsage::SimultaneousUse, |cmd| {
            cmd.begin_render_pass(
                work.render_pass,
                framebuffer,
                Rect2D::from_extent(width, height),
                &[ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
            )?;
            draw_full_screen(cmd, work.pipeline, work.set)?;
            cmd.end_render_pass()
        })?;
        lists.push(cmd);
    }
    Ok(lists)
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
