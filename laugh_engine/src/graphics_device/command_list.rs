/// CommandList trait - for recording GPU commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    AccessFlags, Buffer, DescriptorSet, Framebuffer, ImageLayout, IndexType, Pipeline,
    PipelineStages, RenderPass, ShaderStageFlags, SubresourceRegion, Texture,
};

/// Queue a command list is recorded for and submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Compute,
}

/// How a recorded command list may be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListUsage {
    /// Submitted once, then discarded or re-recorded
    OneTimeSubmit,
    /// Recorded once and resubmitted every frame
    SimultaneousUse,
}

/// Command list for recording rendering and compute commands
///
/// Commands are recorded once and later submitted via `GraphicsDevice::submit()`.
pub trait CommandList: Send + Sync {
    /// Debug name
    fn name(&self) -> &str;

    /// Queue family this list was allocated from
    fn queue(&self) -> QueueKind;

    /// Begin recording (resets previous contents)
    fn begin(&mut self, usage: CommandListUsage) -> Result<()>;

    /// End recording
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass over `render_area` with one clear value per attachment
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// Advance to the next subpass
    fn next_subpass(&mut self) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics or compute pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a descriptor set at `set_index` of `pipeline`'s layout
    fn bind_descriptor_set(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        set: &Arc<dyn DescriptorSet>,
    ) -> Result<()>;

    /// Push constants for the last bound pipeline
    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Record image layout transitions outside a render pass
    fn pipeline_barrier(
        &mut self,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        barriers: &[ImageBarrier],
    ) -> Result<()>;

    /// Copy every listed subresource of `texture` (in TransferSrc layout) into `buffer`
    fn copy_texture_to_buffer(
        &mut self,
        texture: &Arc<dyn Texture>,
        buffer: &Arc<dyn Buffer>,
        regions: &[SubresourceRegion],
    ) -> Result<()>;
}

/// Image layout transition + memory dependency for a subresource range
#[derive(Clone)]
pub struct ImageBarrier {
    pub texture: Arc<dyn Texture>,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl ImageBarrier {
    /// Transition covering every mip and layer of `texture`
    pub fn whole(
        texture: &Arc<dyn Texture>,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        src_access: AccessFlags,
        dst_access: AccessFlags,
    ) -> Self {
        let info = texture.info();
        Self {
            texture: Arc::clone(texture),
            old_layout,
            new_layout,
            src_access,
            dst_access,
            base_mip_level: 0,
            mip_level_count: info.mip_levels,
            base_layer: 0,
            layer_count: info.array_layers(),
        }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
