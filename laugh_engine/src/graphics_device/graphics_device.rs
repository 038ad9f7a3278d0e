/// GraphicsDevice trait - main GPU factory and submission interface

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, CommandList, ComputePipelineDesc, DescriptorPool, DescriptorPoolSizes,
    DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorSetLayoutDesc, Fence,
    Framebuffer, FramebufferDesc, GraphicsPipelineDesc, Pipeline, QueueKind, RenderPass,
    RenderPassDesc, RenderTarget, RenderTargetDesc, Semaphore, Shader, ShaderDesc, SubmitBatch,
    Texture, TextureDesc, TextureFormat,
};

/// Device limits the core needs to honor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Alignment required for dynamic/offset uniform buffer bindings
    pub min_uniform_buffer_offset_alignment: u64,
    /// Upper bound of push constant ranges, in bytes
    pub max_push_constants_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_uniform_buffer_offset_alignment: 256,
            max_push_constants_size: 128,
        }
    }
}

/// Main graphics device trait
///
/// Central factory for GPU objects and the single submission point of the
/// engine. Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
pub trait GraphicsDevice: Send + Sync {
    /// Create a texture, uploading `desc.data` when present
    ///
    /// Textures with initial data end up in `ShaderReadOnly` layout;
    /// textures without data start `Undefined`.
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a buffer, uploading `desc.data` when present
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create an attachment view of one mip level of a texture
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Arc<dyn RenderTarget>>;

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>>;

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a pool able to hold exactly `sizes`
    fn create_descriptor_pool(&mut self, sizes: &DescriptorPoolSizes) -> Result<Box<dyn DescriptorPool>>;

    /// Write `resources` into `binding` of `set` (array elements in order)
    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSet>,
        binding: u32,
        resources: &[DescriptorResource],
    ) -> Result<()>;

    fn create_command_list(&mut self, queue: QueueKind, name: &str) -> Result<Box<dyn CommandList>>;

    fn create_semaphore(&mut self, name: &str) -> Result<Arc<dyn Semaphore>>;

    fn create_fence(&mut self, name: &str, signaled: bool) -> Result<Arc<dyn Fence>>;

    /// Submit batches to a queue; `fence` is signalled when all of them complete
    fn submit(&self, queue: QueueKind, batches: &[SubmitBatch], fence: Option<&dyn Fence>) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    fn limits(&self) -> DeviceLimits;

    /// First candidate usable as a depth attachment, in order
    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Option<TextureFormat>;
}
