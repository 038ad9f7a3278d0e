/// CommandList - Vulkan implementation of the CommandList trait
///
/// Each list owns a pool on its queue's family and a single primary
/// command buffer. Lists recorded with `SimultaneousUse` are resubmitted
/// every frame without being re-recorded.

use ash::vk;
use laugh_engine::laugh::render::{
    Buffer as RendererBuffer, ClearValue, CommandList as RendererCommandList, CommandListUsage,
    DescriptorSet as RendererDescriptorSet, Framebuffer as RendererFramebuffer, ImageBarrier,
    IndexType, Pipeline as RendererPipeline, PipelineBindPoint, PipelineStages, QueueKind, Rect2D,
    RenderPass as RendererRenderPass, ShaderStageFlags, SubresourceRegion, Texture as RendererTexture,
    Viewport,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::engine_err;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_set::DescriptorSet;
use crate::vulkan_format::{
    access_flags_to_vk, clear_value_to_vk, full_aspect_mask, image_layout_to_vk, index_type_to_vk,
    pipeline_stages_to_vk, sampled_aspect_mask, shader_stage_flags_to_vk,
};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

/// Vulkan command list implementation
pub struct CommandList {
    ctx: Arc<GpuContext>,
    /// Pool for allocating the command buffer
    command_pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
    queue: QueueKind,
    name: String,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
    /// Layout of the last bound pipeline (for push constants)
    bound_pipeline_layout: Option<vk::PipelineLayout>,
}

fn not_recording() -> Error {
    Error::BackendError("Command list not recording".to_string())
}

fn vk_bind_point(bind_point: PipelineBindPoint) -> vk::PipelineBindPoint {
    match bind_point {
        PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
        PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
    }
}

fn pipeline_ref(pipeline: &Arc<dyn RendererPipeline>) -> &Pipeline {
    // SAFETY: pipelines handed to this backend were created by it
    unsafe { &*(pipeline.as_ref() as *const dyn RendererPipeline as *const Pipeline) }
}

fn buffer_ref(buffer: &Arc<dyn RendererBuffer>) -> &Buffer {
    // SAFETY: buffers handed to this backend were created by it
    unsafe { &*(buffer.as_ref() as *const dyn RendererBuffer as *const Buffer) }
}

fn texture_ref(texture: &Arc<dyn RendererTexture>) -> &Texture {
    // SAFETY: textures handed to this backend were created by it
    unsafe { &*(texture.as_ref() as *const dyn RendererTexture as *const Texture) }
}

impl CommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>, queue: QueueKind, name: &str) -> Result<Self> {
        let family = match queue {
            QueueKind::Graphics => ctx.graphics.family,
            QueueKind::Compute => ctx.compute.family,
        };

        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create command pool for '{}': {:?}", name, e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("laugh::vulkan", "Failed to allocate command buffer '{}': {:?}", name, e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer: command_buffers[0],
                queue,
                name: name.to_string(),
                is_recording: false,
                in_render_pass: false,
                bound_pipeline_layout: None,
            })
        }
    }

    fn check_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(not_recording())
        }
    }
}

impl RendererCommandList for CommandList {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> QueueKind {
        self.queue
    }

    fn begin(&mut self, usage: CommandListUsage) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError(format!("Command list '{}' already recording", self.name)));
        }

        let flags = match usage {
            CommandListUsage::OneTimeSubmit => vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            CommandListUsage::SimultaneousUse => vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
        };

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer '{}': {:?}", self.name, e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer '{}': {:?}", self.name, e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        self.bound_pipeline_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer '{}': {:?}", self.name, e)))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RendererRenderPass>,
        framebuffer: &Arc<dyn RendererFramebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        // SAFETY: render passes and framebuffers handed to this backend were created by it
        let vk_render_pass = unsafe { &*(render_pass.as_ref() as *const dyn RendererRenderPass as *const RenderPass) };
        let vk_framebuffer = unsafe { &*(framebuffer.as_ref() as *const dyn RendererFramebuffer as *const Framebuffer) };

        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: render_area.x, y: render_area.y },
                extent: vk::Extent2D { width: render_area.width, height: render_area.height },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }
        self.in_render_pass = true;
        Ok(())
    }

    fn next_subpass(&mut self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }

        unsafe {
            self.ctx.device.cmd_next_subpass(self.command_buffer, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.check_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.check_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.check_recording()?;

        let vk_pipeline = pipeline_ref(pipeline);
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk_bind_point(pipeline.bind_point()),
                vk_pipeline.pipeline,
            );
        }

        // Save pipeline layout for push constants
        self.bound_pipeline_layout = Some(vk_pipeline.layout);
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        set: &Arc<dyn RendererDescriptorSet>,
    ) -> Result<()> {
        self.check_recording()?;

        let vk_pipeline = pipeline_ref(pipeline);
        // SAFETY: sets handed to this backend were allocated by it
        let vk_set = unsafe { &*(set.as_ref() as *const dyn RendererDescriptorSet as *const DescriptorSet) };

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk_bind_point(pipeline.bind_point()),
                vk_pipeline.layout,
                set_index,
                &[vk_set.set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.check_recording()?;

        let layout = self.bound_pipeline_layout.ok_or_else(|| {
            Error::BackendError("No pipeline bound for push constants".to_string())
        })?;

        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                layout,
                shader_stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.check_recording()?;

        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[buffer_ref(buffer).buffer],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_recording()?;

        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer_ref(buffer).buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.check_recording()?;

        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.check_recording()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Dispatch inside a render pass".to_string()));
        }

        unsafe {
            self.ctx.device.cmd_dispatch(self.command_buffer, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn pipeline_barrier(
        &mut self,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        barriers: &[ImageBarrier],
    ) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Pipeline barrier inside a render pass".to_string()));
        }

        let image_barriers: Vec<vk::ImageMemoryBarrier> = barriers
            .iter()
            .map(|b| {
                vk::ImageMemoryBarrier::default()
                    .old_layout(image_layout_to_vk(b.old_layout))
                    .new_layout(image_layout_to_vk(b.new_layout))
                    .src_access_mask(access_flags_to_vk(b.src_access))
                    .dst_access_mask(access_flags_to_vk(b.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(texture_ref(&b.texture).image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: full_aspect_mask(b.texture.info().format),
                        base_mip_level: b.base_mip_level,
                        level_count: b.mip_level_count,
                        base_array_layer: b.base_layer,
                        layer_count: b.layer_count,
                    })
            })
            .collect();

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                pipeline_stages_to_vk(src_stages),
                pipeline_stages_to_vk(dst_stages),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &image_barriers,
            );
        }
        Ok(())
    }

    fn copy_texture_to_buffer(
        &mut self,
        texture: &Arc<dyn RendererTexture>,
        buffer: &Arc<dyn RendererBuffer>,
        regions: &[SubresourceRegion],
    ) -> Result<()> {
        self.check_recording()?;

        let aspect = sampled_aspect_mask(texture.info().format);
        let copies: Vec<vk::BufferImageCopy> = regions
            .iter()
            .map(|r| {
                vk::BufferImageCopy::default()
                    .buffer_offset(r.offset)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: aspect,
                        mip_level: r.mip_level,
                        base_array_layer: r.layer,
                        layer_count: 1,
                    })
                    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                    .image_extent(vk::Extent3D { width: r.width, height: r.height, depth: 1 })
            })
            .collect();

        if let Some(last) = regions.iter().map(|r| r.offset + r.size).max() {
            if last > buffer.size() {
                return Err(Error::InvalidResource(format!(
                    "Copy of '{}' needs {} bytes, buffer holds {}",
                    texture.info().name, last, buffer.size()
                )));
            }
        }

        unsafe {
            self.ctx.device.cmd_copy_image_to_buffer(
                self.command_buffer,
                texture_ref(texture).image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                buffer_ref(buffer).buffer,
                &copies,
            );
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
