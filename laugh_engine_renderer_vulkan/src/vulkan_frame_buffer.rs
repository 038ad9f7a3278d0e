/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Created once per render pass instance and reused every frame; holds
/// its attachment views so they outlive the VkFramebuffer.

use ash::vk;
use laugh_engine::laugh::render::{
    Framebuffer as RendererFramebuffer, FramebufferDesc, RenderPass as RendererRenderPass,
    RenderTarget as RendererRenderTarget,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::engine_err;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_render_target::RenderTarget;

/// Vulkan framebuffer implementation
pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    _attachments: Vec<Arc<dyn RendererRenderTarget>>,
    name: String,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 || desc.layers == 0 {
            return Err(Error::InvalidResource(format!(
                "Framebuffer '{}' has an empty extent ({}x{}x{})",
                desc.name, desc.width, desc.height, desc.layers
            )));
        }
        if let Some(small) = desc.attachments.iter().find(|a| a.width() < desc.width || a.height() < desc.height) {
            return Err(Error::InvalidResource(format!(
                "Framebuffer '{}': attachment {}x{} smaller than {}x{}",
                desc.name, small.width(), small.height(), desc.width, desc.height
            )));
        }

        // SAFETY: render passes and targets handed to this backend were created by it
        let vk_render_pass = unsafe { &*(desc.render_pass.as_ref() as *const dyn RendererRenderPass as *const RenderPass) };
        let views: Vec<vk::ImageView> = desc.attachments
            .iter()
            .map(|a| unsafe { (*(a.as_ref() as *const dyn RendererRenderTarget as *const RenderTarget)).image_view })
            .collect();

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(desc.layers);

        let framebuffer = unsafe {
            ctx.device.create_framebuffer(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create framebuffer '{}': {:?}", desc.name, e))?
        };

        Ok(Self {
            ctx,
            framebuffer,
            _attachments: desc.attachments.clone(),
            name: desc.name.clone(),
            width: desc.width,
            height: desc.height,
        })
    }
}

impl RendererFramebuffer for Framebuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
