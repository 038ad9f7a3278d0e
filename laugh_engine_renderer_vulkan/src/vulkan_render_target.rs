/// RenderTarget - attachment view of one mip level of a texture

use ash::vk;
use laugh_engine::laugh::render::{RenderTarget as RendererRenderTarget, RenderTargetDesc, TargetLayers, Texture as RendererTexture};
use laugh_engine::laugh::{Error, Result};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::full_aspect_mask;
use crate::vulkan_texture::Texture;

/// Vulkan render target implementation
///
/// Keeps its texture alive for as long as the view exists.
pub struct RenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) image_view: vk::ImageView,
    _texture: Arc<dyn RendererTexture>,
    width: u32,
    height: u32,
    layer_count: u32,
}

impl RenderTarget {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &RenderTargetDesc) -> Result<Self> {
        let info = desc.texture.info();
        if desc.mip_level >= info.mip_levels {
            return Err(Error::InvalidResource(format!(
                "Render target on '{}': mip {} out of range ({} levels)",
                info.name, desc.mip_level, info.mip_levels
            )));
        }

        let (base_layer, layer_count, view_type) = match desc.layers {
            TargetLayers::Single(layer) if layer < info.array_layers() => (layer, 1, vk::ImageViewType::TYPE_2D),
            TargetLayers::Single(layer) => {
                return Err(Error::InvalidResource(format!(
                    "Render target on '{}': layer {} out of range ({} layers)",
                    info.name, layer, info.array_layers()
                )));
            }
            // layered rendering selects the face with gl_Layer
            TargetLayers::All => (0, info.array_layers(), vk::ImageViewType::TYPE_2D_ARRAY),
        };

        // SAFETY: every texture handed to this backend was created by it
        let vk_texture = unsafe { &*(desc.texture.as_ref() as *const dyn RendererTexture as *const Texture) };
        let image_view = vk_texture.create_view(
            desc.mip_level,
            1,
            base_layer,
            layer_count,
            view_type,
            full_aspect_mask(info.format),
        )?;

        Ok(Self {
            ctx,
            image_view,
            _texture: Arc::clone(&desc.texture),
            width: (info.width >> desc.mip_level).max(1),
            height: (info.height >> desc.mip_level).max(1),
            layer_count,
        })
    }
}

impl RendererRenderTarget for RenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layer_count(&self) -> u32 {
        self.layer_count
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.image_view, None);
        }
    }
}
