/// Framebuffer and render target view traits
///
/// A framebuffer binds together the attachment views a render pass
/// renders into. Created once and reused every frame; recreated only
/// when its attachments are (swapchain resize).

use std::sync::Arc;
use crate::graphics_device::{RenderPass, Texture};

/// Attachment-capable view of one mip level of a texture
///
/// Covers a single layer, or every layer of a cube map for layered
/// rendering (the geometry stage selects the face).
pub trait RenderTarget: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn layer_count(&self) -> u32;
}

/// Which layers a render target view covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLayers {
    Single(u32),
    All,
}

/// Descriptor for creating a render target view
#[derive(Clone)]
pub struct RenderTargetDesc {
    pub texture: Arc<dyn Texture>,
    pub mip_level: u32,
    pub layers: TargetLayers,
}

/// Framebuffer: groups the attachment views of a render pass
pub trait Framebuffer: Send + Sync {
    fn name(&self) -> &str;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// Debug name
    pub name: String,
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// One view per render pass attachment, in attachment order
    pub attachments: Vec<Arc<dyn RenderTarget>>,
    pub width: u32,
    pub height: u32,
    /// 1, or 6 for layered cube rendering
    pub layers: u32,
}
