//! Pass graph builder
//!
//! Declares render passes, owns their swapchain-sized attachments and
//! framebuffers, and tears everything down in reverse declaration order.

mod validation;
pub mod standard_passes;

pub use validation::{check_structure, validate_dependencies, HazardKind, HazardViolation};
pub use standard_passes::*;

use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::graphics_device::{
    Framebuffer, GraphicsDevice, RenderPass, RenderPassDesc, Texture, TextureFormat,
};
use crate::{engine_debug, engine_warn};

new_key_type! {
    /// Stable key of a declared pass
    pub struct PassHandle;
}

/// Handles of the declared standard passes
pub type PassMap = FxHashMap<PassId, PassHandle>;

/// Lifetime class of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassScope {
    /// Lives until shutdown (precompute passes)
    Persistent,
    /// Rebuilt whenever the swapchain is recreated
    Swapchain,
}

/// One declared render pass and the resources it owns
pub struct Pass {
    scope: PassScope,
    desc: RenderPassDesc,
    render_pass: Arc<dyn RenderPass>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    images: Vec<Arc<dyn Texture>>,
}

impl Pass {
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn scope(&self) -> PassScope {
        self.scope
    }

    pub fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn framebuffers(&self) -> &[Arc<dyn Framebuffer>] {
        &self.framebuffers
    }

    pub fn images(&self) -> &[Arc<dyn Texture>] {
        &self.images
    }

    /// Framebuffers, then the render pass, then attachment images
    fn release(self) {
        let Pass { framebuffers, render_pass, images, .. } = self;
        drop(framebuffers);
        drop(render_pass);
        drop(images);
    }
}

pub struct PassGraphBuilder {
    passes: SlotMap<PassHandle, Pass>,
    order: Vec<PassHandle>,
    validate_hazards: bool,
}

impl PassGraphBuilder {
    /// Builder with hazard validation on in debug builds
    pub fn new() -> Self {
        Self::with_validation(cfg!(debug_assertions))
    }

    pub fn with_validation(validate_hazards: bool) -> Self {
        Self {
            passes: SlotMap::with_key(),
            order: Vec::new(),
            validate_hazards,
        }
    }

    /// Check `desc` and create its render pass
    ///
    /// # Errors
    ///
    /// `InvalidResource` for out-of-range references, empty subpass lists,
    /// unknown dependency endpoints, or (with validation on) uncovered hazards.
    pub fn declare_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: RenderPassDesc,
        scope: PassScope,
    ) -> Result<PassHandle> {
        check_structure(&desc)?;

        if self.validate_hazards {
            if let Err(violations) = validate_dependencies(&desc) {
                for v in &violations {
                    engine_warn!("laugh::PassGraph", "'{}': {}", desc.name, v);
                }
                return Err(Error::InvalidResource(format!(
                    "render pass '{}' has {} uncovered hazard(s)",
                    desc.name,
                    violations.len()
                )));
            }
        }

        let render_pass = device.create_render_pass(&desc)?;
        engine_debug!("laugh::PassGraph", "Declared pass '{}' ({:?}, {} subpasses)",
            desc.name, scope, desc.subpasses.len());

        let handle = self.passes.insert(Pass {
            scope,
            desc,
            render_pass,
            framebuffers: Vec::new(),
            images: Vec::new(),
        });
        self.order.push(handle);
        Ok(handle)
    }

    /// Declare the standard passes in `ids` that have a render pass
    pub fn declare_standard(
        &mut self,
        device: &mut dyn GraphicsDevice,
        ids: &[PassId],
        depth_format: TextureFormat,
        swapchain_format: TextureFormat,
    ) -> Result<PassMap> {
        let mut handles = PassMap::default();
        for &id in ids {
            if let Some(desc) = id.desc(depth_format, swapchain_format) {
                handles.insert(id, self.declare_pass(device, desc, id.scope())?);
            }
        }
        Ok(handles)
    }

    pub fn attach_framebuffers(&mut self, handle: PassHandle, framebuffers: Vec<Arc<dyn Framebuffer>>) -> Result<()> {
        self.pass_mut(handle)?.framebuffers.extend(framebuffers);
        Ok(())
    }

    pub fn attach_images(&mut self, handle: PassHandle, images: Vec<Arc<dyn Texture>>) -> Result<()> {
        self.pass_mut(handle)?.images.extend(images);
        Ok(())
    }

    pub fn pass(&self, handle: PassHandle) -> Result<&Pass> {
        self.passes
            .get(handle)
            .ok_or_else(|| Error::InvalidResource(format!("unknown pass {:?}", handle)))
    }

    fn pass_mut(&mut self, handle: PassHandle) -> Result<&mut Pass> {
        self.passes
            .get_mut(handle)
            .ok_or_else(|| Error::InvalidResource(format!("unknown pass {:?}", handle)))
    }

    pub fn render_pass(&self, handle: PassHandle) -> Result<&Arc<dyn RenderPass>> {
        Ok(self.pass(handle)?.render_pass())
    }

    pub fn desc(&self, handle: PassHandle) -> Result<&RenderPassDesc> {
        Ok(self.pass(handle)?.desc())
    }

    pub fn framebuffer(&self, handle: PassHandle, index: usize) -> Result<&Arc<dyn Framebuffer>> {
        let pass = self.pass(handle)?;
        pass.framebuffers.get(index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "pass '{}' has no framebuffer {} ({} attached)",
                pass.name(), index, pass.framebuffers.len()
            ))
        })
    }

    pub fn contains(&self, handle: PassHandle) -> bool {
        self.passes.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pass names in declaration order
    pub fn pass_names(&self) -> Vec<&str> {
        self.order.iter().filter_map(|h| self.passes.get(*h)).map(|p| p.name()).collect()
    }

    /// Destroy every pass of `scope`, newest first
    pub fn teardown_scope(&mut self, scope: PassScope) {
        let mut kept = Vec::with_capacity(self.order.len());
        for handle in self.order.drain(..).rev() {
            let in_scope = self.passes.get(handle).map(|p| p.scope == scope).unwrap_or(false);
            if in_scope {
                if let Some(pass) = self.passes.remove(handle) {
                    engine_debug!("laugh::PassGraph", "Destroying pass '{}'", pass.name());
                    pass.release();
                }
            } else {
                kept.push(handle);
            }
        }
        kept.reverse();
        self.order = kept;
    }

    /// Destroy every pass, newest first
    pub fn teardown(&mut self) {
        for handle in self.order.drain(..).rev() {
            if let Some(pass) = self.passes.remove(handle) {
                engine_debug!("laugh::PassGraph", "Destroying pass '{}'", pass.name());
                pass.release();
            }
        }
    }
}

impl Default for PassGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PassGraphBuilder {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "pass_graph_tests.rs"]
mod tests;
