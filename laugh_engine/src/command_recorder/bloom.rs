/// Bloom post effect
///
/// Bright-pass into post-effect 0, ping-pong Gaussian blur between the two
/// half-resolution post-effect targets, then an additive merge back into the
/// lighting result.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, CommandList, CommandListUsage, DescriptorSet, Framebuffer, GraphicsDevice,
    Pipeline, QueueKind, Rect2D, RenderPass, ShaderStageFlags,
};
use super::{draw_full_screen, record_with};

/// Horizontal + vertical blur pairs
pub const BLOOM_BLUR_ITERATIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomStep {
    /// Lighting result -> post-effect 0
    BrightnessMask,
    /// Post-effect 0 -> post-effect 1
    HorizontalBlur { iteration: u32 },
    /// Post-effect 1 -> post-effect 0
    VerticalBlur { iteration: u32 },
    /// Post-effect 0 added onto the lighting result
    Merge,
}

impl BloomStep {
    /// Bloom descriptor set read by this step
    pub fn source_set(self) -> usize {
        match self {
            BloomStep::BrightnessMask => 0,
            BloomStep::HorizontalBlur { .. } | BloomStep::Merge => 1,
            BloomStep::VerticalBlur { .. } => 2,
        }
    }
}

/// Ordered steps of one bloom pass
#[derive(Debug, Clone)]
pub struct BloomSchedule {
    next: Option<BloomStep>,
    iterations: u32,
}

impl BloomSchedule {
    pub fn new() -> Self {
        Self::with_iterations(BLOOM_BLUR_ITERATIONS)
    }

    fn with_iterations(iterations: u32) -> Self {
        Self { next: Some(BloomStep::BrightnessMask), iterations }
    }
}

impl Default for BloomSchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BloomSchedule {
    type Item = BloomStep;

    fn next(&mut self) -> Option<BloomStep> {
        let current = self.next?;
        self.next = match current {
            BloomStep::BrightnessMask if self.iterations == 0 => Some(BloomStep::Merge),
            BloomStep::BrightnessMask => Some(BloomStep::HorizontalBlur { iteration: 0 }),
            BloomStep::HorizontalBlur { iteration } => Some(BloomStep::VerticalBlur { iteration }),
            BloomStep::VerticalBlur { iteration } if iteration + 1 < self.iterations => {
                Some(BloomStep::HorizontalBlur { iteration: iteration + 1 })
            }
            BloomStep::VerticalBlur { .. } => Some(BloomStep::Merge),
            BloomStep::Merge => None,
        };
        Some(current)
    }
}

pub struct BloomWork<'a> {
    pub clear_pass: &'a Arc<dyn RenderPass>,
    pub merge_pass: &'a Arc<dyn RenderPass>,
    /// Post-effect 0 and 1 (half resolution)
    pub post_effect_framebuffers: [&'a Arc<dyn Framebuffer>; 2],
    /// Lighting result (full resolution)
    pub lighting_framebuffer: &'a Arc<dyn Framebuffer>,
    pub brightness_pipeline: &'a Arc<dyn Pipeline>,
    pub blur_pipeline: &'a Arc<dyn Pipeline>,
    pub merge_pipeline: &'a Arc<dyn Pipeline>,
    /// Sets reading the lighting result, post-effect 0, post-effect 1
    pub sets: &'a [Arc<dyn DescriptorSet>],
    /// Swapchain extent
    pub extent: (u32, u32),
}

impl BloomWork<'_> {
    fn set(&self, step: BloomStep) -> Result<&Arc<dyn DescriptorSet>> {
        self.sets.get(step.source_set()).ok_or_else(|| {
            Error::InvalidResource(format!("bloom step {:?} has no descriptor set", step))
        })
    }
}

fn record_step(cmd: &mut dyn CommandList, work: &BloomWork<'_>, step: BloomStep) -> Result<()> {
    let half = Rect2D::from_extent((work.extent.0 / 2).max(1), (work.extent.1 / 2).max(1));
    let clear = [ClearValue::Color([0.0; 4])];
    let set = work.set(step)?;

    match step {
        BloomStep::BrightnessMask => {
            cmd.begin_render_pass(work.clear_pass, work.post_effect_framebuffers[0], half, &clear)?;
            draw_full_screen(cmd, work.brightness_pipeline, set)?;
        }
        BloomStep::HorizontalBlur { .. } | BloomStep::VerticalBlur { .. } => {
            let horizontal = matches!(step, BloomStep::HorizontalBlur { .. });
            let target = work.post_effect_framebuffers[horizontal as usize];
            cmd.begin_render_pass(work.clear_pass, target, half, &clear)?;
            cmd.bind_pipeline(work.blur_pipeline)?;
            cmd.bind_descriptor_set(work.blur_pipeline, 0, set)?;
            cmd.push_constants(ShaderStageFlags::FRAGMENT, 0, bytemuck::bytes_of(&(horizontal as u32)))?;
            cmd.draw(3, 0)?;
        }
        BloomStep::Merge => {
            let full = Rect2D::from_extent(work.extent.0, work.extent.1);
            cmd.begin_render_pass(work.merge_pass, work.lighting_framebuffer, full, &[])?;
            draw_full_screen(cmd, work.merge_pipeline, set)?;
        }
    }
    cmd.end_render_pass()
}

/// Post-effect list running every step of the bloom schedule
pub fn record_post_effect(device: &mut dyn GraphicsDevice, work: &BloomWork<'_>) -> Result<Box<dyn CommandList>> {
    let mut cmd = device.create_command_list(QueueKind::Graphics, "post_effect")?;
    record_with(cmd.as_mut(), CommandListUsage::SimultaneousUse, |cmd| {
        for step in BloomSchedule::new() {
            record_step(cmd, work, step)?;
        }
        Ok(())
    })?;
    Ok(cmd)
}

#[cfg(test)]
pub(crate) fn schedule_with_iterations(iterations: u32) -> BloomSchedule {
    BloomSchedule::with_iterations(iterations)
}
