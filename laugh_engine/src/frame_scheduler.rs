/// Frame scheduler
///
/// Acquire, submit the three steady-state batches, present. One frame is in
/// flight: the next frame waits on `frame_done` before touching the
/// swapchain again.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, CommandList, Fence, GraphicsDevice, PipelineStages, PresentOutcome, QueueKind,
    Semaphore, SubmitBatch, Swapchain,
};
use crate::{engine_debug, engine_trace};

/// Outcome of one `draw_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The swapchain was out of date at acquire; nothing was submitted
    SkippedOutOfDate,
    /// Presented, but the swapchain is out of date or suboptimal
    PresentedStale,
}

impl FrameStatus {
    /// Whether swapchain-dependent resources must be rebuilt
    pub fn needs_recreation(self) -> bool {
        !matches!(self, FrameStatus::Presented)
    }
}

/// Semaphores and fences shared by the frame loop and the precompute jobs
pub struct FrameSyncSet {
    pub image_acquired: Arc<dyn Semaphore>,
    pub geometry_lighting_done: Arc<dyn Semaphore>,
    pub post_effect_done: Arc<dyn Semaphore>,
    pub output_done: Arc<dyn Semaphore>,
    /// Signalled when the previous frame's submission retired
    pub frame_done: Arc<dyn Fence>,
    pub brdf_lut: Arc<dyn Fence>,
    pub env_prefilter: Arc<dyn Fence>,
}

impl FrameSyncSet {
    pub fn create(device: &mut dyn GraphicsDevice) -> Result<Self> {
        Ok(Self {
            image_acquired: device.create_semaphore("image_acquired")?,
            geometry_lighting_done: device.create_semaphore("geometry_lighting_done")?,
            post_effect_done: device.create_semaphore("post_effect_done")?,
            output_done: device.create_semaphore("output_done")?,
            frame_done: device.create_fence("frame_done", true)?,
            brdf_lut: device.create_fence("brdf_lut", false)?,
            env_prefilter: device.create_fence("env_prefilter", false)?,
        })
    }
}

/// Steady-state command lists of one swapchain generation
pub struct FrameLists<'a> {
    pub geometry_lighting: &'a dyn CommandList,
    pub post_effect: &'a dyn CommandList,
    /// Indexed by swapchain image
    pub present: &'a [Box<dyn CommandList>],
}

pub struct FrameScheduler {
    sync: FrameSyncSet,
    frames_presented: u64,
}

impl FrameScheduler {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self> {
        Ok(Self {
            sync: FrameSyncSet::create(device)?,
            frames_presented: 0,
        })
    }

    pub fn sync(&self) -> &FrameSyncSet {
        &self.sync
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Block until the last submitted frame has retired
    pub fn wait_for_previous_frame(&self) -> Result<()> {
        if !self.sync.frame_done.wait(u64::MAX)? {
            return Err(Error::BackendError("timed out waiting for the previous frame".to_string()));
        }
        Ok(())
    }

    /// Render and present one frame
    ///
    /// # Errors
    ///
    /// Only non-recoverable acquire, submit or present failures. Out-of-date
    /// and suboptimal swapchains come back as a [`FrameStatus`].
    pub fn draw_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        swapchain: &mut dyn Swapchain,
        lists: &FrameLists<'_>,
    ) -> Result<FrameStatus> {
        self.wait_for_previous_frame()?;

        let image_index = match swapchain.acquire_next_image(self.sync.image_acquired.as_ref(), u64::MAX)? {
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                if suboptimal {
                    engine_trace!("laugh::FrameScheduler", "Acquired suboptimal image {}", image_index);
                }
                image_index
            }
            AcquireOutcome::OutOfDate => {
                engine_debug!("laugh::FrameScheduler", "Swapchain out of date at acquire, skipping frame");
                return Ok(FrameStatus::SkippedOutOfDate);
            }
        };

        let present = lists.present.get(image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "no present list for swapchain image {} ({} recorded)",
                image_index,
                lists.present.len()
            ))
        })?;

        let wait_stage = PipelineStages::COLOR_ATTACHMENT_OUTPUT;
        let sync = &self.sync;
        let batches = [
            SubmitBatch {
                waits: vec![(sync.image_acquired.as_ref(), wait_stage)],
                command_lists: vec![lists.geometry_lighting],
                signals: vec![sync.geometry_lighting_done.as_ref()],
            },
            SubmitBatch {
                waits: vec![(sync.geometry_lighting_done.as_ref(), wait_stage)],
                command_lists: vec![lists.post_effect],
                signals: vec![sync.post_effect_done.as_ref()],
            },
            SubmitBatch {
                waits: vec![(sync.post_effect_done.as_ref(), wait_stage)],
                command_lists: vec![present.as_ref()],
                signals: vec![sync.output_done.as_ref()],
            },
        ];

        sync.frame_done.reset()?;
        device.submit(QueueKind::Graphics, &batches, Some(sync.frame_done.as_ref()))?;

        let outcome = swapchain.present(image_index, &[sync.output_done.as_ref()])?;
        self.frames_presented += 1;
        Ok(match outcome {
            PresentOutcome::Presented => FrameStatus::Presented,
            PresentOutcome::Stale => {
                engine_debug!("laugh::FrameScheduler", "Swapchain stale after present");
                FrameStatus::PresentedStale
            }
        })
    }
}

#[cfg(test)]
#[path = "frame_scheduler_tests.rs"]
mod tests;
