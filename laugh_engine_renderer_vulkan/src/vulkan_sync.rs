/// Semaphore and Fence - Vulkan synchronization primitives

use ash::vk;
use laugh_engine::laugh::render::{Fence as RendererFence, Semaphore as RendererSemaphore};
use laugh_engine::laugh::Result;
use laugh_engine::engine_err;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct Semaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
    name: String,
}

impl Semaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>, name: &str) -> Result<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            ctx.device.create_semaphore(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create semaphore '{}': {:?}", name, e))?
        };
        Ok(Self { ctx, semaphore, name: name.to_string() })
    }
}

impl RendererSemaphore for Semaphore {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

pub struct Fence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
    name: String,
}

impl Fence {
    pub(crate) fn new(ctx: Arc<GpuContext>, name: &str, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            ctx.device.create_fence(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create fence '{}': {:?}", name, e))?
        };
        Ok(Self { ctx, fence, name: name.to_string() })
    }
}

impl RendererFence for Fence {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait(&self, timeout_ns: u64) -> Result<bool> {
        match unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(engine_err!("laugh::vulkan", "Failed to wait for fence '{}': {:?}", self.name, e)),
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to reset fence '{}': {:?}", self.name, e))
        }
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.ctx.device.get_fence_status(self.fence)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to query fence '{}': {:?}", self.name, e))
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}
