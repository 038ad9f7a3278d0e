/// GpuContext - Vulkan objects shared by every backend resource
///
/// Holds the device, the memory allocator, the queues and the pool used
/// for one-shot uploads. Destruction of the device and instance is done
/// by `VulkanGraphicsDevice::drop()`, after every resource is gone.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_err, engine_error};
use std::mem::ManuallyDrop;
use std::sync::Mutex;

/// Queue handle plus the family it belongs to
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueInfo {
    pub queue: vk::Queue,
    pub family: u32,
}

pub(crate) struct GpuContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,

    /// Dropped explicitly before the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    pub graphics: QueueInfo,
    /// Dedicated compute family when available, otherwise the graphics queue
    pub compute: QueueInfo,
    pub present: QueueInfo,

    pub surface_loader: ash::khr::surface::Instance,
    pub limits: vk::PhysicalDeviceLimits,

    /// TRANSIENT | RESET_COMMAND_BUFFER pool on the graphics family
    pub upload_command_pool: Mutex<vk::CommandPool>,

    pub debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    pub fn queue_for_family(&self, family: u32) -> vk::Queue {
        if family == self.compute.family {
            self.compute.queue
        } else {
            self.graphics.queue
        }
    }

    /// Allocate and bind-ready memory for `requirements`
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self.allocator
            .lock()
            .map_err(|_| engine_err!("laugh::vulkan", "GPU allocator lock poisoned"))?;

        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!("laugh::vulkan", "Out of GPU memory for '{}' ({:.2} MB): {:?}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    /// Return an allocation to the allocator (errors are ignored during teardown)
    pub fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Create a buffer and back it with memory from `location`
    pub fn create_raw_buffer(
        &self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create buffer '{}': {:?}", name, e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate(name, requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                self.device.destroy_buffer(buffer, None);
                return Err(engine_err!("laugh::vulkan", "Failed to bind memory of buffer '{}': {:?}", name, e));
            }

            Ok((buffer, allocation))
        }
    }

    /// Host-visible staging buffer holding `data`
    pub fn create_staging_buffer(&self, name: &str, data: &[u8]) -> Result<(vk::Buffer, Allocation)> {
        let (buffer, allocation) = self.create_raw_buffer(
            name,
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        match allocation.mapped_ptr() {
            Some(ptr) => unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr() as *mut u8, data.len());
            },
            None => {
                self.free(allocation);
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(engine_err!("laugh::vulkan", "Staging buffer '{}' is not mapped", name));
            }
        }

        Ok((buffer, allocation))
    }

    /// Record commands with `record`, submit them to the graphics queue and wait
    pub fn one_time_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self.upload_command_pool
            .lock()
            .map_err(|_| engine_err!("laugh::vulkan", "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

            let result = (|| {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!("laugh::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

                record(&self.device, command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!("laugh::vulkan", "Failed to end upload command buffer: {:?}", e))?;

                let command_buffers = [command_buffer];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics.queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("laugh::vulkan", "Failed to submit upload: {:?}", e))?;
                self.device.queue_wait_idle(self.graphics.queue)
                    .map_err(|e| engine_err!("laugh::vulkan", "Failed to wait for upload: {:?}", e))
            })();

            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }
}
