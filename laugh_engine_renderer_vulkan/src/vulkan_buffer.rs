/// Buffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use laugh_engine::laugh::render::{Buffer as RendererBuffer, BufferDesc, BufferUsage};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err, engine_error};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Vertex and index buffers live in device-local memory and are filled once
/// through a staging copy. Uniform and read-back buffers stay mapped.
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    name: String,
}

fn usage_flags(usage: BufferUsage) -> (vk::BufferUsageFlags, MemoryLocation) {
    match usage {
        BufferUsage::Vertex => (
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        ),
        BufferUsage::Index => (
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        ),
        BufferUsage::Uniform => (vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryLocation::CpuToGpu),
        BufferUsage::Readback => (vk::BufferUsageFlags::TRANSFER_DST, MemoryLocation::GpuToCpu),
    }
}

impl Buffer {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.name)));
        }
        if let Some(data) = &desc.data {
            if data.len() as u64 > desc.size {
                return Err(Error::InvalidResource(format!(
                    "Buffer '{}' initial data ({} bytes) exceeds its size ({} bytes)",
                    desc.name, data.len(), desc.size
                )));
            }
        }

        let (usage, location) = usage_flags(desc.usage);
        let (buffer, allocation) = ctx.create_raw_buffer(&desc.name, desc.size, usage, location)?;

        let created = Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size: desc.size,
            name: desc.name,
        };

        if let Some(data) = desc.data {
            if location == MemoryLocation::GpuOnly {
                created.upload_through_staging(&data)?;
            } else {
                created.update(0, &data)?;
            }
        }

        engine_debug!("laugh::vulkan", "Created buffer '{}' ({} bytes, {:?})", created.name, created.size, desc.usage);
        Ok(created)
    }

    fn upload_through_staging(&self, data: &[u8]) -> Result<()> {
        let (staging, staging_allocation) = self.ctx.create_staging_buffer("buffer_staging", data)?;
        let dst = self.buffer;
        let size = data.len() as u64;

        let result = self.ctx.one_time_submit(|device, command_buffer| unsafe {
            let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
            device.cmd_copy_buffer(command_buffer, staging, dst, &[region]);
        });

        self.ctx.free(staging_allocation);
        unsafe { self.ctx.device.destroy_buffer(staging, None) };
        result
    }

    /// Mapped pointer after checking `offset + len` fits the buffer
    fn mapped_range(&self, offset: u64, len: u64) -> Result<*mut u8> {
        let end = offset.checked_add(len).filter(|&end| end <= self.size);
        if end.is_none() {
            engine_error!("laugh::vulkan", "Buffer '{}': range {}+{} exceeds size {}", self.name, offset, len, self.size);
            return Err(Error::InvalidResource(format!(
                "Buffer '{}' range {}+{} out of bounds ({} bytes)",
                self.name, offset, len, self.size
            )));
        }

        let allocation = self.allocation
            .as_ref()
            .ok_or_else(|| engine_err!("laugh::vulkan", "Buffer '{}' has no allocation", self.name))?;
        let base = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError(format!("Buffer '{}' is not CPU-accessible", self.name)))?
            .as_ptr() as *mut u8;

        Ok(unsafe { base.add(offset as usize) })
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let dst = self.mapped_range(offset, data.len() as u64)?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let src = self.mapped_range(offset, len)?;
        let mut out = vec![0u8; len as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, out.as_mut_ptr(), out.len());
        }
        Ok(out)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
