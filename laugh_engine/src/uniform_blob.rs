/// Uniform blob - one host-visible uniform buffer carved into aligned regions
///
/// Regions are handed out as opaque `BlobHandle` keys. Every region offset is
/// a multiple of `max(requested alignment, minUniformBufferOffsetAlignment)`
/// and regions never overlap. Capacity is fixed when the blob is created.

use std::sync::Arc;
use bytemuck::Pod;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, DescriptorResource, GraphicsDevice};
use crate::engine_debug;

new_key_type! {
    /// Opaque handle to one region of a [`UniformBlob`]
    pub struct BlobHandle;
}

/// Placement of one region inside the blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRegion {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

/// Round `value` up to the next multiple of `alignment` (a power of two), `None` on overflow
pub fn align_up(value: u64, alignment: u64) -> Option<u64> {
    value.checked_add(alignment - 1).map(|v| v & !(alignment - 1))
}

pub struct UniformBlob {
    buffer: Arc<dyn Buffer>,
    capacity: u64,
    min_alignment: u64,
    cursor: u64,
    regions: SlotMap<BlobHandle, BlobRegion>,
}

impl UniformBlob {
    /// Create the backing buffer; the minimum alignment comes from the device limits
    pub fn new(device: &mut dyn GraphicsDevice, capacity: u64) -> Result<Self> {
        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        if !min_alignment.is_power_of_two() {
            return Err(Error::InitializationFailed(format!(
                "minUniformBufferOffsetAlignment {} is not a power of two", min_alignment
            )));
        }
        if capacity == 0 {
            return Err(Error::InvalidConfig("uniform blob capacity must be non-zero".to_string()));
        }

        let buffer = device.create_buffer(BufferDesc {
            name: "uniform_blob".to_string(),
            size: capacity,
            usage: BufferUsage::Uniform,
            data: None,
        })?;

        Ok(Self {
            buffer,
            capacity,
            min_alignment,
            cursor: 0,
            regions: SlotMap::with_key(),
        })
    }

    /// Reserve `size` bytes aligned to `max(alignment, min_alignment)`
    pub fn allocate(&mut self, name: &str, size: u64, alignment: u64) -> Result<BlobHandle> {
        if size == 0 {
            return Err(Error::InvalidResource(format!("uniform region '{}' has zero size", name)));
        }
        if alignment != 0 && !alignment.is_power_of_two() {
            return Err(Error::InvalidResource(format!(
                "uniform region '{}': alignment {} is not a power of two", name, alignment
            )));
        }

        let effective = alignment.max(self.min_alignment);
        let offset = align_up(self.cursor, effective).ok_or(Error::OutOfMemory)?;
        let end = offset.checked_add(size).ok_or(Error::OutOfMemory)?;
        if end > self.capacity {
            return Err(Error::OutOfMemory);
        }

        self.cursor = end;
        engine_debug!("laugh::UniformBlob", "Region '{}' at offset {} ({} bytes)", name, offset, size);
        Ok(self.regions.insert(BlobRegion { name: name.to_string(), offset, size }))
    }

    /// Reserve a region sized for `T`
    pub fn allocate_for<T: Pod>(&mut self, name: &str) -> Result<BlobHandle> {
        self.allocate(name, std::mem::size_of::<T>() as u64, 0)
    }

    pub fn region(&self, handle: BlobHandle) -> Result<&BlobRegion> {
        self.regions
            .get(handle)
            .ok_or_else(|| Error::InvalidResource("unknown uniform blob handle".to_string()))
    }

    /// Copy raw bytes into a region (must fit)
    pub fn write_bytes(&self, handle: BlobHandle, bytes: &[u8]) -> Result<()> {
        let region = self.region(handle)?;
        if bytes.len() as u64 > region.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes exceeds uniform region '{}' ({} bytes)",
                bytes.len(), region.name, region.size
            )));
        }
        self.buffer.update(region.offset, bytes)
    }

    /// Copy a plain-old-data value into a region
    pub fn write<T: Pod>(&self, handle: BlobHandle, value: &T) -> Result<()> {
        self.write_bytes(handle, bytemuck::bytes_of(value))
    }

    /// Descriptor resource covering exactly one region
    pub fn descriptor(&self, handle: BlobHandle) -> Result<DescriptorResource<'_>> {
        let region = self.region(handle)?;
        Ok(DescriptorResource::UniformBuffer {
            buffer: self.buffer.as_ref(),
            offset: region.offset,
            range: region.size,
        })
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn min_alignment(&self) -> u64 {
        self.min_alignment
    }

    /// Bytes consumed so far (including alignment padding)
    pub fn used(&self) -> u64 {
        self.cursor
    }

    pub fn regions(&self) -> impl Iterator<Item = (BlobHandle, &BlobRegion)> {
        self.regions.iter()
    }
}

#[cfg(test)]
#[path = "uniform_blob_tests.rs"]
mod tests;
