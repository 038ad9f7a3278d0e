/// Buffer trait and buffer descriptor

use crate::error::Result;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer (device local, uploaded once)
    Vertex,
    /// Index buffer (device local, uploaded once)
    Index,
    /// Uniform buffer (host visible, persistently mapped)
    Uniform,
    /// Host-visible transfer destination used for read-back
    Readback,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Optional initial contents (must not exceed `size`)
    pub data: Option<Vec<u8>>,
}

/// Buffer data format for vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Write host data at `offset` (host-visible buffers only)
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Copy `len` bytes starting at `offset` back to the host (host-visible buffers only)
    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;
}
