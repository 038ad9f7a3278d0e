/// Texture trait, texture descriptor, texture info and subresource layout

use bitflags::bitflags;

/// Texture and attachment format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::D32_SFLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT
            | TextureFormat::R32G32_SFLOAT
            | TextureFormat::D32_SFLOAT_S8_UINT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D32_SFLOAT
                | TextureFormat::D32_SFLOAT_S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D32_SFLOAT_S8_UINT | TextureFormat::D24_UNORM_S8_UINT)
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const COLOR_ATTACHMENT = 1 << 1;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        const INPUT_ATTACHMENT = 1 << 3;
        const STORAGE = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

/// Image dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Plain 2D image (one layer)
    Tex2D,
    /// Cube map (six layers, ordered +X, -X, +Y, -Y, +Z, -Z)
    Cube,
}

impl TextureKind {
    pub fn layer_count(&self) -> u32 {
        match self {
            TextureKind::Tex2D => 1,
            TextureKind::Cube => 6,
        }
    }
}

/// Sampler configuration, resolved to a concrete sampler by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Linear filtering, repeat addressing, full mip chain (material textures)
    LinearRepeat,
    /// Linear filtering, clamp-to-edge (LUTs, irradiance maps, post effects)
    LinearClamp,
    /// Nearest filtering, clamp-to-edge (G-buffer reads)
    NearestClamp,
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
///
/// `data`, when present, holds every subresource packed in
/// [`subresource_layout`] order (layer-major, then mip).
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name (also used in logs)
    pub name: String,
    /// Width in pixels of mip 0
    pub width: u32,
    /// Height in pixels of mip 0
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// 2D or cube
    pub kind: TextureKind,
    /// Number of mip levels (>= 1)
    pub mip_levels: u32,
    /// Optional initial data to upload at creation time
    pub data: Option<Vec<u8>>,
}

impl TextureDesc {
    /// Single-mip 2D image without initial data
    pub fn attachment(name: &str, width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            format,
            usage,
            kind: TextureKind::Tex2D,
            mip_levels: 1,
            data: None,
        }
    }
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub kind: TextureKind,
    pub mip_levels: u32,
}

impl TextureInfo {
    pub fn array_layers(&self) -> u32 {
        self.kind.layer_count()
    }

    pub fn is_cube(&self) -> bool {
        self.kind == TextureKind::Cube
    }

    /// Total byte size of all subresources
    pub fn byte_size(&self) -> u64 {
        subresource_layout(self).iter().map(|r| r.size).sum()
    }
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            name: desc.name.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            kind: desc.kind,
            mip_levels: desc.mip_levels,
        }
    }
}

// ===== SUBRESOURCES =====

/// One (layer, mip) slice of a texture inside a tightly packed byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceRegion {
    pub layer: u32,
    pub mip_level: u32,
    pub width: u32,
    pub height: u32,
    /// Byte offset in the packed stream
    pub offset: u64,
    /// Byte size of this slice
    pub size: u64,
}

/// Packed layout of every subresource: all mips of layer 0, then layer 1, ...
///
/// Shared by initial uploads, read-back copies and the DDS codec.
pub fn subresource_layout(info: &TextureInfo) -> Vec<SubresourceRegion> {
    let bpp = info.format.bytes_per_pixel() as u64;
    // bounded so a bogus mip count can neither overshift nor size an unbounded Vec
    let mip_levels = info.mip_levels.min(32);
    let mut regions = Vec::with_capacity((info.array_layers() * mip_levels) as usize);
    let mut offset = 0u64;
    for layer in 0..info.array_layers() {
        for mip_level in 0..mip_levels {
            let width = info.width.checked_shr(mip_level).unwrap_or(0).max(1);
            let height = info.height.checked_shr(mip_level).unwrap_or(0).max(1);
            let size = width as u64 * height as u64 * bpp;
            regions.push(SubresourceRegion { layer, mip_level, width, height, offset, size });
            offset += size;
        }
    }
    regions
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types (e.g., VulkanTexture).
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
