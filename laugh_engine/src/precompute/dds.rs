/// DDS codec for the precompute cache
///
/// Only the subset the cache produces: DX10 extended header, uncompressed
/// formats, 2D textures and cube maps with a full or partial mip chain.
/// Payload order is face-major then mip, the same packing as
/// [`subresource_layout`](crate::graphics_device::subresource_layout).

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::graphics_device::{TextureDesc, TextureFormat, TextureInfo, TextureKind, TextureUsage};

const MAGIC: u32 = 0x2053_4444; // "DDS "
const FOURCC_DX10: u32 = 0x3031_5844; // "DX10"
const HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;
const DX10_HEADER_SIZE: usize = 20;
/// Magic + header + DX10 header
pub const DATA_OFFSET: usize = 4 + HEADER_SIZE as usize + DX10_HEADER_SIZE;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDPF_FOURCC: u32 = 0x4;
const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0x200 | 0xFC00;
const DIMENSION_TEXTURE2D: u32 = 3;
const MISC_TEXTURECUBE: u32 = 0x4;

/// DXGI_FORMAT value of a texture format
pub fn dxgi_format(format: TextureFormat) -> Option<u32> {
    match format {
        TextureFormat::R32G32B32A32_SFLOAT => Some(2),
        TextureFormat::R16G16B16A16_SFLOAT => Some(10),
        TextureFormat::R32G32_SFLOAT => Some(16),
        TextureFormat::R8G8B8A8_UNORM => Some(28),
        TextureFormat::R8G8B8A8_SRGB => Some(29),
        TextureFormat::B8G8R8A8_UNORM => Some(87),
        TextureFormat::B8G8R8A8_SRGB => Some(91),
        _ => None,
    }
}

fn texture_format(dxgi: u32) -> Option<TextureFormat> {
    match dxgi {
        2 => Some(TextureFormat::R32G32B32A32_SFLOAT),
        10 => Some(TextureFormat::R16G16B16A16_SFLOAT),
        16 => Some(TextureFormat::R32G32_SFLOAT),
        28 => Some(TextureFormat::R8G8B8A8_UNORM),
        29 => Some(TextureFormat::R8G8B8A8_SRGB),
        87 => Some(TextureFormat::B8G8R8A8_UNORM),
        91 => Some(TextureFormat::B8G8R8A8_SRGB),
        _ => None,
    }
}

/// Decoded DDS file
#[derive(Debug, Clone, PartialEq)]
pub struct DdsImage {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub kind: TextureKind,
    pub mip_levels: u32,
    /// Face-major, then mip
    pub data: Vec<u8>,
}

impl DdsImage {
    /// Whether this image has exactly the shape of `info` (name and usage aside)
    pub fn matches(&self, info: &TextureInfo) -> bool {
        self.width == info.width
            && self.height == info.height
            && self.format == info.format
            && self.kind == info.kind
            && self.mip_levels == info.mip_levels
    }

    pub fn into_texture_desc(self, name: &str, usage: TextureUsage) -> TextureDesc {
        TextureDesc {
            name: name.to_string(),
            width: self.width,
            height: self.height,
            format: self.format,
            usage,
            kind: self.kind,
            mip_levels: self.mip_levels,
            data: Some(self.data),
        }
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidResource(format!("DDS: {}", msg))
}

/// Encode `data` (packed like `subresource_layout(info)`) as a DDS file
pub fn encode(info: &TextureInfo, data: &[u8]) -> Result<Vec<u8>> {
    let dxgi = dxgi_format(info.format)
        .ok_or_else(|| invalid(format!("format {:?} has no DXGI equivalent", info.format)))?;
    if data.len() as u64 != info.byte_size() {
        return Err(invalid(format!(
            "'{}' payload is {} bytes, expected {}", info.name, data.len(), info.byte_size()
        )));
    }

    let is_cube = info.kind == TextureKind::Cube;
    let mut caps = DDSCAPS_TEXTURE;
    if info.mip_levels > 1 {
        caps |= DDSCAPS_MIPMAP | DDSCAPS_COMPLEX;
    }
    if is_cube {
        caps |= DDSCAPS_COMPLEX;
    }

    let mut out = Vec::with_capacity(DATA_OFFSET + data.len());
    let mut put = |v: u32| out.extend_from_slice(&v.to_le_bytes());

    put(MAGIC);
    put(HEADER_SIZE);
    put(DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PITCH | DDSD_PIXELFORMAT | DDSD_MIPMAPCOUNT);
    put(info.height);
    put(info.width);
    put(info.width * info.format.bytes_per_pixel());
    put(0); // depth
    put(info.mip_levels);
    for _ in 0..11 {
        put(0);
    }
    // pixel format
    put(PIXEL_FORMAT_SIZE);
    put(DDPF_FOURCC);
    put(FOURCC_DX10);
    for _ in 0..5 {
        put(0);
    }
    put(caps);
    put(if is_cube { DDSCAPS2_CUBEMAP_ALL_FACES } else { 0 });
    put(0);
    put(0);
    put(0);
    // DX10 header
    put(dxgi);
    put(DIMENSION_TEXTURE2D);
    put(if is_cube { MISC_TEXTURECUBE } else { 0 });
    put(1); // array size (a cube counts once)
    put(0);

    out.extend_from_slice(data);
    Ok(out)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| invalid(format!("truncated header at byte {}", offset)))
}

pub fn decode(bytes: &[u8]) -> Result<DdsImage> {
    if read_u32(bytes, 0)? != MAGIC {
        return Err(invalid("missing magic number".to_string()));
    }
    if read_u32(bytes, 4)? != HEADER_SIZE {
        return Err(invalid("unexpected header size".to_string()));
    }
    let height = read_u32(bytes, 12)?;
    let width = read_u32(bytes, 16)?;
    let mip_levels = read_u32(bytes, 28)?.max(1);
    let pixel_flags = read_u32(bytes, 80)?;
    let fourcc = read_u32(bytes, 84)?;
    if pixel_flags & DDPF_FOURCC == 0 || fourcc != FOURCC_DX10 {
        return Err(invalid("only DX10 headers are supported".to_string()));
    }

    let dx10 = 4 + HEADER_SIZE as usize;
    let dxgi = read_u32(bytes, dx10)?;
    let dimension = read_u32(bytes, dx10 + 4)?;
    let misc = read_u32(bytes, dx10 + 8)?;
    let array_size = read_u32(bytes, dx10 + 12)?;

    let format = texture_format(dxgi).ok_or_else(|| invalid(format!("unsupported DXGI format {}", dxgi)))?;
    if dimension != DIMENSION_TEXTURE2D || array_size != 1 {
        return Err(invalid(format!(
            "only single 2D textures or cube maps (dimension {}, array size {})", dimension, array_size
        )));
    }
    if width == 0 || height == 0 {
        return Err(invalid("zero extent".to_string()));
    }
    let max_mips = 32 - width.max(height).leading_zeros();
    if mip_levels > max_mips {
        return Err(invalid(format!(
            "{} mip(s) exceed the full chain of {} for {}x{}", mip_levels, max_mips, width, height
        )));
    }
    let kind = if misc & MISC_TEXTURECUBE != 0 { TextureKind::Cube } else { TextureKind::Tex2D };

    let info = TextureInfo {
        name: String::new(),
        width,
        height,
        format,
        usage: TextureUsage::SAMPLED,
        kind,
        mip_levels,
    };
    let payload = &bytes[DATA_OFFSET.min(bytes.len())..];
    if payload.len() as u64 != info.byte_size() {
        return Err(invalid(format!(
            "payload is {} bytes, expected {} for {}x{} {:?} with {} mip(s)",
            payload.len(), info.byte_size(), width, height, kind, mip_levels
        )));
    }

    Ok(DdsImage { width, height, format, kind, mip_levels, data: payload.to_vec() })
}

/// Encode and write, creating parent directories
pub fn write_file(path: &Path, info: &TextureInfo, data: &[u8]) -> Result<()> {
    let bytes = encode(info, data)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_file(path: &Path) -> Result<DdsImage> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}
