/// Shader module trait and stage flags

use bitflags::bitflags;

/// Programmable pipeline stage a module is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
    Compute,
}

bitflags! {
    /// Shader stage visibility flags (descriptor bindings, push constants)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const GEOMETRY = 1 << 1;
        const FRAGMENT = 1 << 2;
        const COMPUTE = 1 << 3;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

/// Descriptor for creating a shader module
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// Debug name
    pub name: &'a str,
    /// SPIR-V bytecode
    pub code: &'a [u8],
    /// Stage this module is used for
    pub stage: ShaderStage,
    /// Entry point (usually "main")
    pub entry_point: String,
}

/// Shader module trait
pub trait Shader: Send + Sync {
    fn stage(&self) -> ShaderStage;
    fn name(&self) -> &str;
}
