/// Descriptor set layouts, pools, sets and the resources written into them

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Buffer, SamplerType, ShaderStageFlags, Texture};

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Uniform buffer range
    UniformBuffer,
    /// Image view + sampler
    CombinedImageSampler,
    /// Attachment of the current render pass read in a later subpass
    InputAttachment,
    /// Read/write image (compute)
    StorageImage,
}

/// One binding slot of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Binding number (`layout(binding = N)` in GLSL)
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    pub stages: ShaderStageFlags,
}

impl DescriptorBinding {
    pub fn new(binding: u32, descriptor_type: DescriptorType, stages: ShaderStageFlags) -> Self {
        Self { binding, descriptor_type, count: 1, stages }
    }
}

/// Description of a descriptor set layout
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutDesc {
    pub name: String,
    pub bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutDesc {
    /// Number of descriptors of `ty` one set of this layout consumes
    pub fn count_of(&self, ty: DescriptorType) -> u32 {
        self.bindings
            .iter()
            .filter(|b| b.descriptor_type == ty)
            .map(|b| b.count)
            .sum()
    }
}

/// Descriptor set layout created by the device
pub trait DescriptorSetLayout: Send + Sync {
    fn desc(&self) -> &DescriptorSetLayoutDesc;
}

/// Capacity of a descriptor pool, per descriptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescriptorPoolSizes {
    pub max_sets: u32,
    pub uniform_buffers: u32,
    pub combined_image_samplers: u32,
    pub input_attachments: u32,
    pub storage_images: u32,
}

impl DescriptorPoolSizes {
    pub fn get(&self, ty: DescriptorType) -> u32 {
        match ty {
            DescriptorType::UniformBuffer => self.uniform_buffers,
            DescriptorType::CombinedImageSampler => self.combined_image_samplers,
            DescriptorType::InputAttachment => self.input_attachments,
            DescriptorType::StorageImage => self.storage_images,
        }
    }

    pub fn get_mut(&mut self, ty: DescriptorType) -> &mut u32 {
        match ty {
            DescriptorType::UniformBuffer => &mut self.uniform_buffers,
            DescriptorType::CombinedImageSampler => &mut self.combined_image_samplers,
            DescriptorType::InputAttachment => &mut self.input_attachments,
            DescriptorType::StorageImage => &mut self.storage_images,
        }
    }
}

/// Descriptor set (a bound group of resource references)
pub trait DescriptorSet: Send + Sync {
    /// Debug name given at allocation
    fn name(&self) -> &str;

    /// Name of the layout this set was allocated with
    fn layout_name(&self) -> &str;
}

/// Pool that descriptor sets are allocated from
pub trait DescriptorPool: Send + Sync {
    /// Allocate one set of `layout`
    fn allocate(&mut self, layout: &Arc<dyn DescriptorSetLayout>, name: &str) -> Result<Arc<dyn DescriptorSet>>;
}

/// A concrete resource written into a descriptor binding
pub enum DescriptorResource<'a> {
    /// Uniform buffer range
    UniformBuffer { buffer: &'a dyn Buffer, offset: u64, range: u64 },
    /// Sampled texture (the backend resolves the sampler from the type)
    SampledTexture(&'a dyn Texture, SamplerType),
    /// Input attachment (G-buffer / depth read in a later subpass)
    InputAttachment(&'a dyn Texture),
    /// Storage image in GENERAL layout
    StorageImage(&'a dyn Texture),
}

impl DescriptorResource<'_> {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            DescriptorResource::UniformBuffer { .. } => DescriptorType::UniformBuffer,
            DescriptorResource::SampledTexture(..) => DescriptorType::CombinedImageSampler,
            DescriptorResource::InputAttachment(_) => DescriptorType::InputAttachment,
            DescriptorResource::StorageImage(_) => DescriptorType::StorageImage,
        }
    }
}
