/// Descriptor set layouts, pools and sets - Vulkan implementations
///
/// Sets are freed implicitly when their pool is destroyed.

use ash::vk;
use laugh_engine::laugh::render::{
    Buffer as RendererBuffer, DescriptorPool as RendererDescriptorPool, DescriptorPoolSizes,
    DescriptorResource, DescriptorSet as RendererDescriptorSet,
    DescriptorSetLayout as RendererDescriptorSetLayout, DescriptorSetLayoutDesc, DescriptorType,
    Texture as RendererTexture,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_err, engine_warn};
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{descriptor_type_to_vk, shader_stage_flags_to_vk};
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_texture::Texture;

const DESCRIPTOR_TYPES: [DescriptorType; 4] = [
    DescriptorType::UniformBuffer,
    DescriptorType::CombinedImageSampler,
    DescriptorType::InputAttachment,
    DescriptorType::StorageImage,
];

// ===== LAYOUT =====

pub struct DescriptorSetLayout {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::DescriptorSetLayout,
    desc: DescriptorSetLayoutDesc,
}

impl DescriptorSetLayout {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &DescriptorSetLayoutDesc) -> Result<Self> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc.bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                    .descriptor_count(b.count)
                    .stage_flags(shader_stage_flags_to_vk(b.stages))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe {
            ctx.device.create_descriptor_set_layout(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create descriptor set layout '{}': {:?}", desc.name, e))?
        };

        Ok(Self { ctx, layout, desc: desc.clone() })
    }
}

impl RendererDescriptorSetLayout for DescriptorSetLayout {
    fn desc(&self) -> &DescriptorSetLayoutDesc {
        &self.desc
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

// ===== SET =====

pub struct DescriptorSet {
    pub(crate) set: vk::DescriptorSet,
    name: String,
    layout_name: String,
}

impl RendererDescriptorSet for DescriptorSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout_name(&self) -> &str {
        &self.layout_name
    }
}

// ===== POOL =====

/// Fixed-capacity pool; exhaustion is reported, never grown
pub struct DescriptorPool {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    sizes: DescriptorPoolSizes,
}

impl DescriptorPool {
    pub(crate) fn create(ctx: Arc<GpuContext>, sizes: &DescriptorPoolSizes) -> Result<Self> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = DESCRIPTOR_TYPES
            .iter()
            .filter(|&&ty| sizes.get(ty) > 0)
            .map(|&ty| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(ty),
                descriptor_count: sizes.get(ty),
            })
            .collect();

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(sizes.max_sets.max(1))
            .pool_sizes(&pool_sizes);

        let pool = unsafe {
            ctx.device.create_descriptor_pool(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create descriptor pool: {:?}", e))?
        };

        Ok(Self { ctx, pool, sizes: *sizes })
    }
}

impl RendererDescriptorPool for DescriptorPool {
    fn allocate(&mut self, layout: &Arc<dyn RendererDescriptorSetLayout>, name: &str) -> Result<Arc<dyn RendererDescriptorSet>> {
        // SAFETY: layouts handed to this backend were created by it
        let vk_layout = unsafe { &*(layout.as_ref() as *const dyn RendererDescriptorSetLayout as *const DescriptorSetLayout) };
        let layouts = [vk_layout.layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe {
            self.ctx.device.allocate_descriptor_sets(&allocate_info).map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                    engine_warn!("laugh::vulkan", "Descriptor pool ({:?}) exhausted allocating '{}'", self.sizes, name);
                    Error::DescriptorPoolExhausted(format!("allocating '{}' ({})", name, layout.desc().name))
                }
                other => engine_err!("laugh::vulkan", "Failed to allocate descriptor set '{}': {:?}", name, other),
            })?
        };

        Ok(Arc::new(DescriptorSet {
            set: sets[0],
            name: name.to_string(),
            layout_name: layout.desc().name.clone(),
        }))
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

// ===== WRITES =====

fn texture_ref(texture: &dyn RendererTexture) -> &Texture {
    // SAFETY: textures handed to this backend were created by it
    unsafe { &*(texture as *const dyn RendererTexture as *const Texture) }
}

/// Layout a texture is in while a shader reads it
fn read_layout(texture: &dyn RendererTexture) -> vk::ImageLayout {
    if texture.info().format.is_depth() {
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    } else {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    }
}

/// Write `resources` (array elements in order) into `binding` of `set`
///
/// Every resource must match the binding's declared type.
pub(crate) fn write_descriptor_set(
    ctx: &GpuContext,
    samplers: &mut SamplerCache,
    set: &Arc<dyn RendererDescriptorSet>,
    binding: u32,
    resources: &[DescriptorResource],
) -> Result<()> {
    let Some(first) = resources.first() else {
        return Ok(());
    };
    let descriptor_type = first.descriptor_type();
    if let Some(mismatch) = resources.iter().find(|r| r.descriptor_type() != descriptor_type) {
        return Err(Error::InvalidResource(format!(
            "Set '{}' binding {}: mixed descriptor types {:?} and {:?}",
            set.name(), binding, descriptor_type, mismatch.descriptor_type()
        )));
    }

    // SAFETY: sets handed to this backend were allocated by it
    let vk_set = unsafe { &*(set.as_ref() as *const dyn RendererDescriptorSet as *const DescriptorSet) };

    // Info arrays first, then the write pointing at them
    let mut buffer_infos = Vec::new();
    let mut image_infos = Vec::new();
    for resource in resources {
        match resource {
            DescriptorResource::UniformBuffer { buffer, offset, range } => {
                // SAFETY: buffers handed to this backend were created by it
                let vk_buffer = unsafe { &*(*buffer as *const dyn RendererBuffer as *const Buffer) };
                buffer_infos.push(
                    vk::DescriptorBufferInfo::default()
                        .buffer(vk_buffer.buffer)
                        .offset(*offset)
                        .range(*range),
                );
            }
            DescriptorResource::SampledTexture(texture, sampler_type) => {
                image_infos.push(
                    vk::DescriptorImageInfo::default()
                        .sampler(samplers.get(*sampler_type)?)
                        .image_view(texture_ref(*texture).view)
                        .image_layout(read_layout(*texture)),
                );
            }
            DescriptorResource::InputAttachment(texture) => {
                image_infos.push(
                    vk::DescriptorImageInfo::default()
                        .image_view(texture_ref(*texture).view)
                        .image_layout(read_layout(*texture)),
                );
            }
            DescriptorResource::StorageImage(texture) => {
                image_infos.push(
                    vk::DescriptorImageInfo::default()
                        .image_view(texture_ref(*texture).view)
                        .image_layout(vk::ImageLayout::GENERAL),
                );
            }
        }
    }

    let mut write = vk::WriteDescriptorSet::default()
        .dst_set(vk_set.set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(descriptor_type_to_vk(descriptor_type));
    write = if descriptor_type == DescriptorType::UniformBuffer {
        write.buffer_info(&buffer_infos)
    } else {
        write.image_info(&image_infos)
    };

    unsafe {
        ctx.device.update_descriptor_sets(&[write], &[]);
    }
    Ok(())
}
