/// SamplerCache - VkSampler per SamplerType, created on first use
///
/// The engine only ever asks for a handful of sampler configurations.

use ash::vk;
use laugh_engine::laugh::render::SamplerType;
use laugh_engine::laugh::Result;
use laugh_engine::engine_err;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub(crate) struct SamplerCache {
    ctx: Option<Arc<GpuContext>>,
    cache: FxHashMap<SamplerType, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx: Some(ctx),
            cache: FxHashMap::default(),
        }
    }

    /// Get or create the sampler for `sampler_type`
    pub(crate) fn get(&mut self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return Ok(sampler);
        }

        let ctx = self.ctx
            .as_ref()
            .ok_or_else(|| engine_err!("laugh::vulkan", "Sampler cache used after shutdown"))?;
        let sampler = Self::create_vk_sampler(ctx, sampler_type)?;
        self.cache.insert(sampler_type, sampler);
        Ok(sampler)
    }

    /// Destroy every sampler and release the context (device still alive)
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None) };
            }
        }
    }

    fn create_vk_sampler(ctx: &GpuContext, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let (filter, mipmap, address, anisotropic) = match sampler_type {
            SamplerType::LinearRepeat => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::REPEAT,
                true,
            ),
            SamplerType::LinearClamp => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                false,
            ),
            SamplerType::NearestClamp => (
                vk::Filter::NEAREST,
                vk::SamplerMipmapMode::NEAREST,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                false,
            ),
        };

        let max_anisotropy = ctx.limits.max_sampler_anisotropy.min(16.0);
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .anisotropy_enable(anisotropic && max_anisotropy > 1.0)
            .max_anisotropy(if anisotropic { max_anisotropy.max(1.0) } else { 1.0 })
            .unnormalized_coordinates(false);

        unsafe {
            ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create {:?} sampler: {:?}", sampler_type, e))
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
