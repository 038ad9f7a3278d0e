/// Scene descriptor sets: allocation in a fixed order and the writes that
/// populate each of them

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    DescriptorResource, DescriptorSet, GraphicsDevice, SamplerType, Texture,
};
use crate::uniform_blob::{BlobHandle, UniformBlob};
use super::{DescriptorBinder, DescriptorLayouts, LayoutId};

/// Bloom passes reading: lighting result, post-effect 0, post-effect 1
pub const BLOOM_SET_COUNT: usize = 3;

/// Every set the renderer binds
pub struct SceneSets {
    pub brdf_lut: Arc<dyn DescriptorSet>,
    pub env_prefilter: Arc<dyn DescriptorSet>,
    pub skybox: Arc<dyn DescriptorSet>,
    pub lighting: Arc<dyn DescriptorSet>,
    pub final_output: Arc<dyn DescriptorSet>,
    /// One per model, in scene order
    pub models: Vec<Arc<dyn DescriptorSet>>,
    pub bloom: Vec<Arc<dyn DescriptorSet>>,
}

/// Material textures of one model
pub struct MaterialMaps<'a> {
    pub albedo: &'a dyn Texture,
    pub normal: &'a dyn Texture,
    pub roughness: &'a dyn Texture,
    pub metalness: &'a dyn Texture,
    /// Optional; the AO binding falls back to albedo when absent
    pub ao: Option<&'a dyn Texture>,
}

impl<'a> MaterialMaps<'a> {
    pub fn has_ao_map(&self) -> bool {
        self.ao.is_some()
    }

    /// Texture written into the AO binding
    pub fn ao_or_albedo(&self) -> &'a dyn Texture {
        self.ao.unwrap_or(self.albedo)
    }
}

/// Swapchain-sized attachments read by the lighting and output passes
pub struct FrameAttachments<'a> {
    pub gbuffers: [&'a dyn Texture; 3],
    pub depth: &'a dyn Texture,
    pub lighting_result: &'a dyn Texture,
}

impl DescriptorBinder {
    /// Allocate the scene sets: brdf, env, skybox, lighting, final output,
    /// one per model, then the bloom sets
    pub fn allocate_scene_sets(&mut self, layouts: &DescriptorLayouts, model_count: usize) -> Result<SceneSets> {
        let model_names: Vec<String> = (0..model_count).map(|i| format!("static_mesh_{}", i)).collect();
        let bloom_names: Vec<String> = (0..BLOOM_SET_COUNT).map(|i| format!("bloom_{}", i)).collect();

        let mut requests = vec![
            ("brdf_lut", layouts.get(LayoutId::BrdfLut)?),
            ("env_prefilter", layouts.get(LayoutId::EnvPrefilter)?),
            ("skybox", layouts.get(LayoutId::Skybox)?),
            ("lighting", layouts.get(LayoutId::Lighting)?),
            ("final_output", layouts.get(LayoutId::FinalOutput)?),
        ];
        let mesh_layout = layouts.get(LayoutId::StaticMesh)?;
        for name in &model_names {
            requests.push((name.as_str(), mesh_layout));
        }
        let bloom_layout = layouts.get(LayoutId::Bloom)?;
        for name in &bloom_names {
            requests.push((name.as_str(), bloom_layout));
        }

        let mut sets = self.allocate(&requests)?.into_iter();
        let mut next = || {
            sets.next().ok_or_else(|| {
                crate::error::Error::InvalidResource("descriptor allocation returned too few sets".to_string())
            })
        };

        let brdf_lut = next()?;
        let env_prefilter = next()?;
        let skybox = next()?;
        let lighting = next()?;
        let final_output = next()?;
        let models = (0..model_count).map(|_| next()).collect::<Result<Vec<_>>>()?;
        let bloom = (0..BLOOM_SET_COUNT).map(|_| next()).collect::<Result<Vec<_>>>()?;

        Ok(SceneSets { brdf_lut, env_prefilter, skybox, lighting, final_output, models, bloom })
    }

    pub fn write_brdf_lut_set(&self, device: &dyn GraphicsDevice, set: &Arc<dyn DescriptorSet>, lut: &dyn Texture) -> Result<()> {
        self.update(device, set, 0, &[DescriptorResource::StorageImage(lut)])
    }

    pub fn write_env_prefilter_set(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        blob: &UniformBlob,
        cube_camera: BlobHandle,
        radiance: &dyn Texture,
    ) -> Result<()> {
        self.update(device, set, 0, &[blob.descriptor(cube_camera)?])?;
        self.update(device, set, 1, &[DescriptorResource::SampledTexture(radiance, SamplerType::LinearClamp)])
    }

    pub fn write_skybox_set(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        blob: &UniformBlob,
        trans_mats: BlobHandle,
        radiance: &dyn Texture,
    ) -> Result<()> {
        self.update(device, set, 0, &[blob.descriptor(trans_mats)?])?;
        self.update(device, set, 1, &[DescriptorResource::SampledTexture(radiance, SamplerType::LinearClamp)])
    }

    /// Transforms plus the five material maps; AO falls back to albedo
    pub fn write_static_mesh_set(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        blob: &UniformBlob,
        trans_mats: BlobHandle,
        per_model: BlobHandle,
        maps: &MaterialMaps,
    ) -> Result<()> {
        self.update(device, set, 0, &[blob.descriptor(trans_mats)?])?;
        self.update(device, set, 1, &[blob.descriptor(per_model)?])?;

        let textures = [maps.albedo, maps.normal, maps.roughness, maps.metalness, maps.ao_or_albedo()];
        for (binding, texture) in (2u32..).zip(textures) {
            self.update(device, set, binding, &[DescriptorResource::SampledTexture(texture, SamplerType::LinearRepeat)])?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_lighting_set(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        blob: &UniformBlob,
        light_info: BlobHandle,
        attachments: &FrameAttachments,
        diffuse_irradiance: &dyn Texture,
        specular_irradiance: &dyn Texture,
        brdf_lut: &dyn Texture,
    ) -> Result<()> {
        self.update(device, set, 0, &[blob.descriptor(light_info)?])?;

        let inputs = [attachments.gbuffers[0], attachments.gbuffers[1], attachments.gbuffers[2], attachments.depth];
        for (binding, texture) in (1u32..).zip(inputs) {
            self.update(device, set, binding, &[DescriptorResource::InputAttachment(texture)])?;
        }

        let sampled = [diffuse_irradiance, specular_irradiance, brdf_lut];
        for (binding, texture) in (5u32..).zip(sampled) {
            self.update(device, set, binding, &[DescriptorResource::SampledTexture(texture, SamplerType::LinearClamp)])?;
        }
        Ok(())
    }

    pub fn write_bloom_set(&self, device: &dyn GraphicsDevice, set: &Arc<dyn DescriptorSet>, source: &dyn Texture) -> Result<()> {
        self.update(device, set, 0, &[DescriptorResource::SampledTexture(source, SamplerType::LinearClamp)])
    }

    pub fn write_final_output_set(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        blob: &UniformBlob,
        display_info: BlobHandle,
        attachments: &FrameAttachments,
    ) -> Result<()> {
        self.update(device, set, 0, &[DescriptorResource::SampledTexture(attachments.lighting_result, SamplerType::LinearClamp)])?;

        let debug_views = [attachments.gbuffers[0], attachments.gbuffers[1], attachments.gbuffers[2], attachments.depth];
        for (binding, texture) in (1u32..).zip(debug_views) {
            self.update(device, set, binding, &[DescriptorResource::SampledTexture(texture, SamplerType::NearestClamp)])?;
        }
        self.update(device, set, 5, &[blob.descriptor(display_info)?])
    }
}
