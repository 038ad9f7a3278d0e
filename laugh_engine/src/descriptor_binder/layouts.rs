/// Descriptor set layouts of the deferred renderer
///
/// Binding numbers match the `layout(binding = N)` declarations of the
/// shaders listed in the pipeline manifest.

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorBinding, DescriptorSetLayout, DescriptorSetLayoutDesc, DescriptorType,
    GraphicsDevice, ShaderStageFlags,
};

/// Sampled material maps per model (albedo, normal, roughness, metalness, AO)
pub const MAPS_PER_MODEL: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutId {
    BrdfLut,
    EnvPrefilter,
    Skybox,
    StaticMesh,
    Lighting,
    Bloom,
    FinalOutput,
}

impl LayoutId {
    pub const ALL: [LayoutId; 7] = [
        LayoutId::BrdfLut,
        LayoutId::EnvPrefilter,
        LayoutId::Skybox,
        LayoutId::StaticMesh,
        LayoutId::Lighting,
        LayoutId::Bloom,
        LayoutId::FinalOutput,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayoutId::BrdfLut => "brdf_lut",
            LayoutId::EnvPrefilter => "env_prefilter",
            LayoutId::Skybox => "skybox",
            LayoutId::StaticMesh => "static_mesh",
            LayoutId::Lighting => "lighting",
            LayoutId::Bloom => "bloom",
            LayoutId::FinalOutput => "final_output",
        }
    }

    pub fn desc(self) -> DescriptorSetLayoutDesc {
        use DescriptorType::*;
        let fragment = ShaderStageFlags::FRAGMENT;

        let bindings = match self {
            LayoutId::BrdfLut => vec![
                DescriptorBinding::new(0, StorageImage, ShaderStageFlags::COMPUTE),
            ],
            LayoutId::EnvPrefilter => vec![
                // cube-map camera, consumed by the layered geometry stage
                DescriptorBinding::new(0, UniformBuffer, ShaderStageFlags::GEOMETRY),
                DescriptorBinding::new(1, CombinedImageSampler, fragment),
            ],
            LayoutId::Skybox => vec![
                DescriptorBinding::new(0, UniformBuffer, ShaderStageFlags::VERTEX),
                DescriptorBinding::new(1, CombinedImageSampler, fragment),
            ],
            LayoutId::StaticMesh => {
                let mut bindings = vec![
                    DescriptorBinding::new(0, UniformBuffer, ShaderStageFlags::VERTEX),
                    DescriptorBinding::new(1, UniformBuffer, ShaderStageFlags::VERTEX),
                ];
                for binding in 2..2 + MAPS_PER_MODEL {
                    bindings.push(DescriptorBinding::new(binding, CombinedImageSampler, fragment));
                }
                bindings
            }
            LayoutId::Lighting => {
                let mut bindings = vec![DescriptorBinding::new(0, UniformBuffer, fragment)];
                // gbuffer 0..2 then depth
                for binding in 1..=4 {
                    bindings.push(DescriptorBinding::new(binding, InputAttachment, fragment));
                }
                // diffuse irradiance, specular irradiance, BRDF LUT
                for binding in 5..=7 {
                    bindings.push(DescriptorBinding::new(binding, CombinedImageSampler, fragment));
                }
                bindings
            }
            LayoutId::Bloom => vec![
                DescriptorBinding::new(0, CombinedImageSampler, fragment),
            ],
            LayoutId::FinalOutput => {
                // lighting result, gbuffer 0..2, depth
                let mut bindings: Vec<DescriptorBinding> = (0..5)
                    .map(|binding| DescriptorBinding::new(binding, CombinedImageSampler, fragment))
                    .collect();
                bindings.push(DescriptorBinding::new(5, UniformBuffer, fragment));
                bindings
            }
        };

        DescriptorSetLayoutDesc {
            name: self.name().to_string(),
            bindings,
        }
    }
}

/// Every layout of the renderer, created once
pub struct DescriptorLayouts {
    layouts: FxHashMap<LayoutId, Arc<dyn DescriptorSetLayout>>,
}

impl DescriptorLayouts {
    pub fn create(device: &mut dyn GraphicsDevice) -> Result<Self> {
        let mut layouts = FxHashMap::default();
        for id in LayoutId::ALL {
            layouts.insert(id, device.create_descriptor_set_layout(&id.desc())?);
        }
        Ok(Self { layouts })
    }

    pub fn get(&self, id: LayoutId) -> Result<&Arc<dyn DescriptorSetLayout>> {
        self.layouts
            .get(&id)
            .ok_or_else(|| Error::InvalidResource(format!("descriptor set layout '{}' missing", id.name())))
    }
}
