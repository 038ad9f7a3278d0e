//! Descriptor binder
//!
//! Owns the descriptor pool, sized ahead of time from the scene contents,
//! and tracks how much of it is left so exhaustion is reported before the
//! device is asked for anything. Sets are allocated and written once at
//! load time; per-frame data only flows through the uniform blob.

mod layouts;
mod scene_sets;

pub use layouts::{DescriptorLayouts, LayoutId, MAPS_PER_MODEL};
pub use scene_sets::*;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorPool, DescriptorPoolSizes, DescriptorResource, DescriptorSet, DescriptorSetLayout,
    DescriptorType, GraphicsDevice,
};
use crate::engine_debug;

const DESCRIPTOR_TYPES: [DescriptorType; 4] = [
    DescriptorType::UniformBuffer,
    DescriptorType::CombinedImageSampler,
    DescriptorType::InputAttachment,
    DescriptorType::StorageImage,
];

impl DescriptorPoolSizes {
    /// Pool capacity for `models` meshes with `maps_per_model` sampled maps each
    pub fn for_scene(models: u32, maps_per_model: u32, baked_brdfs: u32) -> Self {
        Self {
            max_sets: 8 + models,
            uniform_buffers: 6 + 2 * models,
            combined_image_samplers: 14 + models * maps_per_model + baked_brdfs,
            input_attachments: 4,
            storage_images: 1,
        }
    }
}

pub struct DescriptorBinder {
    pool: Box<dyn DescriptorPool>,
    capacity: DescriptorPoolSizes,
    remaining: DescriptorPoolSizes,
}

impl DescriptorBinder {
    pub fn new(device: &mut dyn GraphicsDevice, sizes: DescriptorPoolSizes) -> Result<Self> {
        let pool = device.create_descriptor_pool(&sizes)?;
        engine_debug!("laugh::DescriptorBinder", "Descriptor pool: {:?}", sizes);
        Ok(Self {
            pool,
            capacity: sizes,
            remaining: sizes,
        })
    }

    pub fn capacity(&self) -> DescriptorPoolSizes {
        self.capacity
    }

    pub fn remaining(&self) -> DescriptorPoolSizes {
        self.remaining
    }

    /// Allocate one set per `(name, layout)` pair, all or nothing
    ///
    /// # Errors
    ///
    /// `DescriptorPoolExhausted` if the request exceeds what is left in the pool.
    pub fn allocate(
        &mut self,
        requests: &[(&str, &Arc<dyn DescriptorSetLayout>)],
    ) -> Result<Vec<Arc<dyn DescriptorSet>>> {
        let mut after = self.remaining;

        after.max_sets = after.max_sets.checked_sub(requests.len() as u32).ok_or_else(|| {
            Error::DescriptorPoolExhausted(format!(
                "{} set(s) requested, {} left", requests.len(), self.remaining.max_sets
            ))
        })?;

        for ty in DESCRIPTOR_TYPES {
            let needed: u32 = requests.iter().map(|(_, layout)| layout.desc().count_of(ty)).sum();
            let left = after.get_mut(ty);
            *left = left.checked_sub(needed).ok_or_else(|| {
                Error::DescriptorPoolExhausted(format!(
                    "{} {:?} descriptor(s) requested, {} left", needed, ty, self.remaining.get(ty)
                ))
            })?;
        }

        let mut sets = Vec::with_capacity(requests.len());
        for (name, layout) in requests {
            sets.push(self.pool.allocate(layout, name)?);
        }
        self.remaining = after;
        Ok(sets)
    }

    /// Write `resources` into `binding` of `set`
    pub fn update(
        &self,
        device: &dyn GraphicsDevice,
        set: &Arc<dyn DescriptorSet>,
        binding: u32,
        resources: &[DescriptorResource],
    ) -> Result<()> {
        if resources.is_empty() {
            return Err(Error::InvalidResource(format!(
                "descriptor set '{}': empty write to binding {}", set.name(), binding
            )));
        }
        device.update_descriptor_set(set, binding, resources)
    }
}

#[cfg(test)]
#[path = "descriptor_binder_tests.rs"]
mod tests;
