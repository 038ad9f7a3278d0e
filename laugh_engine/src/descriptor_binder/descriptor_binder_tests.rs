//! Unit tests for the descriptor binder

use std::sync::Arc;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    DescriptorPoolSizes, DescriptorType, GraphicsDevice, Texture, TextureDesc, TextureFormat,
    TextureUsage,
};
use crate::uniform_blob::UniformBlob;
use super::*;

fn texture(device: &mut MockGraphicsDevice, name: &str) -> Arc<dyn Texture> {
    device
        .create_texture(TextureDesc::attachment(name, 4, 4, TextureFormat::R8G8B8A8_UNORM, TextureUsage::SAMPLED))
        .unwrap()
}

fn writes_for(device: &MockGraphicsDevice, set: &str) -> Vec<(u32, Vec<String>)> {
    device
        .log
        .lock()
        .unwrap()
        .descriptor_writes
        .iter()
        .filter(|w| w.set == set)
        .map(|w| (w.binding, w.resources.clone()))
        .collect()
}

// ============================================================================
// POOL SIZING
// ============================================================================

#[test]
fn test_pool_sizes_for_scene() {
    let sizes = DescriptorPoolSizes::for_scene(3, MAPS_PER_MODEL, 1);
    assert_eq!(sizes.max_sets, 11);
    assert_eq!(sizes.uniform_buffers, 12);
    assert_eq!(sizes.combined_image_samplers, 14 + 15 + 1);
    assert_eq!(sizes.input_attachments, 4);
    assert_eq!(sizes.storage_images, 1);
}

#[test]
fn test_scene_sets_fit_the_scene_pool() {
    for models in [1usize, 2, 6] {
        let mut device = MockGraphicsDevice::new();
        let layouts = DescriptorLayouts::create(&mut device).unwrap();
        let sizes = DescriptorPoolSizes::for_scene(models as u32, MAPS_PER_MODEL, 1);
        let mut binder = DescriptorBinder::new(&mut device, sizes).unwrap();

        let sets = binder.allocate_scene_sets(&layouts, models).unwrap();
        assert_eq!(sets.models.len(), models);
        assert_eq!(sets.bloom.len(), BLOOM_SET_COUNT);
        assert_eq!(binder.remaining().max_sets, 0);
        assert_eq!(binder.remaining().input_attachments, 0);
        assert_eq!(binder.remaining().storage_images, 0);
    }
}

// ============================================================================
// ALLOCATION
// ============================================================================

#[test]
fn test_allocation_order() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let mut binder = DescriptorBinder::new(&mut device, DescriptorPoolSizes::for_scene(2, MAPS_PER_MODEL, 1)).unwrap();

    let sets = binder.allocate_scene_sets(&layouts, 2).unwrap();
    assert_eq!(sets.brdf_lut.name(), "brdf_lut");
    assert_eq!(sets.final_output.layout_name(), "final_output");
    assert_eq!(sets.models[1].name(), "static_mesh_1");
    assert_eq!(sets.models[1].layout_name(), "static_mesh");
    assert_eq!(sets.bloom[2].name(), "bloom_2");
}

#[test]
fn test_exhaustion_detected_before_device_call() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let mut binder = DescriptorBinder::new(&mut device, DescriptorPoolSizes::for_scene(1, MAPS_PER_MODEL, 0)).unwrap();

    let before = binder.remaining();
    let result = binder.allocate_scene_sets(&layouts, 2);

    assert!(matches!(result, Err(Error::DescriptorPoolExhausted(_))));
    // nothing was consumed
    assert_eq!(binder.remaining(), before);
}

#[test]
fn test_exhaustion_per_descriptor_type() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let sizes = DescriptorPoolSizes { max_sets: 4, input_attachments: 4, uniform_buffers: 4, combined_image_samplers: 8, storage_images: 0 };
    let mut binder = DescriptorBinder::new(&mut device, sizes).unwrap();

    let lighting = layouts.get(LayoutId::Lighting).unwrap();
    assert!(binder.allocate(&[("lighting", lighting)]).is_ok());
    let err = binder.allocate(&[("lighting_again", lighting)]).err().expect("pool exhausted");
    assert!(matches!(err, Error::DescriptorPoolExhausted(_)));
    assert_eq!(binder.remaining().get(DescriptorType::InputAttachment), 0);
}

#[test]
fn test_empty_update_rejected() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let mut binder = DescriptorBinder::new(&mut device, DescriptorPoolSizes::for_scene(1, MAPS_PER_MODEL, 1)).unwrap();
    let set = binder.allocate(&[("bloom", layouts.get(LayoutId::Bloom).unwrap())]).unwrap().remove(0);

    assert!(binder.update(&device, &set, 0, &[]).is_err());
}

// ============================================================================
// FALLBACK POLICY
// ============================================================================

#[test]
fn test_missing_ao_binds_albedo() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let mut binder = DescriptorBinder::new(&mut device, DescriptorPoolSizes::for_scene(1, MAPS_PER_MODEL, 1)).unwrap();
    let mut blob = UniformBlob::new(&mut device, 4096).unwrap();
    let trans = blob.allocate("trans_mats", 64, 0).unwrap();
    let per_model = blob.allocate("per_model_0", 128, 0).unwrap();

    let albedo = texture(&mut device, "cerberus_albedo");
    let normal = texture(&mut device, "cerberus_normal");
    let roughness = texture(&mut device, "cerberus_roughness");
    let metalness = texture(&mut device, "cerberus_metalness");
    let maps = MaterialMaps {
        albedo: albedo.as_ref(),
        normal: normal.as_ref(),
        roughness: roughness.as_ref(),
        metalness: metalness.as_ref(),
        ao: None,
    };
    assert!(!maps.has_ao_map());

    let set = binder.allocate(&[("static_mesh_0", layouts.get(LayoutId::StaticMesh).unwrap())]).unwrap().remove(0);
    binder.write_static_mesh_set(&device, &set, &blob, trans, per_model, &maps).unwrap();

    let writes = writes_for(&device, "static_mesh_0");
    assert_eq!(writes.len(), 7);
    assert_eq!(writes[0], (0, vec!["uniform:0+64".to_string()]));
    assert_eq!(writes[1], (1, vec!["uniform:256+128".to_string()]));
    assert_eq!(writes[6], (6, vec!["sampled:cerberus_albedo:LinearRepeat".to_string()]));
    assert_eq!(writes[2].1, writes[6].1);
}

#[test]
fn test_present_ao_is_bound() {
    let mut device = MockGraphicsDevice::new();
    let albedo = texture(&mut device, "albedo");
    let ao = texture(&mut device, "ao");
    let maps = MaterialMaps {
        albedo: albedo.as_ref(),
        normal: albedo.as_ref(),
        roughness: albedo.as_ref(),
        metalness: albedo.as_ref(),
        ao: Some(ao.as_ref()),
    };
    assert!(maps.has_ao_map());
    assert_eq!(maps.ao_or_albedo().info().name, "ao");
}

// ============================================================================
// SCENE WRITES
// ============================================================================

#[test]
fn test_lighting_and_output_sets() {
    let mut device = MockGraphicsDevice::new();
    let layouts = DescriptorLayouts::create(&mut device).unwrap();
    let mut binder = DescriptorBinder::new(&mut device, DescriptorPoolSizes::for_scene(1, MAPS_PER_MODEL, 1)).unwrap();
    let mut blob = UniformBlob::new(&mut device, 4096).unwrap();
    let light_info = blob.allocate("lighting", 80, 0).unwrap();
    let display = blob.allocate("display", 16, 0).unwrap();

    let gb: Vec<Arc<dyn Texture>> = (0..3).map(|i| texture(&mut device, &format!("gbuffer{}", i))).collect();
    let depth = texture(&mut device, "depth");
    let lighting_result = texture(&mut device, "lighting_result");
    let diffuse = texture(&mut device, "diffuse_irradiance");
    let specular = texture(&mut device, "specular_irradiance");
    let lut = texture(&mut device, "brdf_lut");
    let attachments = FrameAttachments {
        gbuffers: [gb[0].as_ref(), gb[1].as_ref(), gb[2].as_ref()],
        depth: depth.as_ref(),
        lighting_result: lighting_result.as_ref(),
    };

    let sets = binder.allocate_scene_sets(&layouts, 1).unwrap();
    binder
        .write_lighting_set(&device, &sets.lighting, &blob, light_info, &attachments,
            diffuse.as_ref(), specular.as_ref(), lut.as_ref())
        .unwrap();
    binder.write_final_output_set(&device, &sets.final_output, &blob, display, &attachments).unwrap();

    let lighting = writes_for(&device, "lighting");
    let bindings: Vec<u32> = lighting.iter().map(|(b, _)| *b).collect();
    assert_eq!(bindings, (0..8).collect::<Vec<u32>>());
    assert_eq!(lighting[4].1, vec!["input:depth".to_string()]);
    assert_eq!(lighting[7].1, vec!["sampled:brdf_lut:LinearClamp".to_string()]);

    let output = writes_for(&device, "final_output");
    assert_eq!(output[0].1, vec!["sampled:lighting_result:LinearClamp".to_string()]);
    assert_eq!(output[1].1, vec!["sampled:gbuffer0:NearestClamp".to_string()]);
    assert_eq!(output[5], (5, vec!["uniform:256+16".to_string()]));
}
