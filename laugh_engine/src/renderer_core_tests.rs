//! Unit tests for the deferred renderer lifecycle

use std::path::PathBuf;
use crate::config::{ModelConfig, RendererConfig};
use crate::graphics_device::mock_graphics_device::{as_mock_pipeline, MockGraphicsDevice, MockSwapchain};
use crate::graphics_device::{AcquireOutcome, PresentOutcome, ViewportState};
use crate::mock_asset_loader::MockAssetLoader;
use crate::uniforms::DisplayMode;
use super::*;

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("laugh_renderer_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn config_in(dir: &TempDir) -> RendererConfig {
    let mut config = RendererConfig::default();
    config.models = vec![ModelConfig::named("Helmet"), ModelConfig::named("Floor")];
    config.brdf_lut_path = dir.0.join("brdf.dds");
    config.environment.probe_dir = dir.0.join("probe");
    config.precompute.diffuse_size = 4;
    config.precompute.specular_size = 8;
    config.precompute.specular_mip_levels = 4;
    config
}

fn renderer(config: RendererConfig) -> DeferredRenderer {
    let mut loader = MockAssetLoader::new();
    loader.models_without_ao.push("Floor".to_string());
    DeferredRenderer::new(config, Box::new(loader)).unwrap()
}

struct Setup {
    device: MockGraphicsDevice,
    swapchain: MockSwapchain,
    renderer: DeferredRenderer,
}

fn initialized(dir: &TempDir) -> Setup {
    let mut device = MockGraphicsDevice::new();
    let mut swapchain = MockSwapchain::new(800, 600, 3, &device.log);
    let mut renderer = renderer(config_in(dir));
    renderer.init_resources(&mut device, &mut swapchain).unwrap();
    Setup { device, swapchain, renderer }
}

fn created(device: &MockGraphicsDevice, prefix: &str) -> Vec<String> {
    device.log.lock().unwrap().created.iter().filter(|c| c.starts_with(prefix)).cloned().collect()
}

// ============================================================================
// INITIALIZATION
// ============================================================================

#[test]
fn test_init_builds_every_resource() {
    let dir = TempDir::new("init");
    let setup = initialized(&dir);
    let scene = setup.renderer.scene.as_ref().unwrap();

    assert_eq!(scene.registry.len(), 10);
    assert_eq!(scene.graph.len(), 5);
    assert_eq!(scene.models.len(), 2);
    assert_eq!(setup.renderer.frame_extent(), Some((800, 600)));
    assert_eq!(created(&setup.device, "command_list:present_"), vec![
        "command_list:present_0", "command_list:present_1", "command_list:present_2",
    ]);
    assert_eq!(created(&setup.device, "framebuffer:final_output_").len(), 3);
    for kind in ArtifactKind::ALL {
        assert_eq!(setup.renderer.artifact_state(kind), Some(ArtifactState::Computed));
    }
}

#[test]
fn test_init_twice_is_an_error() {
    let dir = TempDir::new("init_twice");
    let mut setup = initialized(&dir);
    assert!(setup.renderer.init_resources(&mut setup.device, &mut setup.swapchain).is_err());
}

#[test]
fn test_draw_before_init_is_an_error() {
    let dir = TempDir::new("uninit");
    let mut device = MockGraphicsDevice::new();
    let mut swapchain = MockSwapchain::new(800, 600, 2, &device.log);
    let mut renderer = renderer(config_in(&dir));

    assert!(renderer.draw(&mut device, &mut swapchain).is_err());
    assert!(renderer.update(&FrameCamera::default()).is_err());
    assert!(renderer.artifact_state(ArtifactKind::BrdfLut).is_none());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = RendererConfig::default();
    config.models.clear();
    assert!(DeferredRenderer::new(config, Box::new(MockAssetLoader::new())).is_err());
}

// ============================================================================
// FRAME LOOP
// ============================================================================

#[test]
fn test_draw_submits_the_recorded_lists() {
    let dir = TempDir::new("draw");
    let mut setup = initialized(&dir);
    let before = setup.device.submission_count();

    setup.renderer.update(&FrameCamera::default()).unwrap();
    let status = setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap();
    assert_eq!(status, FrameStatus::Presented);
    assert_eq!(setup.renderer.frames_presented(), 1);

    let log = setup.device.log.lock().unwrap();
    assert_eq!(log.submissions.len(), before + 1);
    let lists: Vec<String> = log.submissions[before].batches.iter().map(|b| b.command_lists[0].clone()).collect();
    assert_eq!(lists, vec!["geometry_lighting", "post_effect", "present_0"]);
}

#[test]
fn test_update_writes_frame_uniforms() {
    let dir = TempDir::new("update");
    let mut setup = initialized(&dir);
    let camera = FrameCamera::look_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 4.0 / 3.0);
    setup.renderer.update(&camera).unwrap();

    let scene = setup.renderer.scene.as_ref().unwrap();
    let region = scene.blob.region(scene.uniforms.trans_mats).unwrap();
    let bytes = scene.blob.buffer().read(region.offset, 64).unwrap();
    let expected = TransMats::new(camera.view, camera.proj);
    assert_eq!(bytes, bytemuck::bytes_of(&expected).to_vec());

    let lighting = scene.blob.region(scene.uniforms.lighting).unwrap();
    let eye = scene.blob.buffer().read(lighting.offset, 12).unwrap();
    assert_eq!(eye, bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0]).to_vec());
}

#[test]
fn test_display_mode_reaches_the_uniform() {
    let dir = TempDir::new("display");
    let mut setup = initialized(&dir);
    assert_eq!(setup.renderer.display_mode(), DisplayMode::Final);

    setup.renderer.set_display_mode(DisplayMode::Depth).unwrap();
    let read_mode = |renderer: &DeferredRenderer| {
        let scene = renderer.scene.as_ref().unwrap();
        let region = scene.blob.region(scene.uniforms.display).unwrap();
        let bytes = scene.blob.buffer().read(region.offset, 4).unwrap();
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    };
    assert_eq!(read_mode(&setup.renderer), DisplayMode::Depth.as_shader_value());

    // wraps back to the lit image
    assert_eq!(setup.renderer.cycle_display_mode().unwrap(), DisplayMode::Final);
    assert_eq!(read_mode(&setup.renderer), 0);
}

#[test]
fn test_model_transform_index_is_checked() {
    let dir = TempDir::new("transform");
    let mut renderer = renderer(config_in(&dir));
    assert!(renderer.set_model_transform(1, ModelTransform::default()).is_ok());
    assert!(renderer.set_model_transform(2, ModelTransform::default()).is_err());
}

#[test]
fn test_model_transform_from_config() {
    let mut model = ModelConfig::named("Helmet");
    model.position = [1.0, 0.0, -2.0];
    model.yaw_degrees = 90.0;
    model.scale = 2.0;
    let transform = model_transform(&model);

    assert_eq!(transform.position, Vec3::new(1.0, 0.0, -2.0));
    assert_eq!(transform.scale, Vec3::splat(2.0));
    let rotated = transform.rotation * Vec3::X;
    assert!((rotated - Vec3::NEG_Z).length() < 1e-5);
}

// ============================================================================
// SWAPCHAIN RECREATION
// ============================================================================

#[test]
fn test_out_of_date_acquire_recreates_without_submitting() {
    let dir = TempDir::new("out_of_date");
    let mut setup = initialized(&dir);
    let submissions = setup.device.submission_count();
    let idle_calls = setup.device.log.lock().unwrap().wait_idle_calls;
    setup.swapchain.acquire_script.push_back(AcquireOutcome::OutOfDate);

    let status = setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap();
    assert_eq!(status, FrameStatus::SkippedOutOfDate);
    assert_eq!(setup.device.submission_count(), submissions);
    assert_eq!(*setup.swapchain.recreate_calls.lock().unwrap(), vec![(800, 600)]);
    assert!(setup.device.log.lock().unwrap().wait_idle_calls > idle_calls);

    // rebuilt lists for the new generation
    assert_eq!(created(&setup.device, "command_list:geometry_lighting").len(), 2);
    assert_eq!(setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap(), FrameStatus::Presented);
}

#[test]
fn test_stale_present_recreates() {
    let dir = TempDir::new("stale");
    let mut setup = initialized(&dir);
    setup.swapchain.present_script.push_back(PresentOutcome::Stale);

    let status = setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap();
    assert_eq!(status, FrameStatus::PresentedStale);
    assert_eq!(setup.swapchain.recreate_calls.lock().unwrap().len(), 1);
}

#[test]
fn test_resize_rebuilds_at_new_extent() {
    let dir = TempDir::new("resize");
    let mut setup = initialized(&dir);

    setup.renderer.resize(1024, 768);
    assert_eq!(setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap(), FrameStatus::Presented);
    assert_eq!(setup.renderer.frame_extent(), Some((1024, 768)));

    let scene = setup.renderer.scene.as_ref().unwrap();
    assert_eq!(scene.registry.len(), 10);
    assert_eq!(scene.graph.len(), 5);
    let blur = as_mock_pipeline(scene.pipeline(PassId::BloomClear, 0, PipelineKind::BloomBlur).unwrap());
    match blur.viewport {
        Some(ViewportState::Baked { scissor, .. }) => assert_eq!((scissor.width, scissor.height), (512, 384)),
        other => panic!("expected a baked viewport, got {:?}", other),
    }

    // old attachments are gone, persistent precompute pass kept
    let log = setup.device.log.lock().unwrap();
    assert!(log.destroyed.contains(&"texture:gbuffer_0".to_string()));
    assert!(!log.destroyed.contains(&"render_pass:env_prefilter".to_string()));
}

#[test]
fn test_minimized_window_skips_frames() {
    let dir = TempDir::new("minimized");
    let mut setup = initialized(&dir);
    let submissions = setup.device.submission_count();

    setup.renderer.resize(0, 0);
    assert_eq!(setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap(), FrameStatus::SkippedOutOfDate);
    assert_eq!(setup.device.submission_count(), submissions);
    assert!(setup.swapchain.recreate_calls.lock().unwrap().is_empty());

    setup.renderer.resize(640, 480);
    assert_eq!(setup.renderer.draw(&mut setup.device, &mut setup.swapchain).unwrap(), FrameStatus::Presented);
    assert_eq!(setup.renderer.frame_extent(), Some((640, 480)));
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_missing_ao_map_binds_albedo() {
    let dir = TempDir::new("ao_fallback");
    let setup = initialized(&dir);

    let log = setup.device.log.lock().unwrap();
    let ao_binding = |set: &str| {
        log.descriptor_writes
            .iter()
            .find(|w| w.set == set && w.binding == 6)
            .map(|w| w.resources.clone())
            .unwrap()
    };
    assert_eq!(ao_binding("static_mesh_0"), vec!["sampled:Helmet_ao:LinearRepeat"]);
    assert_eq!(ao_binding("static_mesh_1"), vec!["sampled:Floor_albedo:LinearRepeat"]);
}

#[test]
fn test_cache_round_trip_across_sessions() {
    let dir = TempDir::new("sessions");

    let mut first = initialized(&dir);
    let report = first.renderer.shutdown(&mut first.device).unwrap();
    assert_eq!(report.written.len(), 3);
    assert!(report.is_clean());
    assert!(!first.renderer.is_initialized());

    let mut device = MockGraphicsDevice::new();
    let mut swapchain = MockSwapchain::new(800, 600, 3, &device.log);
    let mut second = renderer(config_in(&dir));
    second.init_resources(&mut device, &mut swapchain).unwrap();

    assert_eq!(device.submission_count(), 0);
    for kind in ArtifactKind::ALL {
        assert_eq!(second.artifact_state(kind), Some(ArtifactState::LoadedFromCache));
    }
    assert!(second.shutdown(&mut device).unwrap().written.is_empty());
}

#[test]
fn test_shutdown_twice_is_harmless() {
    let dir = TempDir::new("shutdown");
    let mut setup = initialized(&dir);
    setup.renderer.shutdown(&mut setup.device).unwrap();
    let report = setup.renderer.shutdown(&mut setup.device).unwrap();
    assert!(report.written.is_empty() && report.failures.is_empty());
}
