//! Renderer core
//!
//! [`RendererCore`] is the lifecycle a renderer goes through: create its
//! resources once, update per-frame uniforms, draw, shut down.
//! [`DeferredRenderer`] implements it with the standard pass table and the
//! deferred pipeline manifest.

use std::sync::Arc;
use glam::{Mat4, Quat, Vec3};

use crate::asset::{AssetLoader, GpuEnvironment, GpuModel};
use crate::command_recorder::{
    record_geometry_lighting, record_post_effect, record_present, BloomWork,
    GeometryLightingWork, PresentWork,
};
use crate::config::{ModelConfig, RendererConfig};
use crate::descriptor_binder::{
    DescriptorBinder, DescriptorLayouts, FrameAttachments, SceneSets, MAPS_PER_MODEL,
};
use crate::error::{Error, Result};
use crate::frame_scheduler::{FrameLists, FrameScheduler, FrameStatus};
use crate::graphics_device::{
    CommandList, DescriptorPoolSizes, Framebuffer, FramebufferDesc, GraphicsDevice, Pipeline,
    RenderPass, RenderTarget, RenderTargetDesc, Swapchain, TargetLayers, Texture, TextureDesc, TextureFormat,
    TextureUsage,
};
use crate::pass_graph::{
    select_depth_format, PassGraphBuilder, PassHandle, PassId, PassMap, PassScope,
    GBUFFER_FORMATS, LIGHTING_RESULT_FORMAT, POST_EFFECT_FORMAT,
};
use crate::pipeline_registry::{
    build_from_manifest, deferred_manifest, ManifestContext, PipelineKey, PipelineKind,
    PipelineRegistry, ShaderLibrary,
};
use crate::precompute::{
    ArtifactCache, ArtifactKind, ArtifactState, PersistReport, PrecomputeContext,
    PrecomputeOrchestrator,
};
use crate::uniform_blob::{BlobHandle, UniformBlob};
use crate::uniforms::{
    CubeMapCamera, DisplayInfo, DisplayMode, LightingInfo, ModelTransform, PerModel, TransMats,
};
use crate::{engine_debug, engine_info};

/// Main camera for one frame
///
/// The camera model itself lives outside the renderer; this is what the
/// renderer needs from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    pub view: Mat4,
    pub proj: Mat4,
    pub eye: Vec3,
}

impl FrameCamera {
    /// 45 degree perspective looking at `target`, Y flipped for Vulkan clip space
    pub fn look_at(eye: Vec3, target: Vec3, aspect: f32) -> Self {
        let mut proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
        proj.y_axis.y *= -1.0;
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            proj,
            eye,
        }
    }
}

impl Default for FrameCamera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 16.0 / 9.0)
    }
}

/// Renderer lifecycle
pub trait RendererCore {
    /// Create every GPU resource, run the precompute jobs, record the
    /// steady-state command lists
    fn init_resources(&mut self, device: &mut dyn GraphicsDevice, swapchain: &mut dyn Swapchain) -> Result<()>;

    /// Write this frame's uniforms
    fn update(&mut self, camera: &FrameCamera) -> Result<()>;

    /// Render and present one frame, rebuilding swapchain resources when needed
    fn draw(&mut self, device: &mut dyn GraphicsDevice, swapchain: &mut dyn Swapchain) -> Result<FrameStatus>;

    /// Wait for the device, persist computed artifacts, release everything
    fn shutdown(&mut self, device: &mut dyn GraphicsDevice) -> Result<PersistReport>;
}

/// World transform described by a model entry of the config
pub fn model_transform(model: &ModelConfig) -> ModelTransform {
    ModelTransform {
        position: Vec3::from(model.position),
        rotation: Quat::from_rotation_y(model.yaw_degrees.to_radians()),
        scale: Vec3::splat(model.scale),
    }
}

struct UniformHandles {
    cube_camera: BlobHandle,
    trans_mats: BlobHandle,
    lighting: BlobHandle,
    display: BlobHandle,
    per_model: Vec<BlobHandle>,
}

/// Lists recorded against one swapchain generation
struct FrameCommands {
    extent: (u32, u32),
    geometry_lighting: Box<dyn CommandList>,
    post_effect: Box<dyn CommandList>,
    present: Vec<Box<dyn CommandList>>,
}

/// Everything created by `init_resources`
///
/// Fields drop top to bottom: command lists before the objects they reference.
struct SceneResources {
    commands: Option<FrameCommands>,
    scheduler: FrameScheduler,
    registry: PipelineRegistry,
    shaders: ShaderLibrary,
    sets: SceneSets,
    binder: DescriptorBinder,
    layouts: DescriptorLayouts,
    precompute: PrecomputeOrchestrator,
    blob: UniformBlob,
    uniforms: UniformHandles,
    models: Vec<GpuModel>,
    environment: GpuEnvironment,
    graph: PassGraphBuilder,
    passes: PassMap,
    depth_format: TextureFormat,
}

fn not_initialized() -> Error {
    Error::InvalidResource("renderer resources are not initialized".to_string())
}

fn color_view(device: &mut dyn GraphicsDevice, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>> {
    device.create_render_target(&RenderTargetDesc {
        texture: Arc::clone(texture),
        mip_level: 0,
        layers: TargetLayers::Single(0),
    })
}

fn framebuffer(
    device: &mut dyn GraphicsDevice,
    name: &str,
    render_pass: &Arc<dyn RenderPass>,
    textures: &[&Arc<dyn Texture>],
    (width, height): (u32, u32),
) -> Result<Arc<dyn Framebuffer>> {
    let attachments = textures
        .iter()
        .map(|texture| color_view(device, texture))
        .collect::<Result<Vec<_>>>()?;
    device.create_framebuffer(&FramebufferDesc {
        name: name.to_string(),
        render_pass,
        attachments,
        width,
        height,
        layers: 1,
    })
}

impl SceneResources {
    fn pass(&self, id: PassId) -> Result<PassHandle> {
        self.passes
            .get(&id)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("pass {:?} not declared", id)))
    }

    fn render_pass(&self, id: PassId) -> Result<&Arc<dyn RenderPass>> {
        self.graph.render_pass(self.pass(id)?)
    }

    fn pipeline(&self, pass: PassId, subpass: u32, kind: PipelineKind) -> Result<&Arc<dyn Pipeline>> {
        self.registry.get(PipelineKey::new(pass, subpass, kind))
    }

    fn build_pipelines(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        extent: (u32, u32),
        light_count: u32,
    ) -> Result<usize> {
        let ctx = ManifestContext {
            graph: &self.graph,
            passes: &self.passes,
            layouts: &self.layouts,
            loader,
            extent,
            light_count,
        };
        build_from_manifest(&mut self.registry, device, &mut self.shaders, &deferred_manifest(), &ctx)
    }

    /// Attachments, framebuffers, set writes and command lists of the
    /// swapchain-sized passes
    fn build_swapchain_targets(
        &mut self,
        device: &mut dyn GraphicsDevice,
        swapchain: &dyn Swapchain,
        loader: &dyn AssetLoader,
        config: &RendererConfig,
    ) -> Result<()> {
        let extent = (swapchain.width(), swapchain.height());
        let (width, height) = extent;
        let half = ((width / 2).max(1), (height / 2).max(1));

        let created = self.build_pipelines(device, loader, extent, config.lights.len() as u32)?;
        engine_debug!("laugh::DeferredRenderer", "Built {} pipeline(s) for {}x{}", created, width, height);

        // geometry + lighting
        let attachment_usage = TextureUsage::COLOR_ATTACHMENT | TextureUsage::INPUT_ATTACHMENT | TextureUsage::SAMPLED;
        let depth = device.create_texture(TextureDesc::attachment(
            "depth", width, height, self.depth_format,
            TextureUsage::DEPTH_STENCIL_ATTACHMENT | TextureUsage::INPUT_ATTACHMENT | TextureUsage::SAMPLED,
        ))?;
        let gbuffers = GBUFFER_FORMATS
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                device.create_texture(TextureDesc::attachment(&format!("gbuffer_{}", i), width, height, format, attachment_usage))
            })
            .collect::<Result<Vec<_>>>()?;
        let lighting_result = device.create_texture(TextureDesc::attachment(
            "lighting_result", width, height, LIGHTING_RESULT_FORMAT,
            TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
        ))?;

        let geometry_pass = self.pass(PassId::GeometryLighting)?;
        let geometry_fb = framebuffer(
            device, "geometry_lighting", self.graph.render_pass(geometry_pass)?,
            &[&depth, &gbuffers[0], &gbuffers[1], &gbuffers[2], &lighting_result], extent,
        )?;

        // bloom
        let post_effects = (0..2)
            .map(|i| {
                device.create_texture(TextureDesc::attachment(&format!("post_effect_{}", i), half.0, half.1,
                    POST_EFFECT_FORMAT, TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED))
            })
            .collect::<Result<Vec<_>>>()?;
        let clear_pass = self.pass(PassId::BloomClear)?;
        let post_effect_fbs = post_effects
            .iter()
            .enumerate()
            .map(|(i, texture)| {
                framebuffer(device, &format!("post_effect_{}", i), self.graph.render_pass(clear_pass)?, &[texture], half)
            })
            .collect::<Result<Vec<_>>>()?;
        let merge_pass = self.pass(PassId::BloomMerge)?;
        let merge_fb = framebuffer(device, "lighting_merge", self.graph.render_pass(merge_pass)?, &[&lighting_result], extent)?;

        // final output, one per swapchain image
        let output_pass = self.pass(PassId::FinalOutput)?;
        let output_fbs = swapchain
            .images()
            .iter()
            .enumerate()
            .map(|(i, image)| {
                framebuffer(device, &format!("final_output_{}", i), self.graph.render_pass(output_pass)?, &[image], extent)
            })
            .collect::<Result<Vec<_>>>()?;

        // sets reading the new attachments
        let attachments = FrameAttachments {
            gbuffers: [gbuffers[0].as_ref(), gbuffers[1].as_ref(), gbuffers[2].as_ref()],
            depth: depth.as_ref(),
            lighting_result: lighting_result.as_ref(),
        };
        self.binder.write_lighting_set(
            device, &self.sets.lighting, &self.blob, self.uniforms.lighting, &attachments,
            self.precompute.texture(ArtifactKind::DiffuseIrradiance).as_ref(),
            self.precompute.texture(ArtifactKind::SpecularIrradiance).as_ref(),
            self.precompute.texture(ArtifactKind::BrdfLut).as_ref(),
        )?;
        self.binder.write_final_output_set(device, &self.sets.final_output, &self.blob, self.uniforms.display, &attachments)?;
        let bloom_sources = [&lighting_result, &post_effects[0], &post_effects[1]];
        for (set, source) in self.sets.bloom.iter().zip(bloom_sources) {
            self.binder.write_bloom_set(device, set, source.as_ref())?;
        }

        let mut geometry_images = vec![depth];
        geometry_images.extend(gbuffers);
        geometry_images.push(lighting_result);
        self.graph.attach_images(geometry_pass, geometry_images)?;
        self.graph.attach_framebuffers(geometry_pass, vec![geometry_fb])?;
        self.graph.attach_images(clear_pass, post_effects)?;
        self.graph.attach_framebuffers(clear_pass, post_effect_fbs)?;
        self.graph.attach_framebuffers(merge_pass, vec![merge_fb])?;
        self.graph.attach_framebuffers(output_pass, output_fbs)?;

        self.commands = Some(self.record_frame_commands(device, extent)?);
        engine_info!("laugh::DeferredRenderer", "Swapchain resources ready ({}x{}, {} image(s))",
            width, height, swapchain.image_count());
        Ok(())
    }

    fn record_frame_commands(&self, device: &mut dyn GraphicsDevice, extent: (u32, u32)) -> Result<FrameCommands> {
        let geometry_pass = self.pass(PassId::GeometryLighting)?;
        let geometry_lighting = record_geometry_lighting(device, &GeometryLightingWork {
            render_pass: self.graph.render_pass(geometry_pass)?,
            framebuffer: self.graph.framebuffer(geometry_pass, 0)?,
            extent,
            skybox_pipeline: self.pipeline(PassId::GeometryLighting, 0, PipelineKind::Skybox)?,
            skybox_set: &self.sets.skybox,
            environment: &self.environment,
            mesh_pipeline: self.pipeline(PassId::GeometryLighting, 0, PipelineKind::StaticMesh)?,
            models: &self.models,
            model_sets: &self.sets.models,
            lighting_pipeline: self.pipeline(PassId::GeometryLighting, 1, PipelineKind::Lighting)?,
            lighting_set: &self.sets.lighting,
            specular_mip_levels: self.precompute.texture(ArtifactKind::SpecularIrradiance).info().mip_levels,
        })?;

        let clear_pass = self.pass(PassId::BloomClear)?;
        let post_effect = record_post_effect(device, &BloomWork {
            clear_pass: self.graph.render_pass(clear_pass)?,
            merge_pass: self.render_pass(PassId::BloomMerge)?,
            post_effect_framebuffers: [self.graph.framebuffer(clear_pass, 0)?, self.graph.framebuffer(clear_pass, 1)?],
            lighting_framebuffer: self.graph.framebuffer(self.pass(PassId::BloomMerge)?, 0)?,
            brightness_pipeline: self.pipeline(PassId::BloomClear, 0, PipelineKind::BloomBrightness)?,
            blur_pipeline: self.pipeline(PassId::BloomClear, 0, PipelineKind::BloomBlur)?,
            merge_pipeline: self.pipeline(PassId::BloomMerge, 0, PipelineKind::BloomMerge)?,
            sets: &self.sets.bloom,
            extent,
        })?;

        let output_pass = self.pass(PassId::FinalOutput)?;
        let present = record_present(device, &PresentWork {
            render_pass: self.graph.render_pass(output_pass)?,
            framebuffers: self.graph.pass(output_pass)?.framebuffers(),
            pipeline: self.pipeline(PassId::FinalOutput, 0, PipelineKind::FinalOutput)?,
            set: &self.sets.final_output,
            extent,
        })?;

        Ok(FrameCommands { extent, geometry_lighting, post_effect, present })
    }

    /// Drop every swapchain-scoped object; the device must be idle
    fn release_swapchain_targets(&mut self) {
        self.commands = None;
        self.graph.teardown_scope(PassScope::Swapchain);
        self.passes.retain(|id, _| id.scope() != PassScope::Swapchain);
        self.registry.invalidate_baked();
    }

    fn declare_swapchain_passes(&mut self, device: &mut dyn GraphicsDevice, swapchain_format: TextureFormat) -> Result<()> {
        let ids: Vec<PassId> = PassId::RENDER_PASSES
            .into_iter()
            .filter(|id| id.scope() == PassScope::Swapchain)
            .collect();
        let declared = self.graph.declare_standard(device, &ids, self.depth_format, swapchain_format)?;
        self.passes.extend(declared);
        Ok(())
    }

    fn write_frame_uniforms(
        &self,
        camera: &FrameCamera,
        config: &RendererConfig,
        display_mode: DisplayMode,
        transforms: &[ModelTransform],
    ) -> Result<()> {
        self.blob.write(self.uniforms.trans_mats, &TransMats::new(camera.view, camera.proj))?;
        self.blob.write_bytes(self.uniforms.lighting, &LightingInfo::encode(camera.eye, &config.lights))?;
        self.blob.write(self.uniforms.display, &DisplayInfo::new(display_mode))?;
        for (handle, transform) in self.uniforms.per_model.iter().zip(transforms) {
            self.blob.write(*handle, &PerModel::from_transform(transform))?;
        }
        Ok(())
    }
}

/// Deferred PBR renderer with image-based lighting and bloom
pub struct DeferredRenderer {
    config: RendererConfig,
    loader: Box<dyn AssetLoader>,
    display_mode: DisplayMode,
    transforms: Vec<ModelTransform>,
    camera: FrameCamera,
    pending_resize: Option<(u32, u32)>,
    scene: Option<SceneResources>,
}

impl DeferredRenderer {
    pub fn new(config: RendererConfig, loader: Box<dyn AssetLoader>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            display_mode: config.display_mode,
            transforms: config.models.iter().map(model_transform).collect(),
            camera: FrameCamera::default(),
            pending_resize: None,
            scene: None,
            loader,
            config,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.scene.is_some()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Select the debug view; takes effect on the next frame
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<()> {
        self.display_mode = mode;
        if let Some(scene) = &self.scene {
            scene.blob.write(scene.uniforms.display, &DisplayInfo::new(mode))?;
        }
        engine_info!("laugh::DeferredRenderer", "Display mode: {:?}", mode);
        Ok(())
    }

    /// Advance to the next debug view, wrapping around
    pub fn cycle_display_mode(&mut self) -> Result<DisplayMode> {
        let next = self.display_mode.next();
        self.set_display_mode(next)?;
        Ok(next)
    }

    pub fn set_model_transform(&mut self, index: usize, transform: ModelTransform) -> Result<()> {
        let count = self.transforms.len();
        let slot = self.transforms.get_mut(index).ok_or_else(|| {
            Error::InvalidResource(format!("model {} out of range ({} models)", index, count))
        })?;
        *slot = transform;
        Ok(())
    }

    /// Request a swapchain rebuild at the next `draw`
    pub fn resize(&mut self, width: u32, height: u32) {
        engine_debug!("laugh::DeferredRenderer", "Resize requested: {}x{}", width, height);
        self.pending_resize = Some((width, height));
    }

    /// Where a precompute artifact came from, once initialized
    pub fn artifact_state(&self, kind: ArtifactKind) -> Option<ArtifactState> {
        self.scene.as_ref().map(|scene| scene.precompute.state(kind))
    }

    pub fn frames_presented(&self) -> u64 {
        self.scene.as_ref().map(|scene| scene.scheduler.frames_presented()).unwrap_or(0)
    }

    /// Extent the current command lists were recorded for
    pub fn frame_extent(&self) -> Option<(u32, u32)> {
        self.scene.as_ref().and_then(|scene| scene.commands.as_ref()).map(|commands| commands.extent)
    }

    /// Rebuild every swapchain-dependent resource
    ///
    /// Uses the pending resize if any, otherwise the swapchain's current size.
    pub fn recreate(&mut self, device: &mut dyn GraphicsDevice, swapchain: &mut dyn Swapchain) -> Result<()> {
        let (width, height) = self.pending_resize.take().unwrap_or((swapchain.width(), swapchain.height()));
        let scene = self.scene.as_mut().ok_or_else(not_initialized)?;

        device.wait_idle()?;
        scene.release_swapchain_targets();
        swapchain.recreate(width, height)?;
        scene.declare_swapchain_passes(device, swapchain.format())?;
        scene.build_swapchain_targets(device, swapchain, self.loader.as_ref(), &self.config)?;
        engine_info!("laugh::DeferredRenderer", "Recreated swapchain resources at {}x{}", width, height);
        Ok(())
    }

    fn load_scene(&self, device: &mut dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<SceneResources> {
        let config = &self.config;
        let depth_format = select_depth_format(device)?;
        let mut graph = PassGraphBuilder::new();
        let passes = graph.declare_standard(device, &PassId::RENDER_PASSES, depth_format, swapchain.format())?;
        let layouts = DescriptorLayouts::create(device)?;

        let environment = GpuEnvironment::upload(device, self.loader.load_environment(&config.environment)?)?;
        let models = config
            .models
            .iter()
            .map(|model| GpuModel::upload(device, self.loader.load_model(&model.name)?))
            .collect::<Result<Vec<_>>>()?;

        let mut blob = UniformBlob::new(device, config.uniform_blob_size)?;
        let uniforms = UniformHandles {
            cube_camera: blob.allocate_for::<CubeMapCamera>("cube_camera")?,
            trans_mats: blob.allocate_for::<TransMats>("trans_mats")?,
            lighting: blob.allocate("lighting", LightingInfo::byte_size(config.lights.len()), 16)?,
            display: blob.allocate_for::<DisplayInfo>("display_info")?,
            per_model: (0..models.len())
                .map(|i| blob.allocate_for::<PerModel>(&format!("per_model_{}", i)))
                .collect::<Result<Vec<_>>>()?,
        };
        blob.write(uniforms.cube_camera, &CubeMapCamera::new())?;

        let mut binder = DescriptorBinder::new(
            device,
            DescriptorPoolSizes::for_scene(models.len() as u32, MAPS_PER_MODEL, 0),
        )?;
        let sets = binder.allocate_scene_sets(&layouts, models.len())?;
        let precompute = PrecomputeOrchestrator::prepare(device, ArtifactCache::from_config(config))?;

        // sets that never change after load
        binder.write_brdf_lut_set(device, &sets.brdf_lut, precompute.texture(ArtifactKind::BrdfLut).as_ref())?;
        binder.write_env_prefilter_set(device, &sets.env_prefilter, &blob, uniforms.cube_camera, environment.radiance.as_ref())?;
        binder.write_skybox_set(device, &sets.skybox, &blob, uniforms.trans_mats, environment.radiance.as_ref())?;
        for ((model, set), per_model) in models.iter().zip(&sets.models).zip(&uniforms.per_model) {
            binder.write_static_mesh_set(device, set, &blob, uniforms.trans_mats, *per_model, &model.material_maps())?;
        }

        Ok(SceneResources {
            commands: None,
            scheduler: FrameScheduler::new(device)?,
            registry: PipelineRegistry::new(device.limits().max_push_constants_size),
            shaders: ShaderLibrary::new(),
            sets,
            binder,
            layouts,
            precompute,
            blob,
            uniforms,
            models,
            environment,
            graph,
            passes,
            depth_format,
        })
    }
}

impl RendererCore for DeferredRenderer {
    fn init_resources(&mut self, device: &mut dyn GraphicsDevice, swapchain: &mut dyn Swapchain) -> Result<()> {
        if self.scene.is_some() {
            return Err(Error::InitializationFailed("renderer resources already initialized".to_string()));
        }

        let mut scene = self.load_scene(device, swapchain)?;
        let extent = (swapchain.width(), swapchain.height());
        scene.build_pipelines(device, self.loader.as_ref(), extent, self.config.lights.len() as u32)?;
        scene.write_frame_uniforms(&self.camera, &self.config, self.display_mode, &self.transforms)?;

        let computed = scene.precompute.run(device, &PrecomputeContext {
            graph: &scene.graph,
            passes: &scene.passes,
            registry: &scene.registry,
            sets: &scene.sets,
            environment: &scene.environment,
            sync: scene.scheduler.sync(),
        })?;
        engine_debug!("laugh::DeferredRenderer", "Precompute produced {} artifact(s)", computed);

        scene.build_swapchain_targets(device, swapchain, self.loader.as_ref(), &self.config)?;
        engine_info!("laugh::DeferredRenderer", "Initialized: {} model(s), {} pipeline(s), {} pass(es)",
            scene.models.len(), scene.registry.len(), scene.graph.len());
        self.scene = Some(scene);
        Ok(())
    }

    fn update(&mut self, camera: &FrameCamera) -> Result<()> {
        self.camera = *camera;
        let scene = self.scene.as_ref().ok_or_else(not_initialized)?;
        scene.write_frame_uniforms(camera, &self.config, self.display_mode, &self.transforms)
    }

    fn draw(&mut self, device: &mut dyn GraphicsDevice, swapchain: &mut dyn Swapchain) -> Result<FrameStatus> {
        if let Some((width, height)) = self.pending_resize {
            if width == 0 || height == 0 {
                // minimized; wait for a real size
                return Ok(FrameStatus::SkippedOutOfDate);
            }
            self.recreate(device, swapchain)?;
        }

        let scene = self.scene.as_mut().ok_or_else(not_initialized)?;
        let commands = scene.commands.as_ref().ok_or_else(not_initialized)?;
        let lists = FrameLists {
            geometry_lighting: commands.geometry_lighting.as_ref(),
            post_effect: commands.post_effect.as_ref(),
            present: &commands.present,
        };
        let status = scene.scheduler.draw_frame(&*device, swapchain, &lists)?;

        if status.needs_recreation() {
            self.recreate(device, swapchain)?;
        }
        Ok(status)
    }

    fn shutdown(&mut self, device: &mut dyn GraphicsDevice) -> Result<PersistReport> {
        let Some(mut scene) = self.scene.take() else {
            return Ok(PersistReport::default());
        };

        device.wait_idle()?;
        let report = scene.precompute.persist(device);
        scene.commands = None;
        scene.graph.teardown();
        drop(scene);

        engine_info!("laugh::DeferredRenderer", "Shut down ({} artifact(s) saved, {} failure(s))",
            report.written.len(), report.failures.len());
        Ok(report)
    }
}

#[cfg(test)]
#[path = "renderer_core_tests.rs"]
mod tests;
