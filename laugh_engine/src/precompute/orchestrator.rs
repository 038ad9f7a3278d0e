/// Precompute orchestrator
///
/// Loads the BRDF LUT and the two irradiance maps from the cache, computes
/// whatever is missing on the GPU at startup, and writes computed results
/// back to the cache at shutdown.

use std::sync::Arc;
use std::time::Instant;

use crate::asset::GpuEnvironment;
use crate::command_recorder::{
    read_back_texture, record_brdf_lut, record_env_prefilter, record_with, EnvPrefilterWork,
    PrefilterTarget,
};
use crate::descriptor_binder::SceneSets;
use crate::error::{Error, Result};
use crate::frame_scheduler::FrameSyncSet;
use crate::graphics_device::{
    AccessFlags, CommandListUsage, Fence, Framebuffer, FramebufferDesc, GraphicsDevice,
    ImageBarrier, ImageLayout, PipelineStages, QueueKind, RenderTargetDesc, SubmitBatch,
    TargetLayers, Texture, TextureDesc,
};
use crate::pass_graph::{PassGraphBuilder, PassId, PassMap};
use crate::pipeline_registry::{PipelineKey, PipelineKind, PipelineRegistry};
use crate::{engine_debug, engine_error, engine_info};
use super::artifact_cache::{ArtifactCache, ArtifactKind};

/// Where an artifact's contents came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    LoadedFromCache,
    /// Empty target waiting for `run`
    NeedsCompute,
    /// Filled by `run`, to be persisted
    Computed,
}

struct Artifact {
    texture: Arc<dyn Texture>,
    state: ArtifactState,
}

/// Resources the precompute jobs render with
pub struct PrecomputeContext<'a> {
    pub graph: &'a PassGraphBuilder,
    pub passes: &'a PassMap,
    pub registry: &'a PipelineRegistry,
    /// `brdf_lut` and `env_prefilter` must already be written
    pub sets: &'a SceneSets,
    pub environment: &'a GpuEnvironment,
    pub sync: &'a FrameSyncSet,
}

/// Outcome of writing computed artifacts back to the cache
#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<ArtifactKind>,
    pub failures: Vec<(ArtifactKind, Error)>,
}

impl PersistReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PrecomputeOrchestrator {
    cache: ArtifactCache,
    brdf_lut: Artifact,
    diffuse: Artifact,
    specular: Artifact,
}

fn prepare_artifact(device: &mut dyn GraphicsDevice, cache: &ArtifactCache, kind: ArtifactKind) -> Result<Artifact> {
    let expected = cache.expected(kind);
    match cache.load(kind) {
        Some(image) => {
            engine_info!("laugh::precompute", "Loaded {} from {}", kind.name(), cache.path(kind).display());
            Ok(Artifact {
                texture: device.create_texture(image.into_texture_desc(kind.name(), kind.usage()))?,
                state: ArtifactState::LoadedFromCache,
            })
        }
        None => {
            engine_info!("laugh::precompute", "{} will be computed ({}x{}, {} mip(s))",
                kind.name(), expected.width, expected.height, expected.mip_levels);
            Ok(Artifact {
                texture: device.create_texture(TextureDesc {
                    name: kind.name().to_string(),
                    width: expected.width,
                    height: expected.height,
                    format: expected.format,
                    usage: expected.usage,
                    kind: expected.kind,
                    mip_levels: expected.mip_levels,
                    data: None,
                })?,
                state: ArtifactState::NeedsCompute,
            })
        }
    }
}

/// One layered framebuffer per mip of a cube target
fn cube_mip_framebuffers(
    device: &mut dyn GraphicsDevice,
    graph: &PassGraphBuilder,
    passes: &PassMap,
    texture: &Arc<dyn Texture>,
) -> Result<Vec<Arc<dyn Framebuffer>>> {
    let handle = passes
        .get(&PassId::EnvPrefilter)
        .copied()
        .ok_or_else(|| Error::InvalidResource("env_prefilter pass not declared".to_string()))?;
    let render_pass = graph.render_pass(handle)?;

    let info = texture.info();
    (0..info.mip_levels)
        .map(|mip| {
            let size = (info.width >> mip).max(1);
            let target = device.create_render_target(&RenderTargetDesc {
                texture: Arc::clone(texture),
                mip_level: mip,
                layers: TargetLayers::All,
            })?;
            device.create_framebuffer(&FramebufferDesc {
                name: format!("{}_mip{}", info.name, mip),
                render_pass,
                attachments: vec![target],
                width: size,
                height: size,
                layers: 6,
            })
        })
        .collect()
}

fn wait_fence(fence: &dyn Fence) -> Result<()> {
    if !fence.wait(u64::MAX)? {
        return Err(Error::BackendError(format!("timed out waiting for fence '{}'", fence.name())));
    }
    fence.reset()
}

impl PrecomputeOrchestrator {
    /// Create the three artifact textures, from the cache when possible
    ///
    /// Cached artifacts are uploaded and sampled as-is; the others are empty
    /// targets for [`run`](Self::run).
    pub fn prepare(device: &mut dyn GraphicsDevice, cache: ArtifactCache) -> Result<Self> {
        let brdf_lut = prepare_artifact(device, &cache, ArtifactKind::BrdfLut)?;
        let diffuse = prepare_artifact(device, &cache, ArtifactKind::DiffuseIrradiance)?;
        let specular = prepare_artifact(device, &cache, ArtifactKind::SpecularIrradiance)?;
        Ok(Self { cache, brdf_lut, diffuse, specular })
    }

    fn artifact(&self, kind: ArtifactKind) -> &Artifact {
        match kind {
            ArtifactKind::BrdfLut => &self.brdf_lut,
            ArtifactKind::DiffuseIrradiance => &self.diffuse,
            ArtifactKind::SpecularIrradiance => &self.specular,
        }
    }

    fn artifact_mut(&mut self, kind: ArtifactKind) -> &mut Artifact {
        match kind {
            ArtifactKind::BrdfLut => &mut self.brdf_lut,
            ArtifactKind::DiffuseIrradiance => &mut self.diffuse,
            ArtifactKind::SpecularIrradiance => &mut self.specular,
        }
    }

    pub fn state(&self, kind: ArtifactKind) -> ArtifactState {
        self.artifact(kind).state
    }

    pub fn texture(&self, kind: ArtifactKind) -> &Arc<dyn Texture> {
        &self.artifact(kind).texture
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn needs(&self, kind: ArtifactKind) -> bool {
        self.state(kind) == ArtifactState::NeedsCompute
    }

    pub fn needs_compute(&self) -> bool {
        ArtifactKind::ALL.iter().any(|&kind| self.needs(kind))
    }

    /// Compute every missing artifact and leave all three sampleable
    ///
    /// Blocks until the GPU is done. Returns the number of artifacts computed;
    /// with a full cache nothing is submitted.
    pub fn run(&mut self, device: &mut dyn GraphicsDevice, ctx: &PrecomputeContext<'_>) -> Result<usize> {
        if !self.needs_compute() {
            engine_debug!("laugh::precompute", "All artifacts cached, nothing to compute");
            return Ok(0);
        }
        let started = Instant::now();

        let brdf_list = if self.needs(ArtifactKind::BrdfLut) {
            let pipeline = ctx.registry.get(PipelineKey::new(PassId::BrdfLut, 0, PipelineKind::BrdfLut))?;
            let cmd = record_brdf_lut(device, pipeline, &ctx.sets.brdf_lut, &self.brdf_lut.texture)?;
            device.submit(QueueKind::Compute, &[SubmitBatch::commands(vec![cmd.as_ref()])], Some(ctx.sync.brdf_lut.as_ref()))?;
            Some(cmd)
        } else {
            None
        };

        let need_diffuse = self.needs(ArtifactKind::DiffuseIrradiance);
        let need_specular = self.needs(ArtifactKind::SpecularIrradiance);
        let prefilter_list = if need_diffuse || need_specular {
            let render_pass = ctx
                .passes
                .get(&PassId::EnvPrefilter)
                .copied()
                .ok_or_else(|| Error::InvalidResource("env_prefilter pass not declared".to_string()))
                .and_then(|handle| ctx.graph.render_pass(handle))?;

            let diffuse_framebuffers = if need_diffuse {
                cube_mip_framebuffers(device, ctx.graph, ctx.passes, &self.diffuse.texture)?
            } else {
                Vec::new()
            };
            let specular_framebuffers = if need_specular {
                cube_mip_framebuffers(device, ctx.graph, ctx.passes, &self.specular.texture)?
            } else {
                Vec::new()
            };

            let diffuse_pipeline = ctx.registry.get(PipelineKey::new(PassId::EnvPrefilter, 0, PipelineKind::DiffusePrefilter))?;
            let specular_pipeline = ctx.registry.get(PipelineKey::new(PassId::EnvPrefilter, 0, PipelineKind::SpecularPrefilter))?;
            let work = EnvPrefilterWork {
                render_pass,
                set: &ctx.sets.env_prefilter,
                skybox: &ctx.environment.mesh,
                diffuse: need_diffuse.then(|| PrefilterTarget {
                    pipeline: diffuse_pipeline,
                    framebuffers: &diffuse_framebuffers,
                    face_size: self.diffuse.texture.info().width,
                }),
                specular: need_specular.then(|| PrefilterTarget {
                    pipeline: specular_pipeline,
                    framebuffers: &specular_framebuffers,
                    face_size: self.specular.texture.info().width,
                }),
            };
            let cmd = record_env_prefilter(device, &work)?;
            device.submit(QueueKind::Graphics, &[SubmitBatch::commands(vec![cmd.as_ref()])], Some(ctx.sync.env_prefilter.as_ref()))?;
            // framebuffers are dropped below, after the fence wait
            Some((cmd, diffuse_framebuffers, specular_framebuffers))
        } else {
            None
        };

        if brdf_list.is_some() {
            wait_fence(ctx.sync.brdf_lut.as_ref())?;
        }
        if prefilter_list.is_some() {
            wait_fence(ctx.sync.env_prefilter.as_ref())?;
        }
        drop(brdf_list);
        drop(prefilter_list);

        let computed: Vec<ArtifactKind> = ArtifactKind::ALL.into_iter().filter(|&kind| self.needs(kind)).collect();
        self.transition_to_sampled(device, ctx, &computed)?;

        for &kind in &computed {
            self.artifact_mut(kind).state = ArtifactState::Computed;
        }
        engine_info!("laugh::precompute", "Computed {} artifact(s) in {} ms",
            computed.len(), started.elapsed().as_millis());
        Ok(computed.len())
    }

    /// Move freshly computed artifacts to `ShaderReadOnly`
    fn transition_to_sampled(
        &self,
        device: &mut dyn GraphicsDevice,
        ctx: &PrecomputeContext<'_>,
        computed: &[ArtifactKind],
    ) -> Result<()> {
        let barriers: Vec<ImageBarrier> = computed
            .iter()
            .map(|&kind| {
                let (old_layout, src_access) = match kind {
                    ArtifactKind::BrdfLut => (ImageLayout::General, AccessFlags::SHADER_WRITE),
                    _ => (ImageLayout::ColorAttachment, AccessFlags::COLOR_ATTACHMENT_WRITE),
                };
                ImageBarrier::whole(self.texture(kind), old_layout, ImageLayout::ShaderReadOnly,
                    src_access, AccessFlags::SHADER_READ)
            })
            .collect();

        let mut cmd = device.create_command_list(QueueKind::Graphics, "precompute_transitions")?;
        record_with(cmd.as_mut(), CommandListUsage::OneTimeSubmit, |cmd| {
            cmd.pipeline_barrier(PipelineStages::ALL_COMMANDS, PipelineStages::FRAGMENT_SHADER, &barriers)
        })?;

        let fence = ctx.sync.env_prefilter.as_ref();
        device.submit(QueueKind::Graphics, &[SubmitBatch::commands(vec![cmd.as_ref()])], Some(fence))?;
        wait_fence(fence)
    }

    /// Write every computed artifact to the cache
    ///
    /// Call after the device is idle. Failures are logged and reported, never
    /// returned.
    pub fn persist(&self, device: &mut dyn GraphicsDevice) -> PersistReport {
        let mut report = PersistReport::default();
        for kind in ArtifactKind::ALL {
            if self.state(kind) != ArtifactState::Computed {
                continue;
            }
            let result = read_back_texture(device, self.texture(kind), ImageLayout::ShaderReadOnly)
                .and_then(|data| self.cache.store(kind, &data));
            match result {
                Ok(path) => {
                    engine_info!("laugh::precompute", "Saved {} to {}", kind.name(), path.display());
                    report.written.push(kind);
                }
                Err(err) => {
                    engine_error!("laugh::precompute", "Failed to save {} to {}: {}",
                        kind.name(), self.cache.path(kind).display(), err);
                    report.failures.push((kind, err));
                }
            }
        }
        report
    }
}
