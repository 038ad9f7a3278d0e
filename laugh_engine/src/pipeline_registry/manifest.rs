/// Pipeline manifest of the deferred renderer
///
/// Each entry is plain data; `build_from_manifest` resolves shaders, layouts
/// and render passes and hands the result to the registry.

use crate::asset::{AssetLoader, Vertex};
use crate::descriptor_binder::{DescriptorLayouts, LayoutId};
use crate::engine_info;
use crate::error::{Error, Result};
use crate::graphics_device::{
    ColorBlendState, CompareOp, ComputePipelineDesc, CullMode, DepthStencilState, FrontFace,
    GraphicsDevice, GraphicsPipelineDesc, PrimitiveTopology, PushConstantRange,
    RasterizationState, ShaderStageFlags, SpecializationConstant, VertexLayout, ViewportState,
};
use crate::pass_graph::{PassGraphBuilder, PassHandle, PassId, PassMap};
use super::{PipelineKey, PipelineKind, PipelineRegistry, ShaderLibrary};

/// Shader modules of an entry, by file name relative to the shader directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSet {
    Compute { shader: &'static str },
    Graphics {
        vertex: &'static str,
        geometry: Option<&'static str>,
        fragment: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Interleaved [`Vertex`] buffer
    Mesh,
    /// No vertex buffer, the shader emits a full-screen triangle
    FullScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    SwapchainExtent,
    /// Half of the swapchain extent (bloom targets)
    HalfExtent,
    Dynamic,
}

/// Specialization value resolved at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecValue {
    LightCount,
    Constant(u32),
}

#[derive(Debug, Clone)]
pub struct PipelineEntry {
    pub key: PipelineKey,
    pub name: &'static str,
    pub shaders: ShaderSet,
    pub vertex_input: VertexInput,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    pub color_blend: Vec<ColorBlendState>,
    pub layout: LayoutId,
    pub push_constants: Vec<PushConstantRange>,
    pub specialization: Vec<(u32, SpecValue)>,
    pub viewport: ViewportMode,
}

fn fragment_push(size: u32) -> Vec<PushConstantRange> {
    vec![PushConstantRange { stages: ShaderStageFlags::FRAGMENT, offset: 0, size }]
}

fn graphics(
    key: PipelineKey,
    name: &'static str,
    vertex: &'static str,
    fragment: &'static str,
    layout: LayoutId,
) -> PipelineEntry {
    PipelineEntry {
        key,
        name,
        shaders: ShaderSet::Graphics { vertex, geometry: None, fragment },
        vertex_input: VertexInput::FullScreen,
        rasterization: RasterizationState::default(),
        depth_stencil: DepthStencilState::DISABLED,
        color_blend: vec![ColorBlendState::OPAQUE],
        layout,
        push_constants: Vec::new(),
        specialization: Vec::new(),
        viewport: ViewportMode::SwapchainExtent,
    }
}

/// Every pipeline the deferred renderer draws with
pub fn deferred_manifest() -> Vec<PipelineEntry> {
    let no_cull = RasterizationState { cull_mode: CullMode::None, front_face: FrontFace::CounterClockwise };
    let gbuffer_blend = vec![ColorBlendState::OPAQUE; 3];

    let prefilter = |kind, name, fragment, push: Vec<PushConstantRange>| PipelineEntry {
        key: PipelineKey::new(PassId::EnvPrefilter, 0, kind),
        name,
        shaders: ShaderSet::Graphics {
            vertex: "env_prefilter_pass/env_prefilter.vert.spv",
            geometry: Some("env_prefilter_pass/env_prefilter.geom.spv"),
            fragment,
        },
        vertex_input: VertexInput::Mesh,
        rasterization: RasterizationState { cull_mode: CullMode::None, front_face: FrontFace::Clockwise },
        depth_stencil: DepthStencilState::DISABLED,
        color_blend: vec![ColorBlendState::OPAQUE],
        layout: LayoutId::EnvPrefilter,
        push_constants: push,
        specialization: Vec::new(),
        viewport: ViewportMode::Dynamic,
    };

    let mut skybox = graphics(
        PipelineKey::new(PassId::GeometryLighting, 0, PipelineKind::Skybox),
        "skybox",
        "geom_pass/skybox.vert.spv",
        "geom_pass/skybox.frag.spv",
        LayoutId::Skybox,
    );
    skybox.vertex_input = VertexInput::Mesh;
    skybox.rasterization = no_cull;
    skybox.depth_stencil = DepthStencilState::default();
    skybox.color_blend = gbuffer_blend.clone();
    skybox.push_constants = fragment_push(4);

    let mut geometry = graphics(
        PipelineKey::new(PassId::GeometryLighting, 0, PipelineKind::StaticMesh),
        "static_mesh",
        "geom_pass/geom.vert.spv",
        "geom_pass/geom.frag.spv",
        LayoutId::StaticMesh,
    );
    geometry.vertex_input = VertexInput::Mesh;
    geometry.depth_stencil = DepthStencilState::default();
    geometry.color_blend = gbuffer_blend;
    // material id + has-AO flag
    geometry.push_constants = fragment_push(8);

    let mut lighting = graphics(
        PipelineKey::new(PassId::GeometryLighting, 1, PipelineKind::Lighting),
        "lighting",
        "fullscreen.vert.spv",
        "lighting_pass/lighting.frag.spv",
        LayoutId::Lighting,
    );
    lighting.depth_stencil = DepthStencilState {
        depth_test_enable: true,
        depth_write_enable: false,
        depth_compare_op: CompareOp::Always,
    };
    lighting.push_constants = fragment_push(4);
    lighting.specialization = vec![(0, SpecValue::LightCount)];

    let mut brightness = graphics(
        PipelineKey::new(PassId::BloomClear, 0, PipelineKind::BloomBrightness),
        "bloom_brightness_mask",
        "fullscreen.vert.spv",
        "bloom_pass/brightness_mask.frag.spv",
        LayoutId::Bloom,
    );
    brightness.viewport = ViewportMode::HalfExtent;

    let mut blur = graphics(
        PipelineKey::new(PassId::BloomClear, 0, PipelineKind::BloomBlur),
        "bloom_gaussian_blur",
        "fullscreen.vert.spv",
        "bloom_pass/gaussian_blur.frag.spv",
        LayoutId::Bloom,
    );
    blur.viewport = ViewportMode::HalfExtent;
    // is-horizontal flag
    blur.push_constants = fragment_push(4);

    let mut merge = graphics(
        PipelineKey::new(PassId::BloomMerge, 0, PipelineKind::BloomMerge),
        "bloom_merge",
        "fullscreen.vert.spv",
        "bloom_pass/merge.frag.spv",
        LayoutId::Bloom,
    );
    merge.color_blend = vec![ColorBlendState::ADDITIVE];

    let final_output = graphics(
        PipelineKey::new(PassId::FinalOutput, 0, PipelineKind::FinalOutput),
        "final_output",
        "fullscreen.vert.spv",
        "final_output_pass/final_output.frag.spv",
        LayoutId::FinalOutput,
    );

    vec![
        PipelineEntry {
            key: PipelineKey::new(PassId::BrdfLut, 0, PipelineKind::BrdfLut),
            name: "brdf_lut",
            shaders: ShaderSet::Compute { shader: "brdf_lut_pass/brdf_lut.comp.spv" },
            vertex_input: VertexInput::FullScreen,
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::DISABLED,
            color_blend: Vec::new(),
            layout: LayoutId::BrdfLut,
            push_constants: Vec::new(),
            specialization: Vec::new(),
            viewport: ViewportMode::Dynamic,
        },
        prefilter(
            PipelineKind::DiffusePrefilter,
            "diffuse_prefilter",
            "env_prefilter_pass/diff_env_prefilter.frag.spv",
            Vec::new(),
        ),
        // roughness of the mip level being filtered
        prefilter(
            PipelineKind::SpecularPrefilter,
            "specular_prefilter",
            "env_prefilter_pass/spec_env_prefilter.frag.spv",
            fragment_push(4),
        ),
        skybox,
        geometry,
        lighting,
        brightness,
        blur,
        merge,
        final_output,
    ]
}

/// Everything a manifest entry is resolved against
pub struct ManifestContext<'a> {
    pub graph: &'a PassGraphBuilder,
    pub passes: &'a PassMap,
    pub layouts: &'a DescriptorLayouts,
    pub loader: &'a dyn AssetLoader,
    /// Swapchain extent
    pub extent: (u32, u32),
    pub light_count: u32,
}

impl ManifestContext<'_> {
    fn viewport(&self, mode: ViewportMode) -> ViewportState {
        let (width, height) = self.extent;
        match mode {
            ViewportMode::SwapchainExtent => ViewportState::baked(width, height),
            ViewportMode::HalfExtent => ViewportState::baked((width / 2).max(1), (height / 2).max(1)),
            ViewportMode::Dynamic => ViewportState::Dynamic,
        }
    }

    fn pass(&self, id: PassId) -> Result<PassHandle> {
        self.passes
            .get(&id)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("pass {:?} has not been declared", id)))
    }
}

/// Create every entry whose key is not registered yet; returns how many were created
pub fn build_from_manifest(
    registry: &mut PipelineRegistry,
    device: &mut dyn GraphicsDevice,
    shaders: &mut ShaderLibrary,
    entries: &[PipelineEntry],
    ctx: &ManifestContext<'_>,
) -> Result<usize> {
    let mut created = 0;
    for entry in entries {
        if registry.contains(entry.key) {
            continue;
        }
        let layout = ctx.layouts.get(entry.layout)?.clone();

        match &entry.shaders {
            ShaderSet::Compute { shader } => {
                let desc = ComputePipelineDesc {
                    name: entry.name.to_string(),
                    shader: shaders.load(device, ctx.loader, shader)?,
                    descriptor_set_layouts: vec![layout],
                    push_constant_ranges: entry.push_constants.clone(),
                };
                registry.create_compute(device, entry.key, &desc)?;
            }
            ShaderSet::Graphics { vertex, geometry, fragment } => {
                let handle = ctx.pass(entry.key.pass)?;
                let geometry_shader = match geometry {
                    Some(name) => Some(shaders.load(device, ctx.loader, name)?),
                    None => None,
                };
                let desc = GraphicsPipelineDesc {
                    name: entry.name.to_string(),
                    vertex_shader: shaders.load(device, ctx.loader, vertex)?,
                    geometry_shader,
                    fragment_shader: shaders.load(device, ctx.loader, fragment)?,
                    vertex_layout: match entry.vertex_input {
                        VertexInput::Mesh => Vertex::layout(),
                        VertexInput::FullScreen => VertexLayout::default(),
                    },
                    topology: PrimitiveTopology::TriangleList,
                    rasterization: entry.rasterization,
                    depth_stencil: entry.depth_stencil,
                    color_blend: entry.color_blend.clone(),
                    descriptor_set_layouts: vec![layout],
                    push_constant_ranges: entry.push_constants.clone(),
                    specialization: entry
                        .specialization
                        .iter()
                        .map(|&(constant_id, value)| SpecializationConstant {
                            constant_id,
                            value: match value {
                                SpecValue::LightCount => ctx.light_count,
                                SpecValue::Constant(v) => v,
                            },
                        })
                        .collect(),
                    viewport: ctx.viewport(entry.viewport),
                    render_pass: ctx.graph.render_pass(handle)?.clone(),
                    subpass: entry.key.subpass,
                };
                registry.create_graphics(device, entry.key, &desc, ctx.graph.desc(handle)?)?;
            }
        }
        created += 1;
    }

    if created > 0 {
        engine_info!("laugh::PipelineRegistry", "Built {} pipeline(s) from manifest", created);
    }
    Ok(created)
}
