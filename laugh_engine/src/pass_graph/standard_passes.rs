/// Render pass table of the deferred renderer
///
/// Pure data: each function returns the description handed to
/// `PassGraphBuilder::declare_pass`.

use crate::error::{Error, Result};
use crate::graphics_device::{
    AccessFlags, AttachmentDesc, AttachmentRef, GraphicsDevice, ImageLayout, LoadOp,
    PipelineStages, RenderPassDesc, StoreOp, SubpassDependency, SubpassDesc, SubpassRef,
    TextureFormat,
};
use super::PassScope;

/// Depth formats in order of preference
pub const DEPTH_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_SFLOAT,
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// normal + albedo, position, roughness/metalness/AO/material id
pub const GBUFFER_FORMATS: [TextureFormat; 3] = [
    TextureFormat::R32G32B32A32_SFLOAT,
    TextureFormat::R32G32B32A32_SFLOAT,
    TextureFormat::R8G8B8A8_UNORM,
];

pub const LIGHTING_RESULT_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
pub const POST_EFFECT_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
pub const IRRADIANCE_FORMAT: TextureFormat = TextureFormat::R32G32B32A32_SFLOAT;
pub const BRDF_LUT_FORMAT: TextureFormat = TextureFormat::R32G32_SFLOAT;

/// Attachment slots of the geometry+lighting pass
pub const GEOM_DEPTH: u32 = 0;
pub const GEOM_GBUFFER0: u32 = 1;
pub const GEOM_GBUFFER1: u32 = 2;
pub const GEOM_GBUFFER2: u32 = 3;
pub const GEOM_LIGHTING: u32 = 4;

/// Identity of a standard pass (pipeline keys and recording refer to it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    /// Compute-only stage of the BRDF LUT bake (no render pass)
    BrdfLut,
    EnvPrefilter,
    GeometryLighting,
    BloomClear,
    BloomMerge,
    FinalOutput,
}

impl PassId {
    /// Passes backed by a render pass, in declaration order
    pub const RENDER_PASSES: [PassId; 5] = [
        PassId::EnvPrefilter,
        PassId::GeometryLighting,
        PassId::BloomClear,
        PassId::BloomMerge,
        PassId::FinalOutput,
    ];

    pub fn scope(self) -> PassScope {
        match self {
            PassId::BrdfLut | PassId::EnvPrefilter => PassScope::Persistent,
            _ => PassScope::Swapchain,
        }
    }

    /// Description of this pass, None for the compute-only stage
    pub fn desc(self, depth_format: TextureFormat, swapchain_format: TextureFormat) -> Option<RenderPassDesc> {
        match self {
            PassId::BrdfLut => None,
            PassId::EnvPrefilter => Some(env_prefilter_pass()),
            PassId::GeometryLighting => Some(geometry_lighting_pass(depth_format)),
            PassId::BloomClear => Some(bloom_clear_pass()),
            PassId::BloomMerge => Some(bloom_merge_pass()),
            PassId::FinalOutput => Some(final_output_pass(swapchain_format)),
        }
    }
}

/// First depth candidate supported by the device
pub fn select_depth_format(device: &dyn GraphicsDevice) -> Result<TextureFormat> {
    device.find_depth_format(&DEPTH_CANDIDATES).ok_or_else(|| {
        Error::InitializationFailed("no supported depth attachment format".to_string())
    })
}

fn attachment(format: TextureFormat, load_op: LoadOp, initial: ImageLayout, final_layout: ImageLayout) -> AttachmentDesc {
    AttachmentDesc {
        format,
        load_op,
        store_op: StoreOp::Store,
        initial_layout: initial,
        final_layout,
    }
}

fn color(index: u32) -> AttachmentRef {
    AttachmentRef::new(index, ImageLayout::ColorAttachment)
}

/// G-buffer fill (subpass 0) followed by the lighting resolve (subpass 1)
pub fn geometry_lighting_pass(depth_format: TextureFormat) -> RenderPassDesc {
    let mut attachments = vec![attachment(depth_format, LoadOp::Clear, ImageLayout::Undefined, ImageLayout::ShaderReadOnly)];
    for format in GBUFFER_FORMATS {
        attachments.push(attachment(format, LoadOp::Clear, ImageLayout::Undefined, ImageLayout::ShaderReadOnly));
    }
    attachments.push(attachment(LIGHTING_RESULT_FORMAT, LoadOp::Clear, ImageLayout::Undefined, ImageLayout::ShaderReadOnly));

    let geometry = SubpassDesc {
        color_attachments: vec![color(GEOM_GBUFFER0), color(GEOM_GBUFFER1), color(GEOM_GBUFFER2)],
        input_attachments: Vec::new(),
        depth_stencil_attachment: Some(AttachmentRef::new(GEOM_DEPTH, ImageLayout::DepthStencilAttachment)),
    };
    let lighting = SubpassDesc {
        color_attachments: vec![color(GEOM_LIGHTING)],
        input_attachments: vec![
            AttachmentRef::new(GEOM_GBUFFER0, ImageLayout::ShaderReadOnly),
            AttachmentRef::new(GEOM_GBUFFER1, ImageLayout::ShaderReadOnly),
            AttachmentRef::new(GEOM_GBUFFER2, ImageLayout::ShaderReadOnly),
            AttachmentRef::new(GEOM_DEPTH, ImageLayout::DepthStencilReadOnly),
        ],
        depth_stencil_attachment: Some(AttachmentRef::new(GEOM_DEPTH, ImageLayout::DepthStencilReadOnly)),
    };

    let color_rw = AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE;
    let depth_rw = AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    let dependencies = vec![
        SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::BOTTOM_OF_PIPE,
            dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT
                | PipelineStages::EARLY_FRAGMENT_TESTS
                | PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: AccessFlags::empty(),
            dst_access: color_rw | depth_rw,
        },
        SubpassDependency {
            src_subpass: SubpassRef::Index(0),
            dst_subpass: SubpassRef::Index(1),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::LATE_FRAGMENT_TESTS,
            dst_stages: PipelineStages::FRAGMENT_SHADER
                | PipelineStages::COLOR_ATTACHMENT_OUTPUT
                | PipelineStages::EARLY_FRAGMENT_TESTS,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_access: AccessFlags::INPUT_ATTACHMENT_READ
                | color_rw
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
        },
        SubpassDependency {
            src_subpass: SubpassRef::Index(1),
            dst_subpass: SubpassRef::External,
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER | PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ | color_rw,
        },
    ];

    RenderPassDesc {
        name: "geometry_lighting".to_string(),
        attachments,
        subpasses: vec![geometry, lighting],
        dependencies,
    }
}

/// Layered cube-map rendering for the irradiance prefilter
pub fn env_prefilter_pass() -> RenderPassDesc {
    let color_rw = AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE;
    RenderPassDesc {
        name: "env_prefilter".to_string(),
        attachments: vec![attachment(
            IRRADIANCE_FORMAT,
            LoadOp::Clear,
            ImageLayout::Undefined,
            ImageLayout::ColorAttachment,
        )],
        subpasses: vec![SubpassDesc {
            color_attachments: vec![color(0)],
            ..Default::default()
        }],
        dependencies: vec![
            SubpassDependency {
                src_subpass: SubpassRef::External,
                dst_subpass: SubpassRef::Index(0),
                src_stages: PipelineStages::BOTTOM_OF_PIPE,
                dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                src_access: AccessFlags::empty(),
                dst_access: color_rw,
            },
            SubpassDependency {
                src_subpass: SubpassRef::Index(0),
                dst_subpass: SubpassRef::External,
                src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                dst_stages: PipelineStages::TOP_OF_PIPE,
                src_access: color_rw,
                dst_access: AccessFlags::empty(),
            },
        ],
    }
}

fn bloom_pass(name: &str, load_op: LoadOp, initial: ImageLayout) -> RenderPassDesc {
    RenderPassDesc {
        name: name.to_string(),
        attachments: vec![attachment(POST_EFFECT_FORMAT, load_op, initial, ImageLayout::ShaderReadOnly)],
        subpasses: vec![SubpassDesc {
            color_attachments: vec![color(0)],
            ..Default::default()
        }],
        dependencies: vec![SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
        }],
    }
}

/// Bright-pass and blur steps (target cleared)
pub fn bloom_clear_pass() -> RenderPassDesc {
    bloom_pass("bloom_clear", LoadOp::Clear, ImageLayout::Undefined)
}

/// Additive merge into the lighting result (target preserved)
pub fn bloom_merge_pass() -> RenderPassDesc {
    bloom_pass("bloom_merge", LoadOp::Load, ImageLayout::ShaderReadOnly)
}

pub fn final_output_pass(swapchain_format: TextureFormat) -> RenderPassDesc {
    RenderPassDesc {
        name: "final_output".to_string(),
        attachments: vec![attachment(
            swapchain_format,
            LoadOp::Clear,
            ImageLayout::Undefined,
            ImageLayout::PresentSrc,
        )],
        subpasses: vec![SubpassDesc {
            color_attachments: vec![color(0)],
            ..Default::default()
        }],
        dependencies: vec![SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER | PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ
                | AccessFlags::COLOR_ATTACHMENT_READ
                | AccessFlags::COLOR_ATTACHMENT_WRITE,
        }],
    }
}
