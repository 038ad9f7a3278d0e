/// Pipeline trait and pipeline descriptors (graphics and compute)

use std::sync::Arc;
use crate::graphics_device::{
    BufferFormat, DescriptorSetLayout, Rect2D, RenderPass, Shader, ShaderStageFlags, Viewport,
};

// ===== VERTEX INPUT =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
}

/// Index type for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: BufferFormat,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
}

/// Vertex input layout; empty for full-screen passes that generate vertices in the shader
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== FIXED FUNCTION STATE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: CompareOp,
}

impl DepthStencilState {
    pub const DISABLED: Self = Self {
        depth_test_enable: false,
        depth_write_enable: false,
        depth_compare_op: CompareOp::Always,
    };
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    Min,
    Max,
}

/// Per-attachment blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
}

impl ColorBlendState {
    /// Overwrite (no blending)
    pub const OPAQUE: Self = Self {
        blend_enable: false,
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::Zero,
        color_blend_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::Zero,
        alpha_blend_op: BlendOp::Add,
    };

    /// dst = src + dst
    pub const ADDITIVE: Self = Self {
        blend_enable: true,
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::One,
        color_blend_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::One,
        alpha_blend_op: BlendOp::Add,
    };

    /// CPU evaluation of the blend equation on one RGBA value
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        if !self.blend_enable {
            return src;
        }
        let factor = |f: BlendFactor, src_a: f32| match f {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcAlpha => src_a,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_a,
        };
        let op = |o: BlendOp, a: f32, b: f32| match o {
            BlendOp::Add => a + b,
            BlendOp::Subtract => a - b,
            BlendOp::Min => a.min(b),
            BlendOp::Max => a.max(b),
        };
        let mut out = [0.0; 4];
        for c in 0..3 {
            out[c] = op(
                self.color_blend_op,
                src[c] * factor(self.src_color_factor, src[3]),
                dst[c] * factor(self.dst_color_factor, src[3]),
            );
        }
        out[3] = op(
            self.alpha_blend_op,
            src[3] * factor(self.src_alpha_factor, src[3]),
            dst[3] * factor(self.dst_alpha_factor, src[3]),
        );
        out
    }
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

// ===== LAYOUT / CONSTANTS =====

/// Push constant range declared in the pipeline layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// Specialization constant (32-bit value, applied to every stage that declares `constant_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecializationConstant {
    pub constant_id: u32,
    pub value: u32,
}

/// Viewport handling
#[derive(Debug, Clone, Copy)]
pub enum ViewportState {
    /// Viewport and scissor fixed at creation (recreated on resize)
    Baked { viewport: Viewport, scissor: Rect2D },
    /// Viewport and scissor set by the command list before each draw
    Dynamic,
}

impl ViewportState {
    /// Full-extent baked viewport
    pub fn baked(width: u32, height: u32) -> Self {
        ViewportState::Baked {
            viewport: Viewport {
                x: 0.0,
                y: 0.0,
                width: width as f32,
                height: height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor: Rect2D { x: 0, y: 0, width, height },
        }
    }

    pub fn is_baked(&self) -> bool {
        matches!(self, ViewportState::Baked { .. })
    }
}

// ===== PIPELINE DESCRIPTORS =====

/// Descriptor for creating a graphics pipeline bound to one render pass + subpass
#[derive(Clone)]
pub struct GraphicsPipelineDesc {
    pub name: String,
    pub vertex_shader: Arc<dyn Shader>,
    pub geometry_shader: Option<Arc<dyn Shader>>,
    pub fragment_shader: Arc<dyn Shader>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    /// One entry per color attachment of the subpass
    pub color_blend: Vec<ColorBlendState>,
    pub descriptor_set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub specialization: Vec<SpecializationConstant>,
    pub viewport: ViewportState,
    pub render_pass: Arc<dyn RenderPass>,
    pub subpass: u32,
}

/// Descriptor for creating a compute pipeline
#[derive(Clone)]
pub struct ComputePipelineDesc {
    pub name: String,
    pub shader: Arc<dyn Shader>,
    pub descriptor_set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

/// Where a pipeline binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Pipeline trait (immutable once created)
pub trait Pipeline: Send + Sync {
    fn bind_point(&self) -> PipelineBindPoint;
    fn name(&self) -> &str;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
