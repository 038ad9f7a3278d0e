/// RenderPass trait and the full render pass description
/// (attachments, subpasses, subpass dependencies)

use bitflags::bitflags;
use crate::graphics_device::TextureFormat;

/// Render pass trait
///
/// Backend object created from a [`RenderPassDesc`].
pub trait RenderPass: Send + Sync {
    fn name(&self) -> &str;

    /// Number of subpasses declared at creation
    fn subpass_count(&self) -> u32;
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Reference from a subpass to an attachment index, with the layout used during the subpass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentRef {
    pub attachment: u32,
    pub layout: ImageLayout,
}

impl AttachmentRef {
    pub fn new(attachment: u32, layout: ImageLayout) -> Self {
        Self { attachment, layout }
    }
}

/// One subpass: what it writes, what it reads as input attachments
#[derive(Debug, Clone, Default)]
pub struct SubpassDesc {
    pub color_attachments: Vec<AttachmentRef>,
    pub input_attachments: Vec<AttachmentRef>,
    pub depth_stencil_attachment: Option<AttachmentRef>,
}

/// Endpoint of a subpass dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubpassRef {
    /// Work outside the render pass (before it for src, after it for dst)
    External,
    /// A subpass of this render pass
    Index(u32),
}

bitflags! {
    /// Pipeline stages named by dependencies, barriers and semaphore waits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const GEOMETRY_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const EARLY_FRAGMENT_TESTS = 1 << 4;
        const LATE_FRAGMENT_TESTS = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const COMPUTE_SHADER = 1 << 7;
        const TRANSFER = 1 << 8;
        const BOTTOM_OF_PIPE = 1 << 9;
        const ALL_GRAPHICS = 1 << 10;
        const ALL_COMMANDS = 1 << 11;
    }
}

bitflags! {
    /// Memory access types named by dependencies and barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const INPUT_ATTACHMENT_READ = 1 << 0;
        const SHADER_READ = 1 << 1;
        const SHADER_WRITE = 1 << 2;
        const COLOR_ATTACHMENT_READ = 1 << 3;
        const COLOR_ATTACHMENT_WRITE = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 5;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 6;
        const TRANSFER_READ = 1 << 7;
        const TRANSFER_WRITE = 1 << 8;
        const HOST_READ = 1 << 9;
        const MEMORY_READ = 1 << 10;
        const MEMORY_WRITE = 1 << 11;
    }
}

/// Execution + memory dependency between two subpasses (or with External)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Debug name
    pub name: String,
    /// Ordered attachments; subpass references index into this list
    pub attachments: Vec<AttachmentDesc>,
    pub subpasses: Vec<SubpassDesc>,
    pub dependencies: Vec<SubpassDependency>,
}

impl RenderPassDesc {
    /// Number of color attachments written by `subpass`, None if out of range
    pub fn color_attachment_count(&self, subpass: u32) -> Option<usize> {
        self.subpasses.get(subpass as usize).map(|s| s.color_attachments.len())
    }
}
