/// RenderPass - Vulkan implementation of the RenderPass trait

use ash::vk;
use laugh_engine::laugh::render::{AttachmentRef, RenderPass as RendererRenderPass, RenderPassDesc, SubpassRef};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    access_flags_to_vk, image_layout_to_vk, load_op_to_vk, pipeline_stages_to_vk, store_op_to_vk,
    subpass_ref_to_vk, texture_format_to_vk,
};

/// Vulkan render pass implementation
pub struct RenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    name: String,
    subpass_count: u32,
}

fn attachment_ref_to_vk(reference: &AttachmentRef) -> vk::AttachmentReference {
    vk::AttachmentReference::default()
        .attachment(reference.attachment)
        .layout(image_layout_to_vk(reference.layout))
}

impl RenderPass {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        if desc.subpasses.is_empty() {
            return Err(Error::InvalidResource(format!("Render pass '{}' has no subpass", desc.name)));
        }

        let attachments: Vec<vk::AttachmentDescription> = desc.attachments
            .iter()
            .map(|a| {
                // stencil follows the depth ops when the format carries one
                let (stencil_load, stencil_store) = if a.format.has_stencil() {
                    (load_op_to_vk(a.load_op), store_op_to_vk(a.store_op))
                } else {
                    (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
                };
                vk::AttachmentDescription::default()
                    .format(texture_format_to_vk(a.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op_to_vk(a.load_op))
                    .store_op(store_op_to_vk(a.store_op))
                    .stencil_load_op(stencil_load)
                    .stencil_store_op(stencil_store)
                    .initial_layout(image_layout_to_vk(a.initial_layout))
                    .final_layout(image_layout_to_vk(a.final_layout))
            })
            .collect();

        // Reference arrays must outlive the subpass descriptions pointing at them
        let references: Vec<(Vec<vk::AttachmentReference>, Vec<vk::AttachmentReference>, Option<vk::AttachmentReference>)> = desc.subpasses
            .iter()
            .map(|s| {
                (
                    s.color_attachments.iter().map(attachment_ref_to_vk).collect(),
                    s.input_attachments.iter().map(attachment_ref_to_vk).collect(),
                    s.depth_stencil_attachment.as_ref().map(attachment_ref_to_vk),
                )
            })
            .collect();

        let subpasses: Vec<vk::SubpassDescription> = references
            .iter()
            .map(|(colors, inputs, depth)| {
                let mut subpass = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(colors)
                    .input_attachments(inputs);
                if let Some(depth_ref) = depth {
                    subpass = subpass.depth_stencil_attachment(depth_ref);
                }
                subpass
            })
            .collect();

        let dependencies: Vec<vk::SubpassDependency> = desc.dependencies
            .iter()
            .map(|d| {
                let by_region = d.src_subpass != SubpassRef::External && d.dst_subpass != SubpassRef::External;
                vk::SubpassDependency::default()
                    .src_subpass(subpass_ref_to_vk(d.src_subpass))
                    .dst_subpass(subpass_ref_to_vk(d.dst_subpass))
                    .src_stage_mask(pipeline_stages_to_vk(d.src_stages))
                    .dst_stage_mask(pipeline_stages_to_vk(d.dst_stages))
                    .src_access_mask(access_flags_to_vk(d.src_access))
                    .dst_access_mask(access_flags_to_vk(d.dst_access))
                    .dependency_flags(if by_region {
                        vk::DependencyFlags::BY_REGION
                    } else {
                        vk::DependencyFlags::empty()
                    })
            })
            .collect();

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            ctx.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create render pass '{}': {:?}", desc.name, e))?
        };

        engine_debug!("laugh::vulkan", "Created render pass '{}' ({} attachments, {} subpasses, {} dependencies)",
            desc.name, attachments.len(), subpasses.len(), dependencies.len());

        Ok(Self {
            ctx,
            render_pass,
            name: desc.name.clone(),
            subpass_count: desc.subpasses.len() as u32,
        })
    }
}

impl RendererRenderPass for RenderPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn subpass_count(&self) -> u32 {
        self.subpass_count
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
