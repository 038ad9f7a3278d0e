/// Pipeline - Vulkan graphics and compute pipelines with their layouts

use ash::vk;
use laugh_engine::laugh::render::{
    ComputePipelineDesc, DescriptorSetLayout as RendererDescriptorSetLayout, GraphicsPipelineDesc,
    Pipeline as RendererPipeline, PipelineBindPoint, PushConstantRange, RenderPass as RendererRenderPass,
    Shader as RendererShader, SpecializationConstant, ViewportState,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_set::DescriptorSetLayout;
use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, buffer_format_to_vk, compare_op_to_vk, cull_mode_to_vk,
    front_face_to_vk, shader_stage_flags_to_vk, shader_stage_to_vk, topology_to_vk,
};
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_shader::Shader;

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    /// Accessed by command lists for descriptor set binding and push constants
    pub(crate) layout: vk::PipelineLayout,
    bind_point: PipelineBindPoint,
    name: String,
}

fn shader_ref(shader: &Arc<dyn RendererShader>) -> &Shader {
    // SAFETY: shaders handed to this backend were created by it
    unsafe { &*(shader.as_ref() as *const dyn RendererShader as *const Shader) }
}

/// Check every reflected resource of `shaders` against the declared layout
fn validate_interface(
    pipeline_name: &str,
    shaders: &[&Shader],
    set_layouts: &[Arc<dyn RendererDescriptorSetLayout>],
    push_ranges: &[PushConstantRange],
    max_push_constants_size: u32,
) -> Result<()> {
    let declared_push = push_ranges.iter().map(|r| r.offset + r.size).max().unwrap_or(0);
    if declared_push > max_push_constants_size {
        return Err(Error::InvalidResource(format!(
            "Pipeline '{}': push constants need {} bytes, device allows {}",
            pipeline_name, declared_push, max_push_constants_size
        )));
    }

    for shader in shaders {
        for &(set, binding) in &shader.interface.bindings {
            let declared = set_layouts
                .get(set as usize)
                .is_some_and(|layout| layout.desc().bindings.iter().any(|b| b.binding == binding));
            if !declared {
                return Err(Error::InvalidResource(format!(
                    "Pipeline '{}': shader '{}' uses set {} binding {} missing from the layout",
                    pipeline_name, shader.name, set, binding
                )));
            }
        }
        if let Some(size) = shader.interface.push_constant_size {
            if size > declared_push {
                return Err(Error::InvalidResource(format!(
                    "Pipeline '{}': shader '{}' reads {} push constant bytes, layout declares {}",
                    pipeline_name, shader.name, size, declared_push
                )));
            }
        }
    }
    Ok(())
}

fn create_layout(
    ctx: &GpuContext,
    name: &str,
    set_layouts: &[Arc<dyn RendererDescriptorSetLayout>],
    push_ranges: &[PushConstantRange],
) -> Result<vk::PipelineLayout> {
    let vk_set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts
        .iter()
        .map(|l| {
            // SAFETY: layouts handed to this backend were created by it
            unsafe { (*(l.as_ref() as *const dyn RendererDescriptorSetLayout as *const DescriptorSetLayout)).layout }
        })
        .collect();
    let vk_push_ranges: Vec<vk::PushConstantRange> = push_ranges
        .iter()
        .map(|r| vk::PushConstantRange {
            stage_flags: shader_stage_flags_to_vk(r.stages),
            offset: r.offset,
            size: r.size,
        })
        .collect();

    let layout_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&vk_set_layouts)
        .push_constant_ranges(&vk_push_ranges);

    unsafe {
        ctx.device.create_pipeline_layout(&layout_info, None)
            .map_err(|e| engine_err!("laugh::vulkan", "Failed to create pipeline layout for '{}': {:?}", name, e))
    }
}

/// Map entries and packed data for a list of 32-bit specialization constants
fn specialization_data(constants: &[SpecializationConstant]) -> (Vec<vk::SpecializationMapEntry>, Vec<u8>) {
    let entries = constants
        .iter()
        .enumerate()
        .map(|(i, c)| vk::SpecializationMapEntry {
            constant_id: c.constant_id,
            offset: (i * 4) as u32,
            size: 4,
        })
        .collect();
    let data = constants.iter().flat_map(|c| c.value.to_ne_bytes()).collect();
    (entries, data)
}

impl Pipeline {
    pub(crate) fn create_graphics(ctx: Arc<GpuContext>, desc: &GraphicsPipelineDesc) -> Result<Self> {
        let mut shaders = vec![shader_ref(&desc.vertex_shader)];
        if let Some(geometry) = &desc.geometry_shader {
            shaders.push(shader_ref(geometry));
        }
        shaders.push(shader_ref(&desc.fragment_shader));

        validate_interface(
            &desc.name,
            &shaders,
            &desc.descriptor_set_layouts,
            &desc.push_constant_ranges,
            ctx.limits.max_push_constants_size,
        )?;

        if desc.subpass >= desc.render_pass.subpass_count() {
            return Err(Error::InvalidResource(format!(
                "Pipeline '{}': subpass {} out of range for render pass '{}'",
                desc.name, desc.subpass, desc.render_pass.name()
            )));
        }

        // Specialization applies to every stage; unknown ids are ignored by the driver
        let (spec_entries, spec_data) = specialization_data(&desc.specialization);
        let spec_info = vk::SpecializationInfo::default()
            .map_entries(&spec_entries)
            .data(&spec_data);

        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = shaders
            .iter()
            .map(|shader| {
                let stage = vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(shader.stage))
                    .module(shader.module)
                    .name(&shader.entry_point);
                if spec_entries.is_empty() {
                    stage
                } else {
                    stage.specialization_info(&spec_info)
                }
            })
            .collect();

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: buffer_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport state (baked or dynamic)
        let (viewports, scissors, dynamic_states) = match desc.viewport {
            ViewportState::Baked { viewport, scissor } => (
                vec![vk::Viewport {
                    x: viewport.x,
                    y: viewport.y,
                    width: viewport.width,
                    height: viewport.height,
                    min_depth: viewport.min_depth,
                    max_depth: viewport.max_depth,
                }],
                vec![vk::Rect2D {
                    offset: vk::Offset2D { x: scissor.x, y: scissor.y },
                    extent: vk::Extent2D { width: scissor.width, height: scissor.height },
                }],
                Vec::new(),
            ),
            ViewportState::Dynamic => (
                vec![vk::Viewport::default()],
                vec![vk::Rect2D::default()],
                vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            ),
        };
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
            .front_face(front_face_to_vk(desc.rasterization.front_face))
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_stencil.depth_test_enable)
            .depth_write_enable(desc.depth_stencil.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc.color_blend
            .iter()
            .map(|blend| {
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(blend.blend_enable)
                    .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
                    .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
                    .color_blend_op(blend_op_to_vk(blend.color_blend_op))
                    .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
                    .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
                    .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op))
            })
            .collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let layout = create_layout(&ctx, &desc.name, &desc.descriptor_set_layouts, &desc.push_constant_ranges)?;

        // SAFETY: render passes handed to this backend were created by it
        let vk_render_pass = unsafe { &*(desc.render_pass.as_ref() as *const dyn RendererRenderPass as *const RenderPass) };

        let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .layout(layout)
            .render_pass(vk_render_pass.render_pass)
            .subpass(desc.subpass);
        if !dynamic_states.is_empty() {
            pipeline_info = pipeline_info.dynamic_state(&dynamic_state);
        }

        let pipelines = unsafe {
            ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { ctx.device.destroy_pipeline_layout(layout, None) };
                return Err(engine_err!("laugh::vulkan", "Failed to create graphics pipeline '{}': {:?}", desc.name, e));
            }
        };

        engine_debug!("laugh::vulkan", "Created graphics pipeline '{}' ({} stages, {} viewport)",
            desc.name, shader_stages.len(), if desc.viewport.is_baked() { "baked" } else { "dynamic" });

        Ok(Self {
            ctx,
            pipeline,
            layout,
            bind_point: PipelineBindPoint::Graphics,
            name: desc.name.clone(),
        })
    }

    pub(crate) fn create_compute(ctx: Arc<GpuContext>, desc: &ComputePipelineDesc) -> Result<Self> {
        let shader = shader_ref(&desc.shader);
        validate_interface(
            &desc.name,
            &[shader],
            &desc.descriptor_set_layouts,
            &desc.push_constant_ranges,
            ctx.limits.max_push_constants_size,
        )?;

        let layout = create_layout(&ctx, &desc.name, &desc.descriptor_set_layouts, &desc.push_constant_ranges)?;

        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader.module)
            .name(&shader.entry_point);
        let pipeline_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipelines = unsafe {
            ctx.device.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { ctx.device.destroy_pipeline_layout(layout, None) };
                return Err(engine_err!("laugh::vulkan", "Failed to create compute pipeline '{}': {:?}", desc.name, e));
            }
        };

        Ok(Self {
            ctx,
            pipeline,
            layout,
            bind_point: PipelineBindPoint::Compute,
            name: desc.name.clone(),
        })
    }
}

impl RendererPipeline for Pipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specialization_data_packs_consecutive_words() {
        let (entries, data) = specialization_data(&[
            SpecializationConstant { constant_id: 3, value: 7 },
            SpecializationConstant { constant_id: 0, value: 1 },
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].constant_id, 3);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].constant_id, 0);
        assert_eq!(entries[1].offset, 4);
        assert_eq!(data.len(), 8);
        assert_eq!(&data[0..4], &7u32.to_ne_bytes());
    }

    #[test]
    fn test_specialization_data_empty() {
        let (entries, data) = specialization_data(&[]);
        assert!(entries.is_empty());
        assert!(data.is_empty());
    }
}
