//! Unit tests for the pass graph builder and hazard validation

use std::sync::Arc;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    AccessFlags, AttachmentRef, FramebufferDesc, GraphicsDevice, ImageLayout, PipelineStages, RenderTargetDesc,
    SubpassDependency, SubpassRef, TargetLayers, TextureDesc, TextureFormat, TextureUsage,
};
use super::*;

fn all_standard_passes() -> Vec<RenderPassDesc> {
    PassId::RENDER_PASSES
        .iter()
        .filter_map(|id| id.desc(TextureFormat::D32_SFLOAT, TextureFormat::B8G8R8A8_SRGB))
        .collect()
}

fn geometry_without_edge(src: u32, dst: u32) -> RenderPassDesc {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    desc.dependencies.retain(|d| {
        !(d.src_subpass == SubpassRef::Index(src) && d.dst_subpass == SubpassRef::Index(dst))
    });
    desc
}

// ============================================================================
// HAZARD VALIDATION
// ============================================================================

#[test]
fn test_standard_passes_have_no_hazards() {
    for desc in all_standard_passes() {
        assert_eq!(validate_dependencies(&desc), Ok(()), "pass '{}'", desc.name);
        assert!(check_structure(&desc).is_ok(), "pass '{}'", desc.name);
    }
}

#[test]
fn test_missing_geometry_to_lighting_edge_is_reported() {
    let violations = validate_dependencies(&geometry_without_edge(0, 1)).unwrap_err();

    // three G-buffer inputs, depth as input, depth as read-only depth
    assert_eq!(violations.len(), 5);
    assert!(violations.iter().all(|v| v.subpass == 1));
    assert!(violations.iter().all(|v| v.writer == SubpassRef::Index(0)));
    assert!(violations.iter().all(|v| v.kind == HazardKind::MissingDependency));

    let mut attachments: Vec<u32> = violations.iter().map(|v| v.attachment).collect();
    attachments.sort();
    assert_eq!(attachments, vec![0, 0, 1, 2, 3]);
}

#[test]
fn test_edge_missing_input_read_access() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    for dep in &mut desc.dependencies {
        if dep.dst_subpass == SubpassRef::Index(1) {
            dep.dst_access.remove(AccessFlags::INPUT_ATTACHMENT_READ);
        }
    }
    let violations = validate_dependencies(&desc).unwrap_err();
    // depth is still covered as a depth read, not as an input
    assert_eq!(violations.len(), 4);
    assert!(violations.iter().all(|v| v.kind == HazardKind::DestinationNotCovered));
}

#[test]
fn test_edge_missing_depth_write_source() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    for dep in &mut desc.dependencies {
        if dep.dst_subpass == SubpassRef::Index(1) {
            dep.src_stages = PipelineStages::COLOR_ATTACHMENT_OUTPUT;
        }
    }
    let violations = validate_dependencies(&desc).unwrap_err();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.attachment == GEOM_DEPTH));
    assert!(violations.iter().all(|v| v.kind == HazardKind::SourceNotCovered));
}

#[test]
fn test_source_and_destination_must_share_an_edge() {
    let original = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    let edge = *original
        .dependencies
        .iter()
        .find(|d| d.src_subpass == SubpassRef::Index(0) && d.dst_subpass == SubpassRef::Index(1))
        .unwrap();

    // one edge only covers the writes, the other only the reads
    let mut desc = geometry_without_edge(0, 1);
    desc.dependencies.push(SubpassDependency {
        dst_stages: PipelineStages::TOP_OF_PIPE,
        dst_access: AccessFlags::empty(),
        ..edge
    });
    desc.dependencies.push(SubpassDependency {
        src_stages: PipelineStages::TOP_OF_PIPE,
        src_access: AccessFlags::empty(),
        ..edge
    });

    let violations = validate_dependencies(&desc).unwrap_err();
    assert_eq!(violations.len(), 5);
    assert!(violations.iter().all(|v| v.kind == HazardKind::DestinationNotCovered));
}

#[test]
fn test_broad_masks_cover_everything() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    for dep in &mut desc.dependencies {
        if dep.dst_subpass == SubpassRef::Index(1) {
            dep.src_stages = PipelineStages::ALL_COMMANDS;
            dep.dst_stages = PipelineStages::ALL_GRAPHICS;
            dep.src_access = AccessFlags::MEMORY_WRITE;
            dep.dst_access = AccessFlags::MEMORY_READ;
        }
    }
    assert_eq!(validate_dependencies(&desc), Ok(()));
}

#[test]
fn test_first_reader_needs_external_edge() {
    // a single subpass reading an attachment nobody wrote in this pass
    let mut desc = bloom_clear_pass();
    desc.attachments.push(desc.attachments[0].clone());
    desc.subpasses[0].input_attachments.push(AttachmentRef::new(1, ImageLayout::ShaderReadOnly));

    let violations = validate_dependencies(&desc).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].writer, SubpassRef::External);
    assert_eq!(violations[0].kind, HazardKind::DestinationNotCovered);
}

// ============================================================================
// STRUCTURE CHECKS
// ============================================================================

#[test]
fn test_out_of_range_attachment_rejected() {
    let mut desc = bloom_clear_pass();
    desc.subpasses[0].color_attachments[0].attachment = 3;
    assert!(matches!(check_structure(&desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_empty_subpasses_rejected() {
    let mut desc = bloom_clear_pass();
    desc.subpasses.clear();
    desc.dependencies.clear();
    assert!(check_structure(&desc).is_err());
}

#[test]
fn test_unknown_dependency_subpass_rejected() {
    let mut desc = bloom_clear_pass();
    desc.dependencies[0].dst_subpass = SubpassRef::Index(2);
    assert!(check_structure(&desc).is_err());
}

#[test]
fn test_backward_dependency_rejected() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    let edge = desc
        .dependencies
        .iter_mut()
        .find(|d| d.src_subpass == SubpassRef::Index(0) && d.dst_subpass == SubpassRef::Index(1))
        .unwrap();
    edge.src_subpass = SubpassRef::Index(1);
    edge.dst_subpass = SubpassRef::Index(0);
    assert!(matches!(check_structure(&desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_self_dependency_accepted() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    let mut edge = desc.dependencies[0];
    edge.src_subpass = SubpassRef::Index(1);
    edge.dst_subpass = SubpassRef::Index(1);
    desc.dependencies.push(edge);
    assert!(check_structure(&desc).is_ok());
}

#[test]
fn test_depth_format_as_color_rejected() {
    let mut desc = geometry_lighting_pass(TextureFormat::D32_SFLOAT);
    desc.subpasses[0].color_attachments.push(AttachmentRef::new(GEOM_DEPTH, ImageLayout::ColorAttachment));
    assert!(check_structure(&desc).is_err());
}

// ============================================================================
// BUILDER
// ============================================================================

#[test]
fn test_declare_pass_creates_render_pass() {
    let mut device = MockGraphicsDevice::new();
    let mut graph = PassGraphBuilder::with_validation(true);

    let handle = graph
        .declare_pass(&mut device, geometry_lighting_pass(TextureFormat::D32_SFLOAT), PassScope::Swapchain)
        .unwrap();

    assert_eq!(graph.len(), 1);
    assert_eq!(graph.render_pass(handle).unwrap().subpass_count(), 2);
    assert_eq!(graph.desc(handle).unwrap().attachments.len(), 5);
    assert!(device.log.lock().unwrap().created.contains(&"render_pass:geometry_lighting".to_string()));
}

#[test]
fn test_declare_pass_rejects_hazard_when_validating() {
    let mut device = MockGraphicsDevice::new();
    let mut graph = PassGraphBuilder::with_validation(true);
    let result = graph.declare_pass(&mut device, geometry_without_edge(0, 1), PassScope::Swapchain);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(graph.is_empty());
    assert!(device.log.lock().unwrap().created.is_empty());
}

#[test]
fn test_declare_pass_skips_hazards_when_disabled() {
    let mut device = MockGraphicsDevice::new();
    let mut graph = PassGraphBuilder::with_validation(false);
    assert!(graph.declare_pass(&mut device, geometry_without_edge(0, 1), PassScope::Swapchain).is_ok());
}

#[test]
fn test_framebuffer_lookup_out_of_range() {
    let mut device = MockGraphicsDevice::new();
    let mut graph = PassGraphBuilder::with_validation(true);
    let handle = graph.declare_pass(&mut device, bloom_clear_pass(), PassScope::Swapchain).unwrap();
    assert!(graph.framebuffer(handle, 0).is_err());
}

#[test]
fn test_teardown_is_reverse_and_ordered() {
    let mut device = MockGraphicsDevice::new();
    let mut graph = PassGraphBuilder::with_validation(true);

    let env = graph.declare_pass(&mut device, env_prefilter_pass(), PassScope::Persistent).unwrap();
    let bloom = graph.declare_pass(&mut device, bloom_clear_pass(), PassScope::Swapchain).unwrap();
    let output = graph
        .declare_pass(&mut device, final_output_pass(TextureFormat::B8G8R8A8_SRGB), PassScope::Swapchain)
        .unwrap();

    let image = device
        .create_texture(TextureDesc::attachment(
            "post_effect_0", 64, 64, POST_EFFECT_FORMAT, TextureUsage::COLOR_ATTACHMENT,
        ))
        .unwrap();
    let target = device
        .create_render_target(&RenderTargetDesc {
            texture: Arc::clone(&image),
            mip_level: 0,
            layers: TargetLayers::Single(0),
        })
        .unwrap();
    let framebuffer = device
        .create_framebuffer(&FramebufferDesc {
            name: "bloom_fb".to_string(),
            render_pass: graph.render_pass(bloom).unwrap(),
            attachments: vec![target],
            width: 64,
            height: 64,
            layers: 1,
        })
        .unwrap();
    graph.attach_framebuffers(bloom, vec![framebuffer]).unwrap();
    graph.attach_images(bloom, vec![image]).unwrap();

    graph.teardown_scope(PassScope::Swapchain);

    assert_eq!(graph.pass_names(), vec!["env_prefilter"]);
    assert!(graph.contains(env));
    assert!(!graph.contains(bloom));
    assert!(!graph.contains(output));
    assert_eq!(
        device.log.lock().unwrap().destroyed,
        vec![
            "render_pass:final_output".to_string(),
            "framebuffer:bloom_fb".to_string(),
            "render_pass:bloom_clear".to_string(),
            "texture:post_effect_0".to_string(),
        ]
    );

    graph.teardown();
    assert!(graph.is_empty());
    assert_eq!(
        device.log.lock().unwrap().destroyed.last().map(String::as_str),
        Some("render_pass:env_prefilter")
    );
}

#[test]
fn test_select_depth_format_prefers_first_supported() {
    let mut device = MockGraphicsDevice::new();
    device.depth_formats = vec![TextureFormat::D24_UNORM_S8_UINT, TextureFormat::D32_SFLOAT_S8_UINT];
    assert_eq!(select_depth_format(&device).unwrap(), TextureFormat::D32_SFLOAT_S8_UINT);

    device.depth_formats.clear();
    assert!(matches!(select_depth_format(&device), Err(Error::InitializationFailed(_))));
}
