//! Integration tests for the standard render pass table
//!
//! Static hazard analysis only. No GPU required.
//!
//! Run with: cargo test --test pass_graph_integration_tests

use laugh_engine::graphics_device::{SubpassRef, TextureFormat};
use laugh_engine::pass_graph::{
    check_structure, validate_dependencies, HazardKind, PassId, GEOM_GBUFFER0, GEOM_DEPTH,
};

fn standard_descs() -> Vec<(PassId, laugh_engine::graphics_device::RenderPassDesc)> {
    PassId::RENDER_PASSES
        .into_iter()
        .filter_map(|id| id.desc(TextureFormat::D32_SFLOAT, TextureFormat::B8G8R8A8_SRGB).map(|d| (id, d)))
        .collect()
}

// ============================================================================
// STANDARD PASSES
// ============================================================================

#[test]
fn test_integration_standard_passes_are_hazard_free() {
    let descs = standard_descs();
    assert_eq!(descs.len(), 5);
    for (id, desc) in &descs {
        check_structure(desc).unwrap_or_else(|e| panic!("{:?}: {}", id, e));
        if let Err(violations) = validate_dependencies(desc) {
            panic!("{:?} has unprotected reads: {:?}", id, violations);
        }
    }
}

#[test]
fn test_integration_brdf_stage_has_no_render_pass() {
    assert!(PassId::BrdfLut.desc(TextureFormat::D32_SFLOAT, TextureFormat::B8G8R8A8_SRGB).is_none());
}

#[test]
fn test_integration_removing_geometry_edge_is_reported() {
    let (_, mut desc) = standard_descs()
        .into_iter()
        .find(|(id, _)| *id == PassId::GeometryLighting)
        .unwrap();
    desc.dependencies
        .retain(|d| !(d.src_subpass == SubpassRef::Index(0) && d.dst_subpass == SubpassRef::Index(1)));

    let violations = validate_dependencies(&desc).unwrap_err();
    assert!(violations.iter().all(|v| v.subpass == 1 && v.kind == HazardKind::MissingDependency));
    assert!(violations.iter().any(|v| v.attachment == GEOM_GBUFFER0));
    assert!(violations.iter().any(|v| v.attachment == GEOM_DEPTH));
}
