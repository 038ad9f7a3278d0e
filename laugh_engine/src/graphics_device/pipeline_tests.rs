//! Unit tests for pipeline.rs (fixed-function helpers)

use crate::graphics_device::{ColorBlendState, ViewportState};

// ============================================================================
// BLEND TESTS
// ============================================================================

#[test]
fn test_opaque_blend_overwrites() {
    let out = ColorBlendState::OPAQUE.apply([0.2, 0.3, 0.4, 1.0], [9.0, 9.0, 9.0, 9.0]);
    assert_eq!(out, [0.2, 0.3, 0.4, 1.0]);
}

#[test]
fn test_additive_blend_sums() {
    let out = ColorBlendState::ADDITIVE.apply([0.5, 0.25, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(out, [1.5, 1.25, 1.0, 2.0]);
}

#[test]
fn test_additive_blend_with_zero_source_is_identity() {
    let dst = [0.7, 0.1, 3.5, 1.0];
    let out = ColorBlendState::ADDITIVE.apply([0.0; 4], dst);
    assert_eq!(out, dst);
}

// ============================================================================
// VIEWPORT TESTS
// ============================================================================

#[test]
fn test_baked_viewport_covers_extent() {
    match ViewportState::baked(1280, 720) {
        ViewportState::Baked { viewport, scissor } => {
            assert_eq!(viewport.width, 1280.0);
            assert_eq!(viewport.height, 720.0);
            assert_eq!(viewport.max_depth, 1.0);
            assert_eq!((scissor.width, scissor.height), (1280, 720));
        }
        ViewportState::Dynamic => panic!("expected baked viewport"),
    }
    assert!(!ViewportState::Dynamic.is_baked());
}
