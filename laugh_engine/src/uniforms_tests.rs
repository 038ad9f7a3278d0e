//! Unit tests for uniforms.rs

use glam::{Mat4, Quat, Vec3, Vec4};
use crate::uniforms::*;

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-5
}

// ============================================================================
// LAYOUT TESTS
// ============================================================================

#[test]
fn test_std140_sizes() {
    assert_eq!(std::mem::size_of::<CubeMapCamera>(), 7 * 64);
    assert_eq!(std::mem::size_of::<TransMats>(), 64);
    assert_eq!(std::mem::size_of::<PointLightData>(), 32);
    assert_eq!(std::mem::size_of::<DisplayInfo>(), 16);
    assert_eq!(std::mem::size_of::<PerModel>(), 128);
}

#[test]
fn test_lighting_info_encoding() {
    let lights = default_lights();
    let bytes = LightingInfo::encode(Vec3::new(0.0, 1.0, 3.0), &lights);
    assert_eq!(bytes.len() as u64, LightingInfo::byte_size(2));

    let floats: &[f32] = bytemuck::cast_slice(&bytes);
    assert_eq!(&floats[0..4], &[0.0, 1.0, 3.0, 1.0]);
    // first light: position.xyzw, color.rgb, radius
    assert_eq!(&floats[4..12], &[1.0, 2.0, 2.0, 1.0, 4.0, 4.0, 4.0, 5.0]);
    assert_eq!(&floats[12..20], &[-0.5, 2.0, -2.0, 1.0, 1.5, 1.5, 1.5, 5.0]);
}

// ============================================================================
// CUBE CAMERA TESTS
// ============================================================================

#[test]
fn test_cube_views_look_along_axes() {
    let views = cube_map_views();
    let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    for (view, axis) in views.iter().zip(axes) {
        // a point on the axis ends up straight ahead (-Z in view space)
        let p = view.transform_point3(axis);
        assert!(approx(p, Vec3::new(0.0, 0.0, -1.0)), "{:?} -> {:?}", axis, p);
    }
}

#[test]
fn test_cube_projection_is_square_90_degrees() {
    let proj = cube_map_projection();
    let expected = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    assert_eq!(proj, expected);
    assert!((proj.x_axis.x - proj.y_axis.y).abs() < 1e-6);
}

#[test]
fn test_trans_mats_multiplies_projection_first() {
    let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
    let proj = Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0);
    assert_eq!(TransMats::new(view, proj).vp, proj * view);
}

// ============================================================================
// DISPLAY MODE TESTS
// ============================================================================

#[test]
fn test_display_mode_cycles_through_all() {
    let mut mode = DisplayMode::Final;
    for expected in DisplayMode::ALL.iter().skip(1) {
        mode = mode.next();
        assert_eq!(mode, *expected);
    }
    assert_eq!(mode.next(), DisplayMode::Final);
}

#[test]
fn test_display_info_shader_value() {
    assert_eq!(DisplayInfo::new(DisplayMode::Final).display_mode, 0);
    assert_eq!(DisplayInfo::new(DisplayMode::Depth).display_mode, 7);
}

// ============================================================================
// PER MODEL TESTS
// ============================================================================

#[test]
fn test_per_model_inverse_transpose() {
    let transform = ModelTransform {
        position: Vec3::new(1.0, 2.0, 3.0),
        rotation: Quat::from_rotation_y(std::f32::consts::PI),
        scale: Vec3::splat(2.0),
    };
    let data = PerModel::from_transform(&transform);
    let product = data.model.transpose() * data.model_inv_trans;
    assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    assert_eq!(data.model.w_axis, Vec4::new(1.0, 2.0, 3.0, 1.0));
}
