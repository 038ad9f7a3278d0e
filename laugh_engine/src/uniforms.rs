/// Uniform data layouts shared with the shaders
///
/// All structs are `#[repr(C)]` + `Pod` and follow std140 rules so they can
/// be copied byte-for-byte into the uniform blob.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Upper bound of point lights (size of the lighting uniform array)
pub const MAX_LIGHTS: usize = 16;

/// View + projection for the six cube faces (+X, -X, +Y, -Y, +Z, -Z)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CubeMapCamera {
    pub views: [Mat4; 6],
    pub proj: Mat4,
}

impl CubeMapCamera {
    pub fn new() -> Self {
        Self {
            views: cube_map_views(),
            proj: cube_map_projection(),
        }
    }
}

impl Default for CubeMapCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Face views looking out from the origin
pub fn cube_map_views() -> [Mat4; 6] {
    let faces = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    faces.map(|(dir, up)| Mat4::look_at_rh(Vec3::ZERO, dir, up))
}

/// 90 degree square projection shared by all faces
pub fn cube_map_projection() -> Mat4 {
    Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0)
}

/// Camera transform for the main view
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransMats {
    /// projection * view
    pub vp: Mat4,
}

impl TransMats {
    pub fn new(view: Mat4, proj: Mat4) -> Self {
        Self { vp: proj * view }
    }
}

/// One point light, std140 (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    pub position: Vec4,
    pub color: Vec3,
    pub radius: f32,
}

/// Point light as configured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub radius: f32,
}

impl PointLight {
    pub fn to_gpu(&self) -> PointLightData {
        PointLightData {
            position: Vec3::from(self.position).extend(1.0),
            color: Vec3::from(self.color),
            radius: self.radius,
        }
    }
}

/// The two lights of the default scene
pub fn default_lights() -> Vec<PointLight> {
    vec![
        PointLight { position: [1.0, 2.0, 2.0], color: [4.0, 4.0, 4.0], radius: 5.0 },
        PointLight { position: [-0.5, 2.0, -2.0], color: [1.5, 1.5, 1.5], radius: 5.0 },
    ]
}

/// Lighting pass uniform: eye position followed by `light_count` lights
///
/// The array length is fixed by a specialization constant, so the region
/// holds exactly the lights in use.
pub struct LightingInfo;

impl LightingInfo {
    pub fn byte_size(light_count: usize) -> u64 {
        (std::mem::size_of::<Vec4>() + light_count * std::mem::size_of::<PointLightData>()) as u64
    }

    pub fn encode(eye_pos: Vec3, lights: &[PointLight]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::byte_size(lights.len()) as usize);
        bytes.extend_from_slice(bytemuck::bytes_of(&eye_pos.extend(1.0)));
        for light in lights {
            bytes.extend_from_slice(bytemuck::bytes_of(&light.to_gpu()));
        }
        bytes
    }
}

/// Debug view selection for the final output pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Final,
    Albedo,
    Normal,
    Position,
    Roughness,
    Metalness,
    AmbientOcclusion,
    Depth,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 8] = [
        DisplayMode::Final,
        DisplayMode::Albedo,
        DisplayMode::Normal,
        DisplayMode::Position,
        DisplayMode::Roughness,
        DisplayMode::Metalness,
        DisplayMode::AmbientOcclusion,
        DisplayMode::Depth,
    ];

    /// Value read by the final output shader
    pub fn as_shader_value(self) -> i32 {
        self as i32
    }

    /// Next mode, wrapping around
    pub fn next(self) -> Self {
        let index = self as usize;
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DisplayInfo {
    pub display_mode: i32,
    pub _padding: [i32; 3],
}

impl DisplayInfo {
    pub fn new(mode: DisplayMode) -> Self {
        Self { display_mode: mode.as_shader_value(), _padding: [0; 3] }
    }
}

/// World placement of one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl ModelTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Per-model uniform: model matrix and its inverse transpose for normals
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PerModel {
    pub model: Mat4,
    pub model_inv_trans: Mat4,
}

impl PerModel {
    pub fn from_transform(transform: &ModelTransform) -> Self {
        let model = transform.matrix();
        Self {
            model,
            model_inv_trans: model.inverse().transpose(),
        }
    }
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;
