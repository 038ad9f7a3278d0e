/// In-memory asset loader for unit tests
///
/// Produces tiny meshes and 4x4 textures; records every shader request.

use std::sync::Mutex;
use crate::asset::{AssetLoader, EnvironmentData, MeshData, ModelData, Vertex};
use crate::config::EnvironmentConfig;
use crate::engine_bail;
use crate::error::Result;
use crate::graphics_device::{TextureDesc, TextureFormat, TextureKind, TextureUsage};

pub struct MockAssetLoader {
    /// Models that come without an AO map
    pub models_without_ao: Vec<String>,
    /// Names that fail to load
    pub missing: Vec<String>,
    pub shader_requests: Mutex<Vec<String>>,
}

impl MockAssetLoader {
    pub fn new() -> Self {
        Self {
            models_without_ao: Vec::new(),
            missing: Vec::new(),
            shader_requests: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MockAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Unit cube, 8 vertices and 36 indices
pub fn cube_mesh() -> MeshData {
    let mut vertices = Vec::with_capacity(8);
    for i in 0..8u32 {
        let p = [
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        ];
        vertices.push(Vertex { position: p, normal: p, uv: [0.0, 0.0] });
    }
    let indices = vec![
        0, 1, 3, 0, 3, 2, 4, 6, 7, 4, 7, 5, 0, 4, 5, 0, 5, 1,
        2, 3, 7, 2, 7, 6, 0, 2, 6, 0, 6, 4, 1, 5, 7, 1, 7, 3,
    ];
    MeshData { vertices, indices }
}

fn map(name: &str) -> TextureDesc {
    TextureDesc {
        name: name.to_string(),
        width: 4,
        height: 4,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
        kind: TextureKind::Tex2D,
        mip_levels: 1,
        data: Some(vec![128; 64]),
    }
}

impl AssetLoader for MockAssetLoader {
    fn load_model(&self, name: &str) -> Result<ModelData> {
        if self.missing.iter().any(|m| m == name) {
            engine_bail!("laugh::mock", "model '{}' not found", name);
        }
        let ao = if self.models_without_ao.iter().any(|m| m == name) {
            None
        } else {
            Some(map(&format!("{}_ao", name)))
        };
        Ok(ModelData {
            name: name.to_string(),
            mesh: cube_mesh(),
            material_id: 1,
            albedo: map(&format!("{}_albedo", name)),
            normal: map(&format!("{}_normal", name)),
            roughness: map(&format!("{}_roughness", name)),
            metalness: map(&format!("{}_metalness", name)),
            ao,
        })
    }

    fn load_environment(&self, _probe: &EnvironmentConfig) -> Result<EnvironmentData> {
        Ok(EnvironmentData {
            skybox: cube_mesh(),
            radiance: TextureDesc {
                name: "radiance".to_string(),
                width: 8,
                height: 8,
                format: TextureFormat::R32G32B32A32_SFLOAT,
                usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
                kind: TextureKind::Cube,
                mip_levels: 1,
                data: Some(vec![0; 8 * 8 * 16 * 6]),
            },
            material_type: 0,
        })
    }

    fn load_shader(&self, name: &str) -> Result<Vec<u8>> {
        if self.missing.iter().any(|m| m == name) {
            engine_bail!("laugh::mock", "shader '{}' not found", name);
        }
        self.shader_requests.lock().unwrap().push(name.to_string());
        // SPIR-V magic number
        Ok(0x0723_0203u32.to_le_bytes().to_vec())
    }
}
