/// Asset loading seam
///
/// Mesh, texture and shader file formats are not parsed here: an
/// [`AssetLoader`] hands the renderer decoded CPU-side data, and this module
/// uploads it to the device.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};

use crate::config::EnvironmentConfig;
use crate::descriptor_binder::MaterialMaps;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferFormat, BufferUsage, GraphicsDevice, Texture, TextureDesc, TextureKind,
    VertexAttribute, VertexBinding, VertexLayout,
};

/// Vertex of every mesh (models and the skybox)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
            }],
            attributes: vec![
                VertexAttribute { location: 0, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 12 },
                VertexAttribute { location: 2, binding: 0, format: BufferFormat::R32G32_SFLOAT, offset: 24 },
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Decoded model: mesh, material id and its maps
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub mesh: MeshData,
    /// Shading model selector pushed to the geometry shader
    pub material_id: u32,
    pub albedo: TextureDesc,
    pub normal: TextureDesc,
    pub roughness: TextureDesc,
    pub metalness: TextureDesc,
    pub ao: Option<TextureDesc>,
}

/// Decoded environment probe
#[derive(Debug, Clone)]
pub struct EnvironmentData {
    /// Mesh drawn for the sky and for cube-map prefiltering
    pub skybox: MeshData,
    /// Unfiltered HDR radiance cube map
    pub radiance: TextureDesc,
    /// Material type pushed to the skybox shader
    pub material_type: u32,
}

/// Source of decoded assets and SPIR-V
pub trait AssetLoader {
    fn load_model(&self, name: &str) -> Result<ModelData>;

    fn load_environment(&self, probe: &EnvironmentConfig) -> Result<EnvironmentData>;

    /// SPIR-V bytecode of a shader, by path relative to the shader directory
    fn load_shader(&self, name: &str) -> Result<Vec<u8>>;
}

/// Mesh uploaded to device-local vertex and index buffers
pub struct GpuMesh {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &mut dyn GraphicsDevice, name: &str, mesh: &MeshData) -> Result<Self> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(Error::InvalidResource(format!("mesh '{}' is empty", name)));
        }
        if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= mesh.vertices.len()) {
            return Err(Error::InvalidResource(format!(
                "mesh '{}': index {} out of range ({} vertices)", name, bad, mesh.vertices.len()
            )));
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);

        let vertex_buffer = device.create_buffer(BufferDesc {
            name: format!("{}_vertices", name),
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::Vertex,
            data: Some(vertex_bytes.to_vec()),
        })?;
        let index_buffer = device.create_buffer(BufferDesc {
            name: format!("{}_indices", name),
            size: index_bytes.len() as u64,
            usage: BufferUsage::Index,
            data: Some(index_bytes.to_vec()),
        })?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        })
    }
}

/// Model resident on the device
pub struct GpuModel {
    pub name: String,
    pub mesh: GpuMesh,
    pub material_id: u32,
    pub albedo: Arc<dyn Texture>,
    pub normal: Arc<dyn Texture>,
    pub roughness: Arc<dyn Texture>,
    pub metalness: Arc<dyn Texture>,
    pub ao: Option<Arc<dyn Texture>>,
}

impl GpuModel {
    pub fn upload(device: &mut dyn GraphicsDevice, data: ModelData) -> Result<Self> {
        let mesh = GpuMesh::upload(device, &data.name, &data.mesh)?;
        let ao = match data.ao {
            Some(desc) => Some(device.create_texture(desc)?),
            None => None,
        };
        Ok(Self {
            mesh,
            material_id: data.material_id,
            albedo: device.create_texture(data.albedo)?,
            normal: device.create_texture(data.normal)?,
            roughness: device.create_texture(data.roughness)?,
            metalness: device.create_texture(data.metalness)?,
            ao,
            name: data.name,
        })
    }

    pub fn has_ao_map(&self) -> bool {
        self.ao.is_some()
    }

    pub fn material_maps(&self) -> MaterialMaps<'_> {
        MaterialMaps {
            albedo: self.albedo.as_ref(),
            normal: self.normal.as_ref(),
            roughness: self.roughness.as_ref(),
            metalness: self.metalness.as_ref(),
            ao: self.ao.as_deref(),
        }
    }
}

/// Skybox mesh and radiance map resident on the device
pub struct GpuEnvironment {
    pub mesh: GpuMesh,
    pub radiance: Arc<dyn Texture>,
    pub material_type: u32,
}

impl GpuEnvironment {
    pub fn upload(device: &mut dyn GraphicsDevice, data: EnvironmentData) -> Result<Self> {
        if data.radiance.kind != TextureKind::Cube {
            return Err(Error::InvalidResource("radiance map must be a cube map".to_string()));
        }
        Ok(Self {
            mesh: GpuMesh::upload(device, "skybox", &data.skybox)?,
            radiance: device.create_texture(data.radiance)?,
            material_type: data.material_type,
        })
    }
}

#[cfg(test)]
#[path = "asset_tests.rs"]
mod tests;
