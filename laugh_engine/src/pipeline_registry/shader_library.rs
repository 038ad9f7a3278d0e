/// Shader modules loaded once and shared between pipelines

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::asset::AssetLoader;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, Shader, ShaderDesc, ShaderStage};

pub struct ShaderLibrary {
    shaders: FxHashMap<String, Arc<dyn Shader>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self { shaders: FxHashMap::default() }
    }

    /// Stage implied by the file name (`*.vert.spv`, `*.geom.spv`, ...)
    pub fn stage_of(name: &str) -> Result<ShaderStage> {
        let stem = name.strip_suffix(".spv").unwrap_or(name);
        match stem.rsplit('.').next() {
            Some("vert") => Ok(ShaderStage::Vertex),
            Some("geom") => Ok(ShaderStage::Geometry),
            Some("frag") => Ok(ShaderStage::Fragment),
            Some("comp") => Ok(ShaderStage::Compute),
            _ => Err(Error::InvalidResource(format!("cannot infer shader stage of '{}'", name))),
        }
    }

    /// Cached module for `name`, loading it on first use
    pub fn load(
        &mut self,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
        name: &str,
    ) -> Result<Arc<dyn Shader>> {
        if let Some(shader) = self.shaders.get(name) {
            return Ok(Arc::clone(shader));
        }
        let stage = Self::stage_of(name)?;
        let code = loader.load_shader(name)?;
        let shader = device.create_shader(ShaderDesc {
            name,
            code: &code,
            stage,
            entry_point: "main".to_string(),
        })?;
        self.shaders.insert(name.to_string(), Arc::clone(&shader));
        Ok(shader)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Release every module (pipelines keep their own references)
    pub fn clear(&mut self) {
        self.shaders.clear();
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}
