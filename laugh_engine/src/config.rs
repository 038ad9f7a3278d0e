/// Renderer configuration loaded from TOML
///
/// Every field has a default so a partial (or empty) file is valid.
/// `validate()` runs at startup and rejects values the renderer cannot honor.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::log::LogSeverity;
use crate::uniforms::{default_lights, DisplayMode, PointLight, MAX_LIGHTS};

/// Window size requested at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// One model of the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name resolved by the asset loader (mesh + `<texture_root>/<name>/` maps)
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation around Y, in degrees
    #[serde(default = "default_model_yaw")]
    pub yaw_degrees: f32,
    #[serde(default = "default_model_scale")]
    pub scale: f32,
}

fn default_model_yaw() -> f32 {
    180.0
}

fn default_model_scale() -> f32 {
    1.0
}

impl ModelConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            position: [0.0; 3],
            yaw_degrees: default_model_yaw(),
            scale: default_model_scale(),
        }
    }
}

/// Environment probe files (radiance input + irradiance cache)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub probe_dir: PathBuf,
    pub unfiltered_name: String,
    pub specular_name: String,
    pub diffuse_name: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            probe_dir: PathBuf::from("../textures/Environment/PaperMill"),
            unfiltered_name: "Unfiltered_HDR.dds".to_string(),
            specular_name: "Specular_HDR.dds".to_string(),
            diffuse_name: "Diffuse_HDR.dds".to_string(),
        }
    }
}

impl EnvironmentConfig {
    pub fn unfiltered_path(&self) -> PathBuf {
        self.probe_dir.join(&self.unfiltered_name)
    }

    pub fn specular_path(&self) -> PathBuf {
        self.probe_dir.join(&self.specular_name)
    }

    pub fn diffuse_path(&self) -> PathBuf {
        self.probe_dir.join(&self.diffuse_name)
    }
}

/// Sizes of the precomputed artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecomputeConfig {
    /// BRDF LUT edge (multiple of the 16x16 compute block)
    pub brdf_lut_size: u32,
    pub diffuse_size: u32,
    pub specular_size: u32,
    /// One mip per roughness sample
    pub specular_mip_levels: u32,
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            brdf_lut_size: 256,
            diffuse_size: 32,
            specular_size: 512,
            specular_mip_levels: 10,
        }
    }
}

/// Top-level renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub app_name: String,
    /// Enable backend validation layers
    pub enable_validation: bool,
    pub window: WindowConfig,
    /// Minimum severity printed by the default logger
    pub log_level: LogSeverity,
    pub texture_root: PathBuf,
    pub shader_dir: PathBuf,
    pub models: Vec<ModelConfig>,
    pub environment: EnvironmentConfig,
    /// BRDF LUT cache file
    pub brdf_lut_path: PathBuf,
    pub lights: Vec<PointLight>,
    pub display_mode: DisplayMode,
    pub precompute: PrecomputeConfig,
    /// Capacity of the uniform blob in bytes
    pub uniform_blob_size: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Laugh Engine".to_string(),
            enable_validation: cfg!(debug_assertions),
            window: WindowConfig::default(),
            log_level: LogSeverity::Info,
            texture_root: PathBuf::from("../textures"),
            shader_dir: PathBuf::from("../shaders"),
            models: vec![ModelConfig::named("Cerberus")],
            environment: EnvironmentConfig::default(),
            brdf_lut_path: PathBuf::from("../textures/BRDF_LUTs/FSchlick_DGGX_GSmith.dds"),
            lights: default_lights(),
            display_mode: DisplayMode::Final,
            precompute: PrecomputeConfig::default(),
            uniform_blob_size: 64 * 1024,
        }
    }
}

impl RendererConfig {
    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RendererConfig =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid("window size must be non-zero"));
        }
        if self.models.is_empty() {
            return Err(invalid("at least one model is required"));
        }
        if let Some(model) = self.models.iter().find(|m| m.name.trim().is_empty()) {
            return Err(invalid(&format!("model with empty name at {:?}", model.position)));
        }
        if self.lights.is_empty() || self.lights.len() > MAX_LIGHTS {
            return Err(invalid(&format!(
                "light count {} outside 1..={}", self.lights.len(), MAX_LIGHTS
            )));
        }
        if self.lights.iter().any(|l| !(l.radius > 0.0)) {
            return Err(invalid("light radius must be positive"));
        }

        let p = &self.precompute;
        if p.brdf_lut_size == 0 || p.brdf_lut_size % 16 != 0 {
            return Err(invalid(&format!(
                "brdf_lut_size {} must be a non-zero multiple of 16", p.brdf_lut_size
            )));
        }
        if p.diffuse_size == 0 || p.specular_size == 0 {
            return Err(invalid("irradiance map sizes must be non-zero"));
        }
        let max_mips = 32 - p.specular_size.leading_zeros();
        if p.specular_mip_levels == 0 || p.specular_mip_levels > max_mips {
            return Err(invalid(&format!(
                "specular_mip_levels {} outside 1..={} for size {}",
                p.specular_mip_levels, max_mips, p.specular_size
            )));
        }

        if self.uniform_blob_size < 1024 {
            return Err(invalid("uniform_blob_size must be at least 1 KiB"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidConfig(msg.to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
