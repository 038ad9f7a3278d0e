/// On-disk cache of the precomputed lighting artifacts

use std::path::{Path, PathBuf};

use crate::config::RendererConfig;
use crate::error::Result;
use crate::graphics_device::{TextureFormat, TextureInfo, TextureKind, TextureUsage};
use crate::pass_graph::{BRDF_LUT_FORMAT, IRRADIANCE_FORMAT};
use crate::{engine_debug, engine_warn};
use super::dds::{self, DdsImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    BrdfLut,
    DiffuseIrradiance,
    SpecularIrradiance,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::BrdfLut,
        ArtifactKind::DiffuseIrradiance,
        ArtifactKind::SpecularIrradiance,
    ];

    /// Texture name on the device
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::BrdfLut => "brdf_lut",
            ArtifactKind::DiffuseIrradiance => "diffuse_irradiance",
            ArtifactKind::SpecularIrradiance => "specular_irradiance",
        }
    }

    pub fn format(self) -> TextureFormat {
        match self {
            ArtifactKind::BrdfLut => BRDF_LUT_FORMAT,
            _ => IRRADIANCE_FORMAT,
        }
    }

    /// Usage of the device texture, whether computed or loaded
    pub fn usage(self) -> TextureUsage {
        let common = TextureUsage::SAMPLED | TextureUsage::TRANSFER_SRC | TextureUsage::TRANSFER_DST;
        match self {
            ArtifactKind::BrdfLut => common | TextureUsage::STORAGE,
            _ => common | TextureUsage::COLOR_ATTACHMENT,
        }
    }
}

/// Cache file locations and expected texture shapes
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    brdf_lut: (PathBuf, TextureInfo),
    diffuse: (PathBuf, TextureInfo),
    specular: (PathBuf, TextureInfo),
}

fn shape(kind: ArtifactKind, size: u32, texture_kind: TextureKind, mip_levels: u32) -> TextureInfo {
    TextureInfo {
        name: kind.name().to_string(),
        width: size,
        height: size,
        format: kind.format(),
        usage: kind.usage(),
        kind: texture_kind,
        mip_levels,
    }
}

impl ArtifactCache {
    pub fn from_config(config: &RendererConfig) -> Self {
        let sizes = &config.precompute;
        Self {
            brdf_lut: (
                config.brdf_lut_path.clone(),
                shape(ArtifactKind::BrdfLut, sizes.brdf_lut_size, TextureKind::Tex2D, 1),
            ),
            diffuse: (
                config.environment.diffuse_path(),
                shape(ArtifactKind::DiffuseIrradiance, sizes.diffuse_size, TextureKind::Cube, 1),
            ),
            specular: (
                config.environment.specular_path(),
                shape(ArtifactKind::SpecularIrradiance, sizes.specular_size, TextureKind::Cube, sizes.specular_mip_levels),
            ),
        }
    }

    fn entry(&self, kind: ArtifactKind) -> &(PathBuf, TextureInfo) {
        match kind {
            ArtifactKind::BrdfLut => &self.brdf_lut,
            ArtifactKind::DiffuseIrradiance => &self.diffuse,
            ArtifactKind::SpecularIrradiance => &self.specular,
        }
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        &self.entry(kind).0
    }

    /// Shape the artifact must have, in the cache and on the device
    pub fn expected(&self, kind: ArtifactKind) -> &TextureInfo {
        &self.entry(kind).1
    }

    /// Cached image, if present and of the expected shape
    ///
    /// A missing file is the normal compute path. A file that cannot be
    /// decoded or has the wrong shape is reported and ignored.
    pub fn load(&self, kind: ArtifactKind) -> Option<DdsImage> {
        let (path, expected) = self.entry(kind);
        if !path.is_file() {
            engine_debug!("laugh::precompute", "No cached {} at {}", kind.name(), path.display());
            return None;
        }
        match dds::read_file(path) {
            Ok(image) if image.matches(expected) => Some(image),
            Ok(image) => {
                engine_warn!("laugh::precompute",
                    "Ignoring cached {} at {}: {}x{} {:?} {:?} with {} mip(s), expected {}x{} {:?} {:?} with {}",
                    kind.name(), path.display(), image.width, image.height, image.format, image.kind,
                    image.mip_levels, expected.width, expected.height, expected.format, expected.kind,
                    expected.mip_levels);
                None
            }
            Err(err) => {
                engine_warn!("laugh::precompute", "Ignoring cached {} at {}: {}", kind.name(), path.display(), err);
                None
            }
        }
    }

    /// Write `data` for `kind`, returning the file path
    pub fn store(&self, kind: ArtifactKind, data: &[u8]) -> Result<PathBuf> {
        let (path, expected) = self.entry(kind);
        dds::write_file(path, expected, data)?;
        Ok(path.clone())
    }
}
