/// Shader - Vulkan implementation of the Shader trait
///
/// SPIR-V modules are reflected with spirq at creation: the entry point must
/// exist, and the declared descriptor bindings and push constant size are
/// kept for pipeline layout checks.

use ash::vk;
use laugh_engine::laugh::render::{Shader as RendererShader, ShaderDesc, ShaderStage};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err, engine_error};
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// What a module declares, as seen by reflection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ShaderInterface {
    /// (set, binding) of every descriptor the entry point references
    pub bindings: Vec<(u32, u32)>,
    /// Largest push constant block, in bytes
    pub push_constant_size: Option<u32>,
}

/// Vulkan shader implementation
pub struct Shader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) entry_point: CString,
    pub(crate) interface: ShaderInterface,
    pub(crate) stage: ShaderStage,
    pub(crate) name: String,
}

/// Reinterpret SPIR-V bytes as little-endian words
pub(crate) fn spirv_words(name: &str, code: &[u8]) -> Result<Vec<u32>> {
    if code.is_empty() || code.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "Shader '{}': SPIR-V size {} is not a non-zero multiple of 4",
            name, code.len()
        )));
    }
    Ok(code
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

/// Reflect `entry_point` out of a SPIR-V module
pub(crate) fn reflect_interface(name: &str, words: &[u32], entry_point: &str) -> Result<ShaderInterface> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("laugh::vulkan", "SPIR-V reflection of '{}' failed: {:?}", name, e))?;

    let entry = entry_points
        .iter()
        .find(|ep| ep.name == entry_point)
        .ok_or_else(|| {
            engine_error!("laugh::vulkan", "Shader '{}' has no entry point '{}'", name, entry_point);
            Error::InvalidResource(format!("Shader '{}' has no entry point '{}'", name, entry_point))
        })?;

    let mut interface = ShaderInterface::default();
    for var in entry.vars.iter() {
        match var {
            spirq::var::Variable::Descriptor { desc_bind, .. } => {
                interface.bindings.push((desc_bind.set(), desc_bind.bind()));
            }
            spirq::var::Variable::PushConstant { ty, .. } => {
                let size = ty.nbyte().map(|s| s as u32);
                interface.push_constant_size = interface.push_constant_size.max(size);
            }
            _ => {}
        }
    }
    interface.bindings.sort_unstable();
    interface.bindings.dedup();
    Ok(interface)
}

impl Shader {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: ShaderDesc) -> Result<Self> {
        let words = spirv_words(desc.name, desc.code)?;
        let interface = reflect_interface(desc.name, &words, &desc.entry_point)?;
        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|_| Error::InvalidResource(format!("Shader '{}': entry point contains NUL", desc.name)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            ctx.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create shader module '{}': {:?}", desc.name, e))?
        };

        engine_debug!("laugh::vulkan", "Created shader '{}' ({:?}, {} bindings)",
            desc.name, desc.stage, interface.bindings.len());

        Ok(Self {
            ctx,
            module,
            entry_point,
            interface,
            stage: desc.stage,
            name: desc.name.to_string(),
        })
    }
}

impl RendererShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
