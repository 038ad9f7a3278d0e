/*!
# Laugh Engine - Vulkan Backend

Vulkan implementation of the `laugh_engine` graphics device layer.

This crate implements the `GraphicsDevice` and `Swapchain` traits (and every
resource trait behind them) with `ash` for the Vulkan bindings, `gpu-allocator`
for memory management and `ash-window` / `raw-window-handle` for surface creation.

```no_run
use laugh_engine::laugh::{DeferredRenderer, RendererConfig, RendererCore};
use laugh_engine_renderer_vulkan::laugh::{VulkanConfig, VulkanGraphicsDevice, VulkanSwapchain};
# fn run(window: &winit::window::Window, loader: Box<dyn laugh_engine::laugh::asset::AssetLoader>) -> laugh_engine::laugh::Result<()> {
let config = RendererConfig::load("laugh.toml")?;
let mut device = VulkanGraphicsDevice::new(window, VulkanConfig::from_renderer_config(&config))?;
let mut swapchain = VulkanSwapchain::new(&device, window, config.window.width, config.window.height)?;
let mut renderer = DeferredRenderer::new(config, loader)?;
renderer.init_resources(&mut device, &mut swapchain)?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_context;
mod vulkan_format;
mod vulkan_texture;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_descriptor_set;
mod vulkan_sampler;
mod vulkan_sync;
mod vulkan_command_list;
mod vulkan_swapchain;
mod vulkan_graphics_device;

// Main laugh namespace module
pub mod laugh {
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;
    pub use crate::debug::{DebugOutput, DebugSeverity, ValidationStats, VulkanConfig};

    // Validation layer statistics
    pub use crate::debug::{get_validation_stats, print_validation_stats_report};
}
