/// Graphics device module - backend-agnostic GPU types and traits

pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod command_list;
pub mod render_pass;
pub mod frame_buffer;
pub mod descriptor;
pub mod sync;
pub mod swapchain;

pub use graphics_device::*;
pub use texture::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use command_list::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use descriptor::*;
pub use sync::*;
pub use swapchain::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
