/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns its window surface. Images are exposed as non-owning textures so
/// the renderer can build color attachments on them. Must be dropped
/// before the `VulkanGraphicsDevice` it was created from.

use ash::vk;
use laugh_engine::laugh::render::{
    AcquireOutcome, PresentOutcome, Semaphore as RendererSemaphore, Swapchain as RendererSwapchain,
    Texture as RendererTexture, TextureFormat, TextureInfo, TextureKind, TextureUsage,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err, engine_error, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_to_texture_format;
use crate::vulkan_graphics_device::VulkanGraphicsDevice;
use crate::vulkan_sync::Semaphore;
use crate::vulkan_texture::Texture;

/// Vulkan swapchain implementation
pub struct Swapchain {
    ctx: Arc<GpuContext>,

    surface: vk::SurfaceKHR,

    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<Arc<Texture>>,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    extent: vk::Extent2D,
}

fn init_failed(what: &str, e: vk::Result) -> Error {
    engine_error!("laugh::vulkan", "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
            height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
        }
    }
}

fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

impl Swapchain {
    /// Create the surface for `window` and a swapchain on it
    pub fn new<W>(device: &VulkanGraphicsDevice, window: &W, width: u32, height: u32) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let ctx = device.context();

        let display_handle = window.display_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get display handle: {:?}", e)))?;
        let window_handle = window.window_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get window handle: {:?}", e)))?;

        let surface = unsafe {
            ash_window::create_surface(
                &ctx.entry,
                &ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("Failed to create surface", e))?
        };

        let supported = unsafe {
            ctx.surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.present.family, surface)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { ctx.surface_loader.destroy_surface(surface, None) };
            return Err(Error::InitializationFailed("Present queue cannot present to this surface".to_string()));
        }

        let surface_formats = match unsafe {
            ctx.surface_loader.get_physical_device_surface_formats(ctx.physical_device, surface)
        } {
            Ok(formats) if !formats.is_empty() => formats,
            Ok(_) => {
                unsafe { ctx.surface_loader.destroy_surface(surface, None) };
                return Err(Error::InitializationFailed("Surface reports no formats".to_string()));
            }
            Err(e) => {
                unsafe { ctx.surface_loader.destroy_surface(surface, None) };
                return Err(init_failed("Failed to get surface formats", e));
            }
        };

        let surface_format = surface_formats
            .iter()
            .find(|f| f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
            .copied()
            .unwrap_or(surface_formats[0]);
        let Some(format) = vk_to_texture_format(surface_format.format) else {
            unsafe { ctx.surface_loader.destroy_surface(surface, None) };
            return Err(Error::InitializationFailed(format!(
                "Unsupported surface format {:?}", surface_format.format
            )));
        };

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let mut swapchain = Self {
            ctx,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_loader,
            images: Vec::new(),
            surface_format,
            format,
            extent: vk::Extent2D { width, height },
        };
        // on failure Drop releases the surface
        swapchain.build(width, height)?;
        Ok(swapchain)
    }

    /// (Re)create the VkSwapchainKHR, retiring the current one
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = unsafe {
            self.ctx.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| init_failed("Failed to get surface capabilities", e))?
        };

        let extent = choose_extent(&capabilities, width, height);
        let old_swapchain = self.swapchain;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| init_failed("Failed to create swapchain", e))?
        };

        // Image wrappers of the retired swapchain go first
        self.images.clear();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = swapchain;
        self.extent = extent;

        let vk_images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| init_failed("Failed to get swapchain images", e))?
        };

        for (i, &image) in vk_images.iter().enumerate() {
            let info = TextureInfo {
                name: format!("swapchain_image_{}", i),
                width: extent.width,
                height: extent.height,
                format: self.format,
                usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSFER_DST,
                kind: TextureKind::Tex2D,
                mip_levels: 1,
            };
            self.images.push(Arc::new(Texture::from_swapchain_image(Arc::clone(&self.ctx), image, info)?));
        }

        engine_debug!("laugh::vulkan", "Swapchain ready: {}x{}, {} images, {:?}",
            extent.width, extent.height, self.images.len(), self.format);
        Ok(())
    }
}

fn semaphore_ref(semaphore: &dyn RendererSemaphore) -> &Semaphore {
    // SAFETY: semaphores handed to this backend were created by it
    unsafe { &*(semaphore as *const dyn RendererSemaphore as *const Semaphore) }
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self, signal: &dyn RendererSemaphore, timeout_ns: u64) -> Result<AcquireOutcome> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore_ref(signal).semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(engine_err!("laugh::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    fn present(&mut self, image_index: u32, waits: &[&dyn RendererSemaphore]) -> Result<PresentOutcome> {
        if image_index as usize >= self.images.len() {
            return Err(Error::InvalidResource(format!(
                "Present of image {} out of range (count: {})",
                image_index, self.images.len()
            )));
        }

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores: Vec<vk::Semaphore> = waits.iter().map(|s| semaphore_ref(*s).semaphore).collect();

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.ctx.present.queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(engine_err!("laugh::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            engine_warn!("laugh::vulkan", "Ignoring swapchain recreate to {}x{}", width, height);
            return Ok(());
        }

        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }
        self.build(width, height)
    }

    fn images(&self) -> Vec<Arc<dyn RendererTexture>> {
        self.images
            .iter()
            .map(|image| Arc::clone(image) as Arc<dyn RendererTexture>)
            .collect()
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            let _ = self.ctx.device.device_wait_idle();
            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
