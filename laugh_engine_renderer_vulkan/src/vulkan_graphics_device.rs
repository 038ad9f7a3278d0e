/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Creates the instance, picks the physical device and queues, and owns
/// the shared `GpuContext`. Every resource it hands out keeps a clone of
/// that context. The swapchain and all resources must be dropped before
/// the device, otherwise the VkDevice is leaked rather than destroyed
/// under live objects.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use laugh_engine::laugh::render::{
    Buffer as RendererBuffer, BufferDesc, CommandList as RendererCommandList, ComputePipelineDesc,
    DescriptorPool as RendererDescriptorPool, DescriptorPoolSizes, DescriptorResource,
    DescriptorSet as RendererDescriptorSet, DescriptorSetLayout as RendererDescriptorSetLayout,
    DescriptorSetLayoutDesc, DeviceLimits, Fence as RendererFence, Framebuffer as RendererFramebuffer,
    FramebufferDesc, GraphicsDevice, GraphicsPipelineDesc, Pipeline as RendererPipeline, QueueKind,
    RenderPass as RendererRenderPass, RenderPassDesc, RenderTarget as RendererRenderTarget,
    RenderTargetDesc, Semaphore as RendererSemaphore, Shader as RendererShader, ShaderDesc,
    SubmitBatch, Texture as RendererTexture, TextureDesc, TextureFormat,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_err, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::debug::{CallbackConfig, VulkanConfig};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{GpuContext, QueueInfo};
use crate::vulkan_descriptor_set::{write_descriptor_set, DescriptorPool, DescriptorSetLayout};
use crate::vulkan_format::{pipeline_stages_to_vk, texture_format_to_vk};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_render_target::RenderTarget;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_sync::{Fence, Semaphore};
use crate::vulkan_texture::Texture;

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    /// Samplers referenced by descriptor writes
    sampler_cache: Mutex<SamplerCache>,
}

fn init_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!("laugh::vulkan", "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

fn missing(what: &str) -> Error {
    engine_error!("laugh::vulkan", "{}", what);
    Error::InitializationFailed(what.to_string())
}

/// First family with GRAPHICS, then a compute-only family if one exists
fn select_queue_families(families: &[vk::QueueFamilyProperties]) -> Option<(u32, u32)> {
    let graphics = families
        .iter()
        .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;
    let compute = families
        .iter()
        .position(|qf| {
            qf.queue_flags.contains(vk::QueueFlags::COMPUTE) && !qf.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|i| i as u32)
        .unwrap_or(graphics);
    Some((graphics, compute))
}

fn validation_layer_available(entry: &ash::Entry) -> bool {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    layers
        .iter()
        .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
}

impl VulkanGraphicsDevice {
    /// Create the device for `window`
    ///
    /// A temporary surface is used to select the present queue; the
    /// swapchain creates its own.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: VulkanConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| Error::InvalidConfig("app_name contains a NUL byte".to_string()))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Laugh Engine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Required extensions
            let display_handle = window.display_handle()
                .map_err(|e| init_failed("Failed to get display handle", e))?;
            let mut extension_names: Vec<*const c_char> = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("Failed to get required extensions", e))?
                .to_vec();

            let mut enable_validation = config.validation_active();
            if enable_validation && !validation_layer_available(&entry) {
                engine_warn!("laugh::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
                enable_validation = false;
            }
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if enable_validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;

            // Debug messenger
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config(CallbackConfig::from(&config));

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(config.debug_severity.to_vk())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        crate::debug::cleanup_debug_config();
                        instance.destroy_instance(None);
                        return Err(init_failed("Failed to create debug messenger", e));
                    }
                }
            } else {
                (None, None)
            };

            let result = Self::create_device(&entry, &instance, window, display_handle.as_raw());
            let (physical_device, device, families, surface_loader) = match result {
                Ok(parts) => parts,
                Err(e) => {
                    if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                        loader.destroy_debug_utils_messenger(messenger, None);
                    }
                    crate::debug::cleanup_debug_config();
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };
            let (graphics_family, compute_family, present_family) = families;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties.device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "<unknown>".to_string());

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

            // Upload command pool (TRANSIENT + RESET for reusable one-shot uploads)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| init_failed("Failed to create upload command pool", e))?;

            let ctx = Arc::new(GpuContext {
                graphics: QueueInfo { queue: device.get_device_queue(graphics_family, 0), family: graphics_family },
                compute: QueueInfo { queue: device.get_device_queue(compute_family, 0), family: compute_family },
                present: QueueInfo { queue: device.get_device_queue(present_family, 0), family: present_family },
                entry,
                instance,
                physical_device,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                surface_loader,
                limits: properties.limits,
                upload_command_pool: Mutex::new(upload_command_pool),
                debug_utils_loader,
                debug_messenger,
            });

            engine_info!("laugh::vulkan", "Vulkan device '{}' ready (graphics {}, compute {}, present {}, validation {})",
                device_name, graphics_family, compute_family, present_family,
                if enable_validation { "on" } else { "off" });

            Ok(Self {
                sampler_cache: Mutex::new(SamplerCache::new(Arc::clone(&ctx))),
                ctx,
            })
        }
    }

    /// Pick the physical device and queue families, create the logical device
    fn create_device<W: HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
        display_handle: raw_window_handle::RawDisplayHandle,
    ) -> Result<(vk::PhysicalDevice, ash::Device, (u32, u32, u32), ash::khr::surface::Instance)> {
        unsafe {
            let window_handle = window.window_handle()
                .map_err(|e| init_failed("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(entry, instance, display_handle, window_handle.as_raw(), None)
                .map_err(|e| init_failed("Failed to create surface", e))?;
            let surface_loader = ash::khr::surface::Instance::new(entry, instance);

            let picked = (|| {
                let physical_device = instance
                    .enumerate_physical_devices()
                    .map_err(|e| init_failed("Failed to enumerate physical devices", e))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("No Vulkan-capable GPU found"))?;

                let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
                let (graphics, compute) = select_queue_families(&queue_families)
                    .ok_or_else(|| missing("No graphics queue family found"))?;

                let present = (0..queue_families.len() as u32)
                    .find(|&i| {
                        surface_loader
                            .get_physical_device_surface_support(physical_device, i, surface)
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| missing("No present queue family found"))?;

                Ok::<_, Error>((physical_device, graphics, compute, present))
            })();

            // Temporary surface only served queue selection
            surface_loader.destroy_surface(surface, None);
            let (physical_device, graphics, compute, present) = picked?;

            let mut unique_families = vec![graphics, compute, present];
            unique_families.sort_unstable();
            unique_families.dedup();

            let queue_priorities = [1.0];
            let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
                .iter()
                .map(|&family| {
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(family)
                        .queue_priorities(&queue_priorities)
                })
                .collect();

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(true)
                .geometry_shader(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed("Failed to create logical device", e))?;

            Ok((physical_device, device, (graphics, compute, present), surface_loader))
        }
    }

    /// Shared context, for the swapchain
    pub(crate) fn context(&self) -> Arc<GpuContext> {
        Arc::clone(&self.ctx)
    }

    fn queue(&self, kind: QueueKind) -> vk::Queue {
        match kind {
            QueueKind::Graphics => self.ctx.graphics.queue,
            QueueKind::Compute => self.ctx.compute.queue,
        }
    }
}

fn semaphore_handle(semaphore: &dyn RendererSemaphore) -> vk::Semaphore {
    // SAFETY: semaphores handed to this backend were created by it
    unsafe { (*(semaphore as *const dyn RendererSemaphore as *const Semaphore)).semaphore }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(Texture::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        Ok(Arc::new(Buffer::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        Ok(Arc::new(Shader::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        Ok(Arc::new(RenderPass::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Arc<dyn RendererRenderTarget>> {
        Ok(Arc::new(RenderTarget::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        Ok(Arc::new(Framebuffer::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn RendererDescriptorSetLayout>> {
        Ok(Arc::new(DescriptorSetLayout::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        Ok(Arc::new(Pipeline::create_graphics(Arc::clone(&self.ctx), desc)?))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        Ok(Arc::new(Pipeline::create_compute(Arc::clone(&self.ctx), desc)?))
    }

    fn create_descriptor_pool(&mut self, sizes: &DescriptorPoolSizes) -> Result<Box<dyn RendererDescriptorPool>> {
        Ok(Box::new(DescriptorPool::create(Arc::clone(&self.ctx), sizes)?))
    }

    fn update_descriptor_set(
        &self,
        set: &Arc<dyn RendererDescriptorSet>,
        binding: u32,
        resources: &[DescriptorResource],
    ) -> Result<()> {
        let mut samplers = self.sampler_cache
            .lock()
            .map_err(|_| engine_err!("laugh::vulkan", "Sampler cache lock poisoned"))?;
        write_descriptor_set(&self.ctx, &mut samplers, set, binding, resources)
    }

    fn create_command_list(&mut self, queue: QueueKind, name: &str) -> Result<Box<dyn RendererCommandList>> {
        Ok(Box::new(CommandList::new(Arc::clone(&self.ctx), queue, name)?))
    }

    fn create_semaphore(&mut self, name: &str) -> Result<Arc<dyn RendererSemaphore>> {
        Ok(Arc::new(Semaphore::new(Arc::clone(&self.ctx), name)?))
    }

    fn create_fence(&mut self, name: &str, signaled: bool) -> Result<Arc<dyn RendererFence>> {
        Ok(Arc::new(Fence::new(Arc::clone(&self.ctx), name, signaled)?))
    }

    fn submit(&self, queue: QueueKind, batches: &[SubmitBatch], fence: Option<&dyn RendererFence>) -> Result<()> {
        // Handle arrays first, then the SubmitInfos pointing at them
        let mut handles = Vec::with_capacity(batches.len());
        for batch in batches {
            if let Some(wrong) = batch.command_lists.iter().find(|cmd| cmd.queue() != queue) {
                return Err(Error::InvalidResource(format!(
                    "Command list '{}' recorded for {:?} submitted to {:?}",
                    wrong.name(), wrong.queue(), queue
                )));
            }

            let wait_semaphores: Vec<vk::Semaphore> = batch.waits.iter().map(|(s, _)| semaphore_handle(*s)).collect();
            let wait_stages: Vec<vk::PipelineStageFlags> = batch.waits.iter().map(|(_, stages)| pipeline_stages_to_vk(*stages)).collect();
            let command_buffers: Vec<vk::CommandBuffer> = batch.command_lists
                .iter()
                .map(|cmd| {
                    // SAFETY: command lists handed to this backend were created by it
                    unsafe { (*(*cmd as *const dyn RendererCommandList as *const CommandList)).command_buffer }
                })
                .collect();
            let signal_semaphores: Vec<vk::Semaphore> = batch.signals.iter().map(|s| semaphore_handle(*s)).collect();
            handles.push((wait_semaphores, wait_stages, command_buffers, signal_semaphores));
        }

        let submit_infos: Vec<vk::SubmitInfo> = handles
            .iter()
            .map(|(waits, stages, commands, signals)| {
                vk::SubmitInfo::default()
                    .wait_semaphores(waits)
                    .wait_dst_stage_mask(stages)
                    .command_buffers(commands)
                    .signal_semaphores(signals)
            })
            .collect();

        let vk_fence = fence
            .map(|f| {
                // SAFETY: fences handed to this backend were created by it
                unsafe { (*(f as *const dyn RendererFence as *const Fence)).fence }
            })
            .unwrap_or(vk::Fence::null());

        unsafe {
            self.ctx.device
                .queue_submit(self.queue(queue), &submit_infos, vk_fence)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to submit to {:?} queue: {:?}", queue, e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            min_uniform_buffer_offset_alignment: self.ctx.limits.min_uniform_buffer_offset_alignment,
            max_push_constants_size: self.ctx.limits.max_push_constants_size,
        }
    }

    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Option<TextureFormat> {
        candidates.iter().copied().find(|&format| {
            let properties = unsafe {
                self.ctx.instance
                    .get_physical_device_format_properties(self.ctx.physical_device, texture_format_to_vk(format))
            };
            format.is_depth()
                && properties.optimal_tiling_features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.ctx.device.device_wait_idle().ok();

            // 1. Samplers go first and release their context clone
            match self.sampler_cache.get_mut() {
                Ok(cache) => cache.shutdown(),
                Err(poisoned) => poisoned.into_inner().shutdown(),
            }

            // 2. Every other resource must be gone by now
            let alive = Arc::strong_count(&self.ctx) - 1;
            let Some(ctx) = Arc::get_mut(&mut self.ctx) else {
                engine_error!("laugh::vulkan",
                    "VulkanGraphicsDevice dropped while {} resources still alive; leaking the device", alive);
                return;
            };

            // 3. Upload command pool
            if let Ok(pool) = ctx.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    ctx.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 4. Allocator frees its VkDeviceMemory blocks before the device goes
            ManuallyDrop::drop(&mut ctx.allocator);

            // 5. No callbacks during destruction
            crate::debug::cleanup_debug_config();

            // 6. Debug messenger before the instance
            if let (Some(debug_utils), Some(messenger)) = (&ctx.debug_utils_loader, ctx.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 7. Device and instance
            ctx.device.destroy_device(None);
            ctx.instance.destroy_instance(None);
        }
    }
}
