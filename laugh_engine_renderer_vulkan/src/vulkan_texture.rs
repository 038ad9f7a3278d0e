/// Texture - Vulkan implementation of the Texture trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use laugh_engine::laugh::render::{
    subresource_layout, Texture as RendererTexture, TextureDesc, TextureInfo, TextureKind,
};
use laugh_engine::laugh::{Error, Result};
use laugh_engine::{engine_debug, engine_err, engine_error};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{full_aspect_mask, sampled_aspect_mask, texture_format_to_vk, texture_usage_to_vk};

/// Vulkan texture implementation
///
/// Either an allocated image (with its memory) or a borrowed swapchain image.
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    /// View over every mip and layer (CUBE for cube maps), used for sampling
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    /// False for swapchain images (destroyed with the swapchain)
    owns_image: bool,
    info: TextureInfo,
}

impl Texture {
    /// Create the image, its memory and its view, then upload `desc.data` if any
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: TextureDesc) -> Result<Self> {
        let info = TextureInfo::from(&desc);

        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' has an empty extent or no mip levels ({}x{}, {} mips)",
                desc.name, desc.width, desc.height, desc.mip_levels
            )));
        }
        if let Some(data) = &desc.data {
            if data.len() as u64 != info.byte_size() {
                return Err(Error::InvalidResource(format!(
                    "Texture '{}' data is {} bytes, expected {}",
                    desc.name, data.len(), info.byte_size()
                )));
            }
        }

        let format = texture_format_to_vk(desc.format);
        let mut usage = texture_usage_to_vk(desc.usage);
        if desc.data.is_some() {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        let flags = match desc.kind {
            TextureKind::Tex2D => vk::ImageCreateFlags::empty(),
            TextureKind::Cube => vk::ImageCreateFlags::CUBE_COMPATIBLE,
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(desc.mip_levels)
                .array_layers(info.array_layers())
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create image '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate(&desc.name, requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                return Err(engine_err!("laugh::vulkan", "Failed to bind memory of image '{}': {:?}", desc.name, e));
            }

            // From here on, Drop releases whatever was created
            let mut texture = Self {
                ctx: Arc::clone(&ctx),
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                owns_image: true,
                info,
            };

            texture.view = texture.create_view(
                0,
                desc.mip_levels,
                0,
                texture.info.array_layers(),
                texture.full_view_type(),
                sampled_aspect_mask(desc.format),
            )?;

            if let Some(data) = &desc.data {
                texture.upload(data)?;
            }

            engine_debug!("laugh::vulkan", "Created texture '{}' ({}x{}, {:?}, {} mips, {} layers)",
                texture.info.name, desc.width, desc.height, desc.format, desc.mip_levels, texture.info.array_layers());

            Ok(texture)
        }
    }

    /// Wrap a swapchain image (the image itself stays owned by the swapchain)
    pub(crate) fn from_swapchain_image(ctx: Arc<GpuContext>, image: vk::Image, info: TextureInfo) -> Result<Self> {
        let mut texture = Self {
            ctx,
            image,
            view: vk::ImageView::null(),
            allocation: None,
            owns_image: false,
            info,
        };
        texture.view = texture.create_view(0, 1, 0, 1, vk::ImageViewType::TYPE_2D, vk::ImageAspectFlags::COLOR)?;
        Ok(texture)
    }

    fn full_view_type(&self) -> vk::ImageViewType {
        match self.info.kind {
            TextureKind::Tex2D => vk::ImageViewType::TYPE_2D,
            TextureKind::Cube => vk::ImageViewType::CUBE,
        }
    }

    /// Create an additional view over a mip/layer range (caller destroys it)
    pub(crate) fn create_view(
        &self,
        base_mip_level: u32,
        level_count: u32,
        base_array_layer: u32,
        layer_count: u32,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(texture_format_to_vk(self.info.format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level,
                level_count,
                base_array_layer,
                layer_count,
            });

        unsafe {
            self.ctx.device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("laugh::vulkan", "Failed to create view of '{}': {:?}", self.info.name, e))
        }
    }

    /// Copy every subresource from a staging buffer; ends in SHADER_READ_ONLY
    fn upload(&self, data: &[u8]) -> Result<()> {
        let (staging, staging_allocation) = self.ctx.create_staging_buffer("texture_staging", data)?;

        let aspect_mask = full_aspect_mask(self.info.format);
        let range = vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: self.info.mip_levels,
            base_array_layer: 0,
            layer_count: self.info.array_layers(),
        };
        let regions: Vec<vk::BufferImageCopy> = subresource_layout(&self.info)
            .iter()
            .map(|r| {
                vk::BufferImageCopy::default()
                    .buffer_offset(r.offset)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask,
                        mip_level: r.mip_level,
                        base_array_layer: r.layer,
                        layer_count: 1,
                    })
                    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                    .image_extent(vk::Extent3D { width: r.width, height: r.height, depth: 1 })
            })
            .collect();

        let image = self.image;
        let result = self.ctx.one_time_submit(|device, command_buffer| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &regions,
            );

            let to_shader_read = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader_read],
            );
        });

        // The upload waited for the queue: staging memory is free to go
        self.ctx.free(staging_allocation);
        unsafe { self.ctx.device.destroy_buffer(staging, None) };

        result.map_err(|e| {
            engine_error!("laugh::vulkan", "Upload of texture '{}' failed", self.info.name);
            e
        })
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            if self.owns_image {
                if let Some(allocation) = self.allocation.take() {
                    self.ctx.free(allocation);
                }
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
