/// Images - device-local 2D images with a view (textures and the depth buffer)

use ash::vk;
use std::sync::Arc;
use vu_render::vu::resource::{ImageData, TextureInfo};
use vu_render::vu::Result;
use vu_render::engine_err;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;

/// Sampled texture format: 8-bit RGBA, sRGB encoded
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

fn subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Single-mip 2D image in device-local memory, with its view
pub struct GpuImage {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    memory: vk::DeviceMemory,
    pub(crate) view: vk::ImageView,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl GpuImage {
    pub fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<Self> {
        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width, height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create {}x{} image: {:?}", width, height, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let memory = match ctx.allocate(&requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
                Ok(memory) => memory,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, memory, 0) {
                ctx.device.destroy_image(image, None);
                ctx.device.free_memory(memory, None);
                return Err(engine_err!("vu::vulkan", "Failed to bind image memory: {:?}", e));
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(subresource_range(aspect_mask));

            let view = match ctx.device.create_image_view(&view_create_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    ctx.device.free_memory(memory, None);
                    return Err(engine_err!("vu::vulkan", "Failed to create image view: {:?}", e));
                }
            };

            Ok(Self { ctx, image, memory, view, width, height })
        }
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            self.ctx.device.destroy_image(self.image, None);
            self.ctx.device.free_memory(self.memory, None);
        }
    }
}

/// Sampled RGBA8 texture
pub struct GpuTexture {
    pub(crate) image: GpuImage,
}

impl GpuTexture {
    /// Create the image and upload `data`
    pub fn new(ctx: Arc<GpuContext>, data: &ImageData) -> Result<Self> {
        let image = GpuImage::new(
            ctx,
            data.width,
            data.height,
            TEXTURE_FORMAT,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            vk::ImageAspectFlags::COLOR,
        )?;
        let texture = Self { image };
        texture.upload(data)?;
        Ok(texture)
    }

    pub fn info(&self) -> TextureInfo {
        TextureInfo { width: self.image.width, height: self.image.height }
    }

    pub(crate) fn view(&self) -> vk::ImageView {
        self.image.view
    }

    /// Replace the whole image with `data` (same dimensions)
    ///
    /// Layouts: UNDEFINED → TRANSFER_DST_OPTIMAL → copy → SHADER_READ_ONLY_OPTIMAL.
    /// Blocks until the copy has completed.
    pub fn upload(&self, data: &ImageData) -> Result<()> {
        let ctx = &self.image.ctx;
        let staging = GpuBuffer::staging(Arc::clone(ctx), &data.pixels)?;
        let image = self.image.image;
        let extent = vk::Extent3D { width: data.width, height: data.height, depth: 1 };

        ctx.run_single_use(|device, cmd| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range(vk::ImageAspectFlags::COLOR))
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(extent);

            device.cmd_copy_buffer_to_image(
                cmd,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range(vk::ImageAspectFlags::COLOR))
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader],
            );
        })
    }
}
