/// Swapchain - presentable images, their views and the shared depth buffer
///
/// Recreated wholesale on resize: the device is idled, every old object is
/// destroyed, then surface capabilities are re-queried and everything is built
/// again. The surface itself is created once and lives until the swapchain is
/// dropped.

use ash::vk;
use std::sync::Arc;
use vu_render::vu::{Error, Result};
use vu_render::{engine_debug, engine_err, engine_error, engine_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_texture::GpuImage;

/// Depth formats in order of preference
pub const DEPTH_FORMATS: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

// ============================================================================
// Capability choices
// ============================================================================

/// 8-bit sRGB BGRA/RGBA with the sRGB color space, else the first format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    // A lone UNDEFINED entry means the surface takes anything
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            });
        }
    }
    [vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB]
        .iter()
        .find_map(|&wanted| {
            formats
                .iter()
                .find(|f| f.format == wanted && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when preferred and available, FIFO (always supported) otherwise
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], prefer_mailbox: bool) -> vk::PresentModeKHR {
    if prefer_mailbox && modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps.supported_transforms.contains(vk::SurfaceTransformFlagsKHR::IDENTITY) {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

/// The surface's fixed extent, or the requested size clamped to its limits
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// `preferred` raised to the surface minimum, capped by its maximum (0 = none)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR, preferred: u32) -> u32 {
    let count = preferred.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// First depth format usable as a depth-stencil attachment with optimal or linear tiling
pub fn choose_depth_format<F>(format_properties: F) -> Option<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatProperties,
{
    DEPTH_FORMATS.iter().copied().find(|&format| {
        let props = format_properties(format);
        let wanted = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        props.optimal_tiling_features.contains(wanted) || props.linear_tiling_features.contains(wanted)
    })
}

// ============================================================================
// Swapchain
// ============================================================================

/// Outcome of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// Image index, and whether the surface no longer matches exactly
    Image { index: u32, suboptimal: bool },
    /// The surface changed; nothing was acquired
    OutOfDate,
}

pub struct Swapchain {
    ctx: Arc<GpuContext>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    depth: Option<GpuImage>,
    format: vk::SurfaceFormatKHR,
    depth_format: vk::Format,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    preferred_images: u32,
}

impl Swapchain {
    /// Create the swapchain for `surface`, taking ownership of the surface
    ///
    /// # Arguments
    ///
    /// * `preferred_images` - Wanted image count, clamped to the surface limits
    /// * `prefer_mailbox` - Use MAILBOX presentation when available
    pub fn new(
        ctx: Arc<GpuContext>,
        surface_loader: ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
        preferred_images: u32,
        prefer_mailbox: bool,
    ) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
        let physical_device = ctx.selection.physical_device;

        // The surface is owned from here, Drop releases it on failure
        let mut swapchain = Self {
            ctx,
            surface_loader,
            surface,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            views: Vec::new(),
            depth: None,
            format: vk::SurfaceFormatKHR::default(),
            depth_format: vk::Format::UNDEFINED,
            present_mode: vk::PresentModeKHR::FIFO,
            extent: vk::Extent2D { width, height },
            preferred_images,
        };

        unsafe {
            let formats = swapchain.surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;
            swapchain.format = choose_surface_format(&formats).ok_or_else(|| {
                engine_error!("vu::vulkan", "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;

            let modes = swapchain.surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;
            swapchain.present_mode = choose_present_mode(&modes, prefer_mailbox);

            let instance = &swapchain.ctx.instance;
            swapchain.depth_format = choose_depth_format(|format| {
                instance.get_physical_device_format_properties(physical_device, format)
            })
            .ok_or_else(|| {
                engine_error!("vu::vulkan", "No supported depth format among {:?}", DEPTH_FORMATS);
                Error::InitializationFailed("No supported depth format".to_string())
            })?;
        }

        swapchain.build(width, height)?;

        engine_info!("vu::vulkan", "Swapchain: {} images {}x{} {:?} {:?}, depth {:?}",
            swapchain.images.len(), swapchain.extent.width, swapchain.extent.height,
            swapchain.format.format, swapchain.present_mode, swapchain.depth_format);

        Ok(swapchain)
    }

    /// Create swapchain, views and depth image at (clamped) `width` x `height`
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let caps = self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.selection.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let extent = choose_extent(&caps, width, height);
            let families = self.ctx.selection.families;
            let shared_families = [families.graphics, families.present];

            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&caps, self.preferred_images))
                .image_format(self.format.format)
                .image_color_space(self.format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(choose_transform(&caps))
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true);

            create_info = if families.graphics != families.present {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&shared_families)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            self.swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;
            self.extent = extent;

            self.images = self.swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            for &image in &self.images {
                let view_create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = self.ctx.device.create_image_view(&view_create_info, None)
                    .map_err(|e| {
                        engine_error!("vu::vulkan", "Failed to create swapchain image view: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                    })?;
                self.views.push(view);
            }
        }

        let depth_aspect = if self.depth_format == vk::Format::D32_SFLOAT {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        };
        self.depth = Some(GpuImage::new(
            Arc::clone(&self.ctx),
            self.extent.width,
            self.extent.height,
            self.depth_format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            depth_aspect,
        )?);

        Ok(())
    }

    /// Destroy depth image, views and swapchain (the surface stays)
    fn destroy_chain(&mut self) {
        self.depth = None;
        unsafe {
            for view in self.views.drain(..) {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
                self.swapchain = vk::SwapchainKHR::null();
            }
        }
    }

    /// Rebuild everything at the new size
    ///
    /// The caller destroys framebuffers first; the device is idled here.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.ctx.wait_idle()?;
        self.destroy_chain();
        self.build(width, height)?;
        engine_debug!("vu::vulkan", "Swapchain recreated at {}x{} ({} images)",
            self.extent.width, self.extent.height, self.images.len());
        Ok(())
    }

    /// Acquire the next image, signaling `semaphore` when it is ready
    pub fn acquire(&self, semaphore: vk::Semaphore) -> Result<Acquired> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null()) {
                Ok((index, suboptimal)) => Ok(Acquired::Image { index, suboptimal }),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquired::OutOfDate),
                Err(e) => Err(engine_err!("vu::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
            }
        }
    }

    /// Present `image_index` once `wait` is signaled
    ///
    /// Returns `true` when the swapchain is out of date or suboptimal and must
    /// be recreated.
    pub fn present(&self, wait: vk::Semaphore, image_index: u32) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) {
                Ok(suboptimal) => Ok(suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
                Err(e) => Err(engine_err!("vu::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn color_format(&self) -> vk::Format {
        self.format.format
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub fn depth_view(&self) -> vk::ImageView {
        self.depth.as_ref().map(|d| d.view).unwrap_or_default()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_chain();
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
