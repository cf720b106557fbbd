/// Frame slots - command buffers and synchronization primitives
///
/// Per frame in flight: one command buffer, an image-available semaphore and
/// an in-flight fence (created signaled). Render-complete semaphores are per
/// swapchain image, since presentation of an image may still wait on one
/// after its frame slot has been reused.

use ash::vk;
use std::sync::Arc;
use vu_render::vu::{Error, Result};
use vu_render::{engine_err, engine_error};

use crate::vulkan_context::GpuContext;

/// Synchronization objects of one frame slot
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    pub command_buffer: vk::CommandBuffer,
    pub image_available: vk::Semaphore,
    pub in_flight: vk::Fence,
}

pub struct FrameSync {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    slots: Vec<FrameSlot>,
    render_complete: Vec<vk::Semaphore>,
}

impl FrameSync {
    pub fn new(ctx: Arc<GpuContext>, frame_count: usize, image_count: usize) -> Result<Self> {
        let command_pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.selection.families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let command_pool = unsafe {
            ctx.device.create_command_pool(&command_pool_info, None).map_err(|e| {
                engine_error!("vu::vulkan", "Failed to create frame command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create frame command pool: {:?}", e))
            })?
        };

        // From here on Drop releases what was created
        let mut sync = Self { ctx, command_pool, slots: Vec::new(), render_complete: Vec::new() };

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(frame_count as u32);

        let command_buffers = unsafe {
            sync.ctx.device.allocate_command_buffers(&allocate_info).map_err(|e| {
                engine_error!("vu::vulkan", "Failed to allocate frame command buffers: {:?}", e);
                Error::InitializationFailed(format!("Failed to allocate frame command buffers: {:?}", e))
            })?
        };

        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        for command_buffer in command_buffers {
            let image_available = sync.create_semaphore()?;
            let in_flight = unsafe {
                sync.ctx.device.create_fence(&fence_info, None).map_err(|e| {
                    sync.ctx.device.destroy_semaphore(image_available, None);
                    engine_error!("vu::vulkan", "Failed to create fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?
            };
            sync.slots.push(FrameSlot { command_buffer, image_available, in_flight });
        }

        sync.resize_images(image_count)?;
        Ok(sync)
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe {
            self.ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None).map_err(|e| {
                engine_error!("vu::vulkan", "Failed to create semaphore: {:?}", e);
                Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
            })
        }
    }

    /// Match the render-complete semaphores to a new swapchain image count
    ///
    /// Only called with the device idle.
    pub fn resize_images(&mut self, image_count: usize) -> Result<()> {
        while self.render_complete.len() > image_count {
            if let Some(semaphore) = self.render_complete.pop() {
                unsafe { self.ctx.device.destroy_semaphore(semaphore, None) };
            }
        }
        while self.render_complete.len() < image_count {
            let semaphore = self.create_semaphore()?;
            self.render_complete.push(semaphore);
        }
        Ok(())
    }

    /// Replace a slot's image-available semaphore left signaled by an
    /// acquire whose frame was never submitted
    ///
    /// Only called with the device idle.
    pub fn renew_image_available(&mut self, index: usize) -> Result<()> {
        let semaphore = self.create_semaphore()?;
        let old = std::mem::replace(&mut self.slots[index].image_available, semaphore);
        unsafe { self.ctx.device.destroy_semaphore(old, None) };
        Ok(())
    }

    pub fn slot(&self, index: usize) -> FrameSlot {
        self.slots[index]
    }

    pub fn render_complete(&self, image_index: usize) -> Result<vk::Semaphore> {
        self.render_complete.get(image_index).copied().ok_or_else(|| {
            engine_err!("vu::vulkan", "No render-complete semaphore for image {}", image_index)
        })
    }

    /// Wait for a slot's last submission to retire
    ///
    /// # Errors
    ///
    /// `Error::BackendError` on timeout. The GPU is considered hung.
    pub fn wait(&self, index: usize, timeout_ns: u64) -> Result<()> {
        let fence = self.slots[index].in_flight;
        unsafe {
            match self.ctx.device.wait_for_fences(&[fence], true, timeout_ns) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => Err(engine_err!("vu::vulkan",
                    "Frame slot {} fence not signaled after {} ms, GPU is not responding",
                    index, timeout_ns / 1_000_000)),
                Err(e) => Err(engine_err!("vu::vulkan", "Failed to wait for fence: {:?}", e)),
            }
        }
    }

    /// Unsignal a slot's fence right before it is submitted again
    pub fn reset_fence(&self, index: usize) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.slots[index].in_flight])
                .map_err(|e| engine_err!("vu::vulkan", "Failed to reset fence: {:?}", e))
        }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            for slot in self.slots.drain(..) {
                self.ctx.device.destroy_semaphore(slot.image_available, None);
                self.ctx.device.destroy_fence(slot.in_flight, None);
            }
            for semaphore in self.render_complete.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            // Frees the command buffers too
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
