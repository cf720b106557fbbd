/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a resource needs after creation:
/// - Device for Vulkan API calls
/// - Queues (graphics, transfer, present) and their families
/// - Memory properties for manual memory-type selection
/// - Command pool for one-shot upload operations

use ash::vk;
use vu_render::vu::{Error, Result};
use vu_render::{engine_err, engine_error};

use crate::vulkan_device::DeviceSelection;
use crate::vulkan_memory::find_memory_type;

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by buffers, textures, shaders and the swapchain so each
/// can destroy itself on drop. Device and instance destruction is handled by
/// `VulkanRenderer::dispose()` once every holder is gone.
pub struct GpuContext {
    /// Vulkan instance (destroyed by VulkanRenderer)
    pub instance: ash::Instance,

    /// Vulkan logical device
    pub device: ash::Device,

    /// Selected physical device and its queue families
    pub selection: DeviceSelection,

    pub graphics_queue: vk::Queue,
    /// Dedicated transfer queue when the device has one, graphics queue otherwise
    pub transfer_queue: vk::Queue,
    pub present_queue: vk::Queue,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: vk::CommandPool,

    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl GpuContext {
    /// Pick a memory type for `requirements` with at least `flags`
    pub fn memory_type(&self, requirements: &vk::MemoryRequirements, flags: vk::MemoryPropertyFlags) -> Result<u32> {
        find_memory_type(&self.memory_properties, requirements.memory_type_bits, flags).ok_or_else(|| {
            engine_err!("vu::vulkan", "No memory type matches bits {:#b} with {:?}",
                requirements.memory_type_bits, flags)
        })
    }

    /// Allocate device memory for `requirements`
    pub fn allocate(&self, requirements: &vk::MemoryRequirements, flags: vk::MemoryPropertyFlags) -> Result<vk::DeviceMemory> {
        let memory_type_index = self.memory_type(requirements, flags)?;
        let allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        unsafe {
            self.device.allocate_memory(&allocate_info, None).map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                    engine_error!("vu::vulkan", "Out of GPU memory ({} bytes, {:?})",
                        requirements.size, flags);
                    Error::OutOfMemory
                }
                e => engine_err!("vu::vulkan", "Failed to allocate memory: {:?}", e),
            })
        }
    }

    /// Allocate and begin a one-time command buffer on the upload pool
    pub fn begin_single_use(&self) -> Result<vk::CommandBuffer> {
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.upload_command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to allocate upload command buffer: {:?}", e))?
                .into_iter()
                .next()
                .ok_or_else(|| engine_err!("vu::vulkan", "Upload command buffer allocation returned nothing"))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            if let Err(e) = self.device.begin_command_buffer(command_buffer, &begin_info) {
                self.device.free_command_buffers(self.upload_command_pool, &[command_buffer]);
                return Err(engine_err!("vu::vulkan", "Failed to begin upload command buffer: {:?}", e));
            }

            Ok(command_buffer)
        }
    }

    /// End, submit on the graphics queue, wait for the queue to go idle, free
    ///
    /// Earlier frames may still read the destination, so the queue is idled
    /// before the submit as well.
    pub fn end_single_use(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let result = unsafe { self.submit_and_wait(command_buffer) };
        unsafe {
            self.device.free_command_buffers(self.upload_command_pool, &[command_buffer]);
        }
        result
    }

    unsafe fn submit_and_wait(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        self.device.end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("vu::vulkan", "Failed to end upload command buffer: {:?}", e))?;

        self.device.queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!("vu::vulkan", "Failed to idle graphics queue before upload: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("vu::vulkan", "Failed to submit upload commands: {:?}", e))?;

        self.device.queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!("vu::vulkan", "Failed to wait for upload to complete: {:?}", e))
    }

    /// Record `record` into a one-time command buffer and run it to completion
    pub fn run_single_use<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let command_buffer = self.begin_single_use()?;
        record(&self.device, command_buffer);
        self.end_single_use(command_buffer)
    }

    /// Wait for all GPU operations to complete
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()
                .map_err(|e| engine_err!("vu::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }
}
