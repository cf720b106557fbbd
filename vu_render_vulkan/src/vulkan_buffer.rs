/// GpuBuffer - a Vulkan buffer with its own device memory

use ash::vk;
use std::sync::Arc;
use vu_render::vu::Result;
use vu_render::{engine_bail, engine_err};

use crate::vulkan_context::GpuContext;

/// Vulkan buffer with dedicated memory
///
/// Host-visible buffers stay mapped for their whole life and are written with
/// [`GpuBuffer::write`]. Device-local buffers are filled through a staging
/// buffer with [`GpuBuffer::upload`].
pub struct GpuBuffer {
    /// Shared GPU context (device, queues, command pool)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: u64,
    mapped: Option<*mut u8>,
}

impl GpuBuffer {
    /// Create a buffer and allocate memory with at least `flags`
    ///
    /// Memory that is HOST_VISIBLE is mapped immediately.
    pub fn new(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: vk::BufferUsageFlags,
        flags: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size.max(1))
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create buffer ({} bytes): {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let memory = match ctx.allocate(&requirements, flags) {
                Ok(memory) => memory,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // From here on Drop releases buffer and memory
            let mut gpu_buffer = Self { ctx, buffer, memory, size, mapped: None };

            gpu_buffer.ctx.device.bind_buffer_memory(buffer, memory, 0)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to bind buffer memory: {:?}", e))?;

            if flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
                let ptr = gpu_buffer.ctx.device
                    .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                    .map_err(|e| engine_err!("vu::vulkan", "Failed to map buffer memory: {:?}", e))?;
                gpu_buffer.mapped = Some(ptr as *mut u8);
            }

            Ok(gpu_buffer)
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` into mapped memory at `offset`
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(ptr) = self.mapped else {
            engine_bail!("vu::vulkan", "Buffer write failed: buffer is not host-visible");
        };
        if offset + data.len() as u64 > self.size {
            engine_bail!("vu::vulkan", "Buffer write out of range: {}+{} > {}", offset, data.len(), self.size);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Copy `data` to `offset` through a transient staging buffer
    ///
    /// Blocks until the copy has completed on the GPU.
    pub fn upload(&self, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if offset + data.len() as u64 > self.size {
            engine_bail!("vu::vulkan", "Buffer upload out of range: {}+{} > {}", offset, data.len(), self.size);
        }

        let staging = GpuBuffer::staging(Arc::clone(&self.ctx), data)?;
        let region = vk::BufferCopy { src_offset: 0, dst_offset: offset, size: data.len() as u64 };
        let dst = self.buffer;
        self.ctx.run_single_use(|device, cmd| unsafe {
            device.cmd_copy_buffer(cmd, staging.buffer, dst, &[region]);
        })
    }

    /// Host-visible TRANSFER_SRC buffer holding `data`
    pub fn staging(ctx: Arc<GpuContext>, data: &[u8]) -> Result<Self> {
        let staging = GpuBuffer::new(
            ctx,
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write(0, data)?;
        Ok(staging)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.ctx.device.unmap_memory(self.memory);
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
            self.ctx.device.free_memory(self.memory, None);
        }
    }
}
