/// GPU side of the shared vertex and instance pools
///
/// One device-local buffer per attribute kind, sized from `PoolCapacity`.
/// Placement is decided by `vu_render`'s `BufferPools`; this type only moves
/// the bytes.

use ash::vk;
use std::sync::Arc;
use vu_render::vu::resource::{BufferUploader, InstanceKind, PoolBuffer, PoolCapacity, VertexKind};
use vu_render::vu::Result;
use vu_render::engine_debug;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;

/// Usage flags of a pool buffer
pub fn pool_usage(buffer: PoolBuffer) -> vk::BufferUsageFlags {
    let usage = match buffer {
        PoolBuffer::Vertex(VertexKind::Index) => vk::BufferUsageFlags::INDEX_BUFFER,
        _ => vk::BufferUsageFlags::VERTEX_BUFFER,
    };
    usage | vk::BufferUsageFlags::TRANSFER_DST
}

pub struct GpuPools {
    vertex: Vec<GpuBuffer>,
    instance: Vec<GpuBuffer>,
}

impl GpuPools {
    pub fn new(ctx: &Arc<GpuContext>, capacity: &PoolCapacity) -> Result<Self> {
        let create = |buffer: PoolBuffer| {
            GpuBuffer::new(
                Arc::clone(ctx),
                capacity.of(buffer),
                pool_usage(buffer),
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )
        };

        let vertex = VertexKind::ALL
            .iter()
            .map(|&kind| create(PoolBuffer::Vertex(kind)))
            .collect::<Result<Vec<_>>>()?;
        let instance = InstanceKind::ALL
            .iter()
            .map(|&kind| create(PoolBuffer::Instance(kind)))
            .collect::<Result<Vec<_>>>()?;

        let total: u64 = vertex.iter().chain(instance.iter()).map(GpuBuffer::size).sum();
        engine_debug!("vu::vulkan", "Allocated {} pool buffers, {} bytes", vertex.len() + instance.len(), total);

        Ok(Self { vertex, instance })
    }

    pub fn buffer(&self, buffer: PoolBuffer) -> &GpuBuffer {
        match buffer {
            PoolBuffer::Vertex(kind) => &self.vertex[kind.index()],
            PoolBuffer::Instance(kind) => &self.instance[kind.index()],
        }
    }
}

impl BufferUploader for GpuPools {
    fn upload(&mut self, buffer: PoolBuffer, offset: u64, bytes: &[u8]) -> Result<()> {
        self.buffer(buffer).upload(offset, bytes)
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_pool_tests.rs"]
mod tests;
