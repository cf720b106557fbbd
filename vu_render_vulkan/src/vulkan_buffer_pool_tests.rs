use super::*;

#[test]
fn test_index_pool_usage() {
    let usage = pool_usage(PoolBuffer::Vertex(VertexKind::Index));
    assert!(usage.contains(vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST));
    assert!(!usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
}

#[test]
fn test_attribute_pools_are_vertex_buffers() {
    for kind in [VertexKind::Position, VertexKind::Texcoord, VertexKind::Color, VertexKind::Normal] {
        assert!(pool_usage(PoolBuffer::Vertex(kind)).contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    }
    for kind in InstanceKind::ALL {
        let usage = pool_usage(PoolBuffer::Instance(kind));
        assert!(usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST));
    }
}
