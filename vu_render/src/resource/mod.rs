//! Resource bookkeeping: mesh and instance data, pool placement, textures

pub mod mesh;
pub mod buffer_pool;
pub mod texture;

pub use mesh::{
    BufferData, BufferRange, InstanceData, InstanceId, InstanceKind, InstanceRecord,
    MeshData, MeshId, MeshRecord, VertexKind,
};
pub use buffer_pool::{BufferPools, BufferUploader, PoolBuffer, PoolCapacity, INDEX_STRIDE};
pub use texture::{ImageData, TextureId, TextureInfo, TextureTable};
