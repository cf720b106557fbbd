//! Shared vertex and instance buffer pools.
//!
//! One large GPU buffer exists per attribute kind. Every loaded mesh (or
//! instance set) owns a byte range in each pool it has data for. This module
//! does the bookkeeping: range placement, capacity checks, rollback of failed
//! loads, reclamation on drop. The bytes themselves reach the GPU through a
//! [`BufferUploader`] supplied by the backend.

use crate::error::{Error, Result};
use crate::resource::mesh::{
    BufferData, BufferRange, InstanceData, InstanceId, InstanceKind, InstanceRecord, MeshData,
    MeshId, MeshRecord, VertexKind,
};
use crate::utils::{IdAllocator, RangeAllocator};
use crate::{engine_debug, engine_error};

/// Width of one index: the index pool holds 16-bit indices only
pub const INDEX_STRIDE: u32 = 2;

/// Identifies one of the shared pool buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolBuffer {
    Vertex(VertexKind),
    Instance(InstanceKind),
}

/// Writes bytes into a pool buffer at a byte offset
///
/// Implemented by each backend (staging-buffer copy on Vulkan).
pub trait BufferUploader {
    fn upload(&mut self, buffer: PoolBuffer, offset: u64, bytes: &[u8]) -> Result<()>;
}

/// Byte capacity of every pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCapacity {
    pub vertex: [u64; VertexKind::COUNT],
    pub instance: [u64; InstanceKind::COUNT],
}

impl PoolCapacity {
    /// Size each pool for `vertex_space` vertices and `instance_space` instances
    pub fn from_space(vertex_space: u64, instance_space: u64) -> Self {
        Self {
            vertex: VertexKind::ALL.map(|k| k.bytes_per_element() * vertex_space),
            instance: InstanceKind::ALL.map(|k| k.bytes_per_element() * instance_space),
        }
    }

    pub fn of(&self, buffer: PoolBuffer) -> u64 {
        match buffer {
            PoolBuffer::Vertex(kind) => self.vertex[kind.index()],
            PoolBuffer::Instance(kind) => self.instance[kind.index()],
        }
    }
}

/// Pool bookkeeping for meshes and instance data
pub struct BufferPools {
    capacity: PoolCapacity,
    vertex: [RangeAllocator; VertexKind::COUNT],
    instance: [RangeAllocator; InstanceKind::COUNT],
    meshes: Vec<Option<MeshRecord>>,
    mesh_ids: IdAllocator,
    instances: Vec<Option<InstanceRecord>>,
    instance_ids: IdAllocator,
    mesh_bytes: u64,
    instance_bytes: u64,
}

impl BufferPools {
    pub fn new(capacity: PoolCapacity) -> Self {
        Self {
            capacity,
            vertex: capacity.vertex.map(RangeAllocator::new),
            instance: capacity.instance.map(RangeAllocator::new),
            meshes: Vec::new(),
            mesh_ids: IdAllocator::new(),
            instances: Vec::new(),
            instance_ids: IdAllocator::new(),
            mesh_bytes: 0,
            instance_bytes: 0,
        }
    }

    pub fn capacity(&self) -> &PoolCapacity {
        &self.capacity
    }

    // ===== MESHES =====

    /// Place and upload a batch of meshes
    ///
    /// All meshes of the batch are placed first, then each attribute kind is
    /// uploaded once per contiguous run (a single upload when the batch was
    /// appended at the end of the pool).
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if a buffer's length disagrees with its count
    ///   and stride, or indices are not 16-bit
    /// - `Error::CapacityExceeded` if any kind would overflow its pool
    /// - any error of the uploader
    ///
    /// On error nothing is kept: ranges placed by this call are released and no ID is issued.
    pub fn load_meshes<U: BufferUploader>(
        &mut self,
        uploader: &mut U,
        meshes: &[MeshData],
    ) -> Result<Vec<MeshId>> {
        for mesh in meshes {
            if let Some(indices) = mesh.get(VertexKind::Index) {
                if indices.stride != INDEX_STRIDE {
                    return Err(Error::InvalidResource(format!(
                        "indices must be {} bytes wide, got {}", INDEX_STRIDE, indices.stride
                    )));
                }
            }
        }
        let items: Vec<[Option<&BufferData>; VertexKind::COUNT]> = meshes
            .iter()
            .map(|m| VertexKind::ALL.map(|k| m.get(k)))
            .collect();

        let records = place(&mut self.vertex, &items, |k| PoolBuffer::Vertex(VertexKind::ALL[k]))?;

        if let Err(e) = upload_runs(uploader, &items, &records, |k| PoolBuffer::Vertex(VertexKind::ALL[k])) {
            release(&mut self.vertex, &records);
            return Err(e);
        }

        let bytes: u64 = records.iter().flatten().map(|r| r.size()).sum();
        self.mesh_bytes += bytes;

        let ids = records
            .into_iter()
            .map(|ranges| {
                let id = self.mesh_ids.alloc();
                store(&mut self.meshes, id, MeshRecord { ranges });
                id
            })
            .collect::<Vec<_>>();

        engine_debug!("vu::render", "Loaded {} mesh(es), {} bytes", ids.len(), bytes);
        Ok(ids)
    }

    /// Release a mesh's pool ranges. Unknown IDs are ignored.
    pub fn drop_mesh(&mut self, id: MeshId) -> bool {
        let Some(record) = self.meshes.get_mut(id as usize).and_then(Option::take) else {
            return false;
        };
        release(&mut self.vertex, std::slice::from_ref(&record.ranges));
        self.mesh_ids.free(id);
        true
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshRecord> {
        self.meshes.get(id as usize).and_then(Option::as_ref)
    }

    pub fn mesh_count(&self) -> u32 {
        self.mesh_ids.len()
    }

    // ===== INSTANCE DATA =====

    /// Place and upload one instance set
    ///
    /// # Errors
    ///
    /// Same as [`load_meshes`](Self::load_meshes).
    pub fn load_instance_data<U: BufferUploader>(
        &mut self,
        uploader: &mut U,
        data: &InstanceData,
    ) -> Result<InstanceId> {
        let items = [InstanceKind::ALL.map(|k| data.get(k))];
        let records = place(&mut self.instance, &items, |k| PoolBuffer::Instance(InstanceKind::ALL[k]))?;

        if let Err(e) = upload_runs(uploader, &items, &records, |k| PoolBuffer::Instance(InstanceKind::ALL[k])) {
            release(&mut self.instance, &records);
            return Err(e);
        }

        let ranges = records[0];
        self.instance_bytes += ranges.iter().map(|r| r.size()).sum::<u64>();
        let id = self.instance_ids.alloc();
        store(&mut self.instances, id, InstanceRecord { ranges });
        Ok(id)
    }

    /// Re-upload instance data in place
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if `id` is not loaded
    /// - `Error::LayoutMismatch` if any kind's count or stride differs from
    ///   the data it was loaded with; nothing is uploaded in that case
    pub fn update_instance_data<U: BufferUploader>(
        &mut self,
        uploader: &mut U,
        id: InstanceId,
        data: &InstanceData,
    ) -> Result<()> {
        let record = self
            .instance(id)
            .ok_or_else(|| Error::InvalidResource(format!("instance data {} is not loaded", id)))?
            .clone();

        for kind in InstanceKind::ALL {
            let range = record.range(kind);
            let new = data.get(kind);
            if let Some(d) = new {
                d.validate()?;
            }
            if !range.matches(new) {
                let (count, stride) = new.map(|d| (d.count, d.stride)).unwrap_or((0, 0));
                return Err(Error::LayoutMismatch(format!(
                    "{} of instance data {}: loaded with {}x{} bytes, got {}x{}",
                    kind.name(), id, range.count, range.stride, count, stride
                )));
            }
        }

        for kind in InstanceKind::ALL {
            if let Some(d) = data.get(kind) {
                if !d.bytes.is_empty() {
                    uploader.upload(PoolBuffer::Instance(kind), record.range(kind).offset, &d.bytes)?;
                    self.instance_bytes += d.bytes.len() as u64;
                }
            }
        }
        Ok(())
    }

    /// Release an instance set's pool ranges. Unknown IDs are ignored.
    pub fn drop_instance_data(&mut self, id: InstanceId) -> bool {
        let Some(record) = self.instances.get_mut(id as usize).and_then(Option::take) else {
            return false;
        };
        release(&mut self.instance, std::slice::from_ref(&record.ranges));
        self.instance_ids.free(id);
        true
    }

    pub fn instance(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(id as usize).and_then(Option::as_ref)
    }

    // ===== USAGE =====

    /// Bytes currently allocated in a pool
    pub fn used(&self, buffer: PoolBuffer) -> u64 {
        match buffer {
            PoolBuffer::Vertex(kind) => self.vertex[kind.index()].used(),
            PoolBuffer::Instance(kind) => self.instance[kind.index()].used(),
        }
    }

    /// Cumulative bytes uploaded for meshes
    pub fn mesh_bytes(&self) -> u64 {
        self.mesh_bytes
    }

    /// Cumulative bytes uploaded for instance data
    pub fn instance_bytes(&self) -> u64 {
        self.instance_bytes
    }
}

// ============================================================================
// Placement helpers
// ============================================================================

fn store<T>(table: &mut Vec<Option<T>>, id: u32, value: T) {
    let index = id as usize;
    if table.len() <= index {
        table.resize_with(index + 1, || None);
    }
    table[index] = Some(value);
}

/// Allocate ranges for every item, kind by kind. All-or-nothing.
fn place<const N: usize>(
    pools: &mut [RangeAllocator; N],
    items: &[[Option<&BufferData>; N]],
    buffer: impl Fn(usize) -> PoolBuffer,
) -> Result<Vec<[BufferRange; N]>> {
    for item in items {
        for data in item.iter().flatten() {
            data.validate()?;
        }
    }

    let mut placed: Vec<[BufferRange; N]> = Vec::with_capacity(items.len());
    for item in items {
        let mut ranges = [BufferRange::default(); N];
        for (k, data) in item.iter().enumerate() {
            let Some(data) = data else {
                ranges[k].offset = pools[k].end();
                continue;
            };
            match pools[k].allocate(data.byte_len()) {
                Some(offset) => {
                    ranges[k] = BufferRange { offset, count: data.count, stride: data.stride };
                }
                None => {
                    // Undo this item's partial placement, then the finished ones
                    release_partial(pools, &ranges[..k]);
                    release(pools, &placed);
                    let pool = &pools[k];
                    engine_error!("vu::render",
                        "{:?} pool full: {} bytes requested, {} of {} in use",
                        buffer(k), data.byte_len(), pool.used(), pool.capacity());
                    return Err(Error::CapacityExceeded(format!(
                        "{:?} pool: {} bytes requested, {} of {} in use",
                        buffer(k), data.byte_len(), pool.used(), pool.capacity()
                    )));
                }
            }
        }
        placed.push(ranges);
    }
    Ok(placed)
}

fn release_partial<const N: usize>(pools: &mut [RangeAllocator; N], ranges: &[BufferRange]) {
    for (k, range) in ranges.iter().enumerate().rev() {
        pools[k].free(range.offset, range.size());
    }
}

/// Free ranges in reverse placement order so tail frees shrink the pools back
fn release<const N: usize>(pools: &mut [RangeAllocator; N], records: &[[BufferRange; N]]) {
    for ranges in records.iter().rev() {
        release_partial(pools, ranges);
    }
}

/// Upload each kind once per run of byte-contiguous ranges
fn upload_runs<U: BufferUploader, const N: usize>(
    uploader: &mut U,
    items: &[[Option<&BufferData>; N]],
    records: &[[BufferRange; N]],
    buffer: impl Fn(usize) -> PoolBuffer,
) -> Result<()> {
    for k in 0..N {
        let mut pieces: Vec<(u64, &[u8])> = items
            .iter()
            .zip(records)
            .filter_map(|(item, ranges)| item[k].map(|d| (ranges[k].offset, d.bytes.as_slice())))
            .filter(|(_, bytes)| !bytes.is_empty())
            .collect();
        pieces.sort_by_key(|&(offset, _)| offset);

        let mut i = 0;
        while i < pieces.len() {
            let start = pieces[i].0;
            let mut end = start + pieces[i].1.len() as u64;
            let mut j = i + 1;
            while j < pieces.len() && pieces[j].0 == end {
                end += pieces[j].1.len() as u64;
                j += 1;
            }
            if j == i + 1 {
                uploader.upload(buffer(k), start, pieces[i].1)?;
            } else {
                let mut run = Vec::with_capacity((end - start) as usize);
                for (_, bytes) in &pieces[i..j] {
                    run.extend_from_slice(bytes);
                }
                uploader.upload(buffer(k), start, &run)?;
            }
            i = j;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "buffer_pool_tests.rs"]
mod tests;
