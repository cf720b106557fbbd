//! Mesh and instance data as handed to the renderer.
//!
//! Vertex data is non-interleaved: each attribute kind travels in its own
//! [`BufferData`] and lands in its own shared GPU pool. The renderer copies the
//! bytes as-is; it only checks that `count * stride` matches the byte length.

use bytemuck::Pod;
use crate::error::{Error, Result};

/// Mesh identifier (slot in the mesh table, recycled after drop)
pub type MeshId = u32;

/// Instance-data identifier (slot in the instance table, recycled after drop)
pub type InstanceId = u32;

// ============================================================================
// ATTRIBUTE KINDS
// ============================================================================

/// Per-vertex attribute kinds, one shared pool each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Position,
    Texcoord,
    Color,
    Normal,
    /// 16-bit triangle/line indices
    Index,
}

impl VertexKind {
    pub const COUNT: usize = 5;
    pub const ALL: [VertexKind; Self::COUNT] = [
        VertexKind::Position,
        VertexKind::Texcoord,
        VertexKind::Color,
        VertexKind::Normal,
        VertexKind::Index,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bytes reserved per unit of pool space
    pub fn bytes_per_element(self) -> u64 {
        match self {
            VertexKind::Position => 12,
            VertexKind::Texcoord => 8,
            VertexKind::Color => 16,
            VertexKind::Normal => 12,
            VertexKind::Index => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VertexKind::Position => "positions",
            VertexKind::Texcoord => "texcoords",
            VertexKind::Color => "colors",
            VertexKind::Normal => "normals",
            VertexKind::Index => "indices",
        }
    }
}

/// Per-instance attribute kinds, one shared pool each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    Position,
    Color,
    Scale,
}

impl InstanceKind {
    pub const COUNT: usize = 3;
    pub const ALL: [InstanceKind; Self::COUNT] = [
        InstanceKind::Position,
        InstanceKind::Color,
        InstanceKind::Scale,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bytes reserved per unit of pool space
    pub fn bytes_per_element(self) -> u64 {
        match self {
            InstanceKind::Position => 12,
            InstanceKind::Color => 16,
            InstanceKind::Scale => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstanceKind::Position => "instance positions",
            InstanceKind::Color => "instance colors",
            InstanceKind::Scale => "instance scales",
        }
    }
}

// ============================================================================
// BUFFER DATA
// ============================================================================

/// Raw bytes for one attribute kind: `count` elements of `stride` bytes
#[derive(Debug, Clone, PartialEq)]
pub struct BufferData {
    pub bytes: Vec<u8>,
    pub count: u32,
    pub stride: u32,
}

impl BufferData {
    /// Wrap raw bytes
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if `bytes.len() != count * stride`.
    pub fn new(bytes: Vec<u8>, count: u32, stride: u32) -> Result<Self> {
        let data = Self { bytes, count, stride };
        data.validate()?;
        Ok(data)
    }

    /// Pack a slice of plain values, `components` values per element
    ///
    /// # Example
    ///
    /// ```
    /// use vu_render::vu::resource::BufferData;
    ///
    /// let positions = BufferData::from_slice(&[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0], 3);
    /// assert_eq!(positions.count, 2);
    /// assert_eq!(positions.stride, 12);
    /// ```
    pub fn from_slice<T: Pod>(values: &[T], components: u32) -> Self {
        let components = components.max(1);
        let stride = components * std::mem::size_of::<T>() as u32;
        Self {
            bytes: bytemuck::cast_slice(values).to_vec(),
            count: values.len() as u32 / components,
            stride,
        }
    }

    /// 16-bit indices, one per element
    pub fn from_indices(indices: &[u16]) -> Self {
        Self::from_slice(indices, 1)
    }

    pub fn byte_len(&self) -> u64 {
        self.count as u64 * self.stride as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.bytes.len() as u64 != self.byte_len() {
            return Err(Error::InvalidResource(format!(
                "buffer holds {} bytes but count {} x stride {} = {}",
                self.bytes.len(), self.count, self.stride, self.byte_len()
            )));
        }
        Ok(())
    }
}

/// All vertex attribute buffers of one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    buffers: [Option<BufferData>; VertexKind::COUNT],
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, kind: VertexKind, data: BufferData) -> Self {
        self.set(kind, data);
        self
    }

    pub fn set(&mut self, kind: VertexKind, data: BufferData) {
        self.buffers[kind.index()] = Some(data);
    }

    pub fn get(&self, kind: VertexKind) -> Option<&BufferData> {
        self.buffers[kind.index()].as_ref()
    }

    /// Number of indices, which is what an indexed draw consumes
    pub fn index_count(&self) -> u32 {
        self.get(VertexKind::Index).map(|d| d.count).unwrap_or(0)
    }
}

/// All instance attribute buffers of one instance set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceData {
    buffers: [Option<BufferData>; InstanceKind::COUNT],
}

impl InstanceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: InstanceKind, data: BufferData) -> Self {
        self.set(kind, data);
        self
    }

    pub fn set(&mut self, kind: InstanceKind, data: BufferData) {
        self.buffers[kind.index()] = Some(data);
    }

    pub fn get(&self, kind: InstanceKind) -> Option<&BufferData> {
        self.buffers[kind.index()].as_ref()
    }
}

// ============================================================================
// POOL RANGES
// ============================================================================

/// Where one attribute kind of a mesh or instance set lives in its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferRange {
    pub offset: u64,
    pub count: u32,
    pub stride: u32,
}

impl BufferRange {
    pub fn size(&self) -> u64 {
        self.count as u64 * self.stride as u64
    }

    /// First byte after this range
    pub fn end(&self) -> u64 {
        self.offset + self.size()
    }

    /// Whether `data` has exactly this range's shape
    pub fn matches(&self, data: Option<&BufferData>) -> bool {
        match data {
            Some(d) => d.count == self.count && d.stride == self.stride,
            None => self.count == 0,
        }
    }
}

/// Pool placement of a loaded mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRecord {
    pub ranges: [BufferRange; VertexKind::COUNT],
}

impl MeshRecord {
    pub fn range(&self, kind: VertexKind) -> &BufferRange {
        &self.ranges[kind.index()]
    }

    pub fn index_count(&self) -> u32 {
        self.range(VertexKind::Index).count
    }
}

/// Pool placement of a loaded instance set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub ranges: [BufferRange; InstanceKind::COUNT],
}

impl InstanceRecord {
    pub fn range(&self, kind: InstanceKind) -> &BufferRange {
        &self.ranges[kind.index()]
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
