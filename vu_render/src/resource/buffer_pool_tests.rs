use super::*;

// ============================================================================
// Helpers
// ============================================================================

/// Records every upload; optionally fails on the Nth call
#[derive(Default)]
struct RecordingUploader {
    uploads: Vec<(PoolBuffer, u64, usize)>,
    fail_on: Option<usize>,
}

impl BufferUploader for RecordingUploader {
    fn upload(&mut self, buffer: PoolBuffer, offset: u64, bytes: &[u8]) -> Result<()> {
        if self.fail_on == Some(self.uploads.len()) {
            return Err(Error::BackendError("staging copy failed".to_string()));
        }
        self.uploads.push((buffer, offset, bytes.len()));
        Ok(())
    }
}

fn triangle() -> MeshData {
    MeshData::new()
        .with(VertexKind::Position, BufferData::from_slice(&[0.0f32; 9], 3))
        .with(VertexKind::Texcoord, BufferData::from_slice(&[0.0f32; 6], 2))
        .with(VertexKind::Index, BufferData::from_indices(&[0, 1, 2]))
}

fn quad() -> MeshData {
    MeshData::new()
        .with(VertexKind::Position, BufferData::from_slice(&[0.0f32; 12], 3))
        .with(VertexKind::Index, BufferData::from_indices(&[0, 1, 2, 2, 3, 0]))
}

fn pools(vertex_space: u64) -> BufferPools {
    BufferPools::new(PoolCapacity::from_space(vertex_space, 16))
}

// ============================================================================
// Mesh placement
// ============================================================================

#[test]
fn test_capacity_from_space() {
    let cap = PoolCapacity::from_space(10, 2);
    assert_eq!(cap.of(PoolBuffer::Vertex(VertexKind::Position)), 120);
    assert_eq!(cap.of(PoolBuffer::Vertex(VertexKind::Texcoord)), 80);
    assert_eq!(cap.of(PoolBuffer::Instance(InstanceKind::Scale)), 8);
}

#[test]
fn test_meshes_are_appended_back_to_back() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();

    let a = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];
    let b = pools.load_meshes(&mut up, &[quad()]).unwrap()[0];
    let c = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];

    let pos = |id| *pools.mesh(id).unwrap().range(VertexKind::Position);
    assert_eq!(pos(a).offset, 0);
    assert_eq!(pos(b).offset, 36);
    assert_eq!(pos(c).offset, 36 + 48);
    assert_eq!(pos(c).end(), 36 + 48 + 36);

    let idx = |id| *pools.mesh(id).unwrap().range(VertexKind::Index);
    assert_eq!(idx(b).offset, 6);
    assert_eq!(idx(c).offset, 18);
}

#[test]
fn test_same_kind_ranges_never_overlap() {
    let mut pools = pools(1000);
    let mut up = RecordingUploader::default();
    let batch: Vec<MeshData> = (0..8).map(|i| if i % 2 == 0 { triangle() } else { quad() }).collect();
    let ids = pools.load_meshes(&mut up, &batch).unwrap();

    for kind in VertexKind::ALL {
        let mut ranges: Vec<BufferRange> = ids
            .iter()
            .map(|&id| *pools.mesh(id).unwrap().range(kind))
            .filter(|r| r.count > 0)
            .collect();
        ranges.sort_by_key(|r| r.offset);
        for pair in ranges.windows(2) {
            assert!(pair[0].end() <= pair[1].offset, "{:?} overlaps", kind);
        }
    }
}

#[test]
fn test_batch_is_uploaded_once_per_kind() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();
    pools.load_meshes(&mut up, &[triangle(), quad(), triangle()]).unwrap();

    let positions: Vec<_> = up
        .uploads
        .iter()
        .filter(|(b, _, _)| *b == PoolBuffer::Vertex(VertexKind::Position))
        .collect();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].1, 0);
    assert_eq!(positions[0].2, 36 + 48 + 36);

    // Texcoords only come from the two triangles, which are not adjacent in the batch
    // but are adjacent in the pool since the quad has none
    let texcoords = up
        .uploads
        .iter()
        .filter(|(b, _, _)| *b == PoolBuffer::Vertex(VertexKind::Texcoord))
        .count();
    assert_eq!(texcoords, 1);
}

#[test]
fn test_missing_kind_carries_offset_forward() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();
    let a = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];
    let b = pools.load_meshes(&mut up, &[quad()]).unwrap()[0];
    let tex_a = *pools.mesh(a).unwrap().range(VertexKind::Texcoord);
    let tex_b = *pools.mesh(b).unwrap().range(VertexKind::Texcoord);
    assert_eq!(tex_b.count, 0);
    assert_eq!(tex_b.offset, tex_a.end());
}

// ============================================================================
// Capacity and rollback
// ============================================================================

#[test]
fn test_overflow_fails_whole_batch() {
    // 5 vertices of space: one triangle fits, two do not
    let mut pools = pools(5);
    let mut up = RecordingUploader::default();

    let err = pools.load_meshes(&mut up, &[triangle(), triangle()]).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));
    assert!(up.uploads.is_empty());
    assert_eq!(pools.mesh_count(), 0);
    assert_eq!(pools.used(PoolBuffer::Vertex(VertexKind::Position)), 0);

    // The pool is intact: a single triangle still loads at offset 0
    let id = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];
    assert_eq!(pools.mesh(id).unwrap().range(VertexKind::Position).offset, 0);
}

#[test]
fn test_failed_upload_releases_ranges() {
    let mut pools = pools(100);
    let mut up = RecordingUploader { fail_on: Some(1), ..Default::default() };
    assert!(pools.load_meshes(&mut up, &[triangle()]).is_err());
    for kind in VertexKind::ALL {
        assert_eq!(pools.used(PoolBuffer::Vertex(kind)), 0);
    }
    assert_eq!(pools.mesh_count(), 0);
}

#[test]
fn test_malformed_buffer_rejected() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();
    let bad = MeshData::new().with(
        VertexKind::Position,
        BufferData { bytes: vec![0; 5], count: 1, stride: 12 },
    );
    assert!(matches!(
        pools.load_meshes(&mut up, &[bad]),
        Err(Error::InvalidResource(_))
    ));
}

// ============================================================================
// Reclamation
// ============================================================================

#[test]
fn test_drop_mesh_reclaims_space_and_id() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();
    let a = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];
    let _b = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];

    assert!(pools.drop_mesh(a));
    assert!(pools.mesh(a).is_none());
    assert!(!pools.drop_mesh(a));

    let c = pools.load_meshes(&mut up, &[triangle()]).unwrap()[0];
    assert_eq!(c, a);
    assert_eq!(pools.mesh(c).unwrap().range(VertexKind::Position).offset, 0);
}

#[test]
fn test_drop_unknown_mesh_is_ignored() {
    let mut pools = pools(10);
    assert!(!pools.drop_mesh(99));
}

// ============================================================================
// Instance data
// ============================================================================

fn instances(n: usize) -> InstanceData {
    InstanceData::new()
        .with(InstanceKind::Position, BufferData::from_slice(&vec![0.0f32; n * 3], 3))
        .with(InstanceKind::Scale, BufferData::from_slice(&vec![1.0f32; n], 1))
}

#[test]
fn test_load_instance_data() {
    let mut pools = pools(10);
    let mut up = RecordingUploader::default();
    let a = pools.load_instance_data(&mut up, &instances(4)).unwrap();
    let b = pools.load_instance_data(&mut up, &instances(2)).unwrap();
    assert_ne!(a, b);
    let rb = pools.instance(b).unwrap().range(InstanceKind::Position);
    assert_eq!(rb.offset, 48);
    assert_eq!(rb.count, 2);
    assert_eq!(pools.instance_bytes(), 4 * 16 + 2 * 16);
}

#[test]
fn test_update_instance_data_in_place() {
    let mut pools = pools(10);
    let mut up = RecordingUploader::default();
    let _a = pools.load_instance_data(&mut up, &instances(4)).unwrap();
    let b = pools.load_instance_data(&mut up, &instances(2)).unwrap();
    up.uploads.clear();

    pools.update_instance_data(&mut up, b, &instances(2)).unwrap();
    assert_eq!(
        up.uploads,
        vec![
            (PoolBuffer::Instance(InstanceKind::Position), 48, 24),
            (PoolBuffer::Instance(InstanceKind::Scale), 16, 8),
        ]
    );
}

#[test]
fn test_update_instance_data_shape_mismatch_uploads_nothing() {
    let mut pools = pools(10);
    let mut up = RecordingUploader::default();
    let id = pools.load_instance_data(&mut up, &instances(4)).unwrap();
    up.uploads.clear();

    let err = pools.update_instance_data(&mut up, id, &instances(3)).unwrap_err();
    assert!(matches!(err, Error::LayoutMismatch(_)));

    // A kind that was absent at load time cannot appear later either
    let extra = instances(4).with(InstanceKind::Color, BufferData::from_slice(&[0.0f32; 16], 4));
    assert!(pools.update_instance_data(&mut up, id, &extra).is_err());

    assert!(up.uploads.is_empty());
}

#[test]
fn test_update_unknown_instance_data() {
    let mut pools = pools(10);
    let mut up = RecordingUploader::default();
    assert!(matches!(
        pools.update_instance_data(&mut up, 3, &instances(1)),
        Err(Error::InvalidResource(_))
    ));
}

#[test]
fn test_drop_instance_data() {
    let mut pools = pools(10);
    let mut up = RecordingUploader::default();
    let id = pools.load_instance_data(&mut up, &instances(4)).unwrap();
    assert!(pools.drop_instance_data(id));
    assert_eq!(pools.used(PoolBuffer::Instance(InstanceKind::Position)), 0);
    assert!(pools.instance(id).is_none());
}

#[test]
fn test_instance_overflow() {
    let mut pools = pools(10); // 16 instances of space
    let mut up = RecordingUploader::default();
    assert!(matches!(
        pools.load_instance_data(&mut up, &instances(17)),
        Err(Error::CapacityExceeded(_))
    ));
}

#[test]
fn test_32bit_indices_rejected() {
    let mut pools = pools(100);
    let mut up = RecordingUploader::default();
    let mesh = MeshData::new()
        .with(VertexKind::Position, BufferData::from_slice(&[0.0f32; 9], 3))
        .with(VertexKind::Index, BufferData::from_slice(&[0u32, 1, 2], 1));
    let result = pools.load_meshes(&mut up, &[triangle(), mesh]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(up.uploads.is_empty());
    assert_eq!(pools.mesh_count(), 0);
}
