use super::*;

// ============================================================================
// BufferData
// ============================================================================

#[test]
fn test_from_slice_vec3() {
    let data = BufferData::from_slice(&[0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0], 3);
    assert_eq!(data.count, 2);
    assert_eq!(data.stride, 12);
    assert_eq!(data.bytes.len(), 24);
    assert!(data.validate().is_ok());
}

#[test]
fn test_from_indices() {
    let data = BufferData::from_indices(&[0, 1, 2]);
    assert_eq!(data.count, 3);
    assert_eq!(data.stride, 2);
}

#[test]
fn test_new_rejects_wrong_length() {
    assert!(matches!(
        BufferData::new(vec![0; 10], 3, 4),
        Err(Error::InvalidResource(_))
    ));
    assert!(BufferData::new(vec![0; 12], 3, 4).is_ok());
}

// ============================================================================
// MeshData / InstanceData
// ============================================================================

#[test]
fn test_mesh_data_builder() {
    let mesh = MeshData::new()
        .with(VertexKind::Position, BufferData::from_slice(&[0.0f32; 9], 3))
        .with(VertexKind::Index, BufferData::from_indices(&[0, 1, 2]));
    assert!(mesh.get(VertexKind::Position).is_some());
    assert!(mesh.get(VertexKind::Normal).is_none());
    assert_eq!(mesh.index_count(), 3);
}

#[test]
fn test_instance_data_builder() {
    let inst = InstanceData::new().with(InstanceKind::Scale, BufferData::from_slice(&[1.0f32, 2.0], 1));
    assert_eq!(inst.get(InstanceKind::Scale).map(|d| d.count), Some(2));
    assert!(inst.get(InstanceKind::Color).is_none());
}

#[test]
fn test_kind_indices_are_dense() {
    for (i, kind) in VertexKind::ALL.iter().enumerate() {
        assert_eq!(kind.index(), i);
    }
    for (i, kind) in InstanceKind::ALL.iter().enumerate() {
        assert_eq!(kind.index(), i);
    }
}

// ============================================================================
// BufferRange
// ============================================================================

#[test]
fn test_range_end() {
    let range = BufferRange { offset: 24, count: 3, stride: 12 };
    assert_eq!(range.size(), 36);
    assert_eq!(range.end(), 60);
}

#[test]
fn test_range_matches_shape() {
    let range = BufferRange { offset: 0, count: 2, stride: 4 };
    assert!(range.matches(Some(&BufferData::from_slice(&[1.0f32, 2.0], 1))));
    assert!(!range.matches(Some(&BufferData::from_slice(&[1.0f32, 2.0, 3.0], 1))));
    assert!(!range.matches(None));
    assert!(BufferRange::default().matches(None));
}
