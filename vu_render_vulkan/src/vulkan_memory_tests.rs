use super::*;

fn props(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
    let mut props = vk::PhysicalDeviceMemoryProperties::default();
    for (i, &flags) in types.iter().enumerate() {
        props.memory_types[i] = vk::MemoryType { property_flags: flags, heap_index: 0 };
    }
    props.memory_type_count = types.len() as u32;
    props
}

const LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
const VISIBLE: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_VISIBLE;
const COHERENT: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_COHERENT;

// ============================================================================
// find_memory_type
// ============================================================================

#[test]
fn test_first_matching_type_is_chosen() {
    let p = props(&[LOCAL, VISIBLE | COHERENT, VISIBLE | COHERENT]);
    assert_eq!(find_memory_type(&p, 0b111, VISIBLE | COHERENT), Some(1));
}

#[test]
fn test_type_bits_filter_candidates() {
    let p = props(&[VISIBLE | COHERENT, LOCAL, VISIBLE | COHERENT]);
    assert_eq!(find_memory_type(&p, 0b100, VISIBLE), Some(2));
}

#[test]
fn test_flags_must_all_be_present() {
    let p = props(&[VISIBLE, LOCAL]);
    assert_eq!(find_memory_type(&p, 0b11, VISIBLE | COHERENT), None);
}

#[test]
fn test_superset_flags_satisfy_request() {
    let p = props(&[LOCAL | VISIBLE | COHERENT]);
    assert_eq!(find_memory_type(&p, 0b1, LOCAL), Some(0));
}

#[test]
fn test_types_past_count_are_ignored() {
    let mut p = props(&[LOCAL]);
    p.memory_types[1] = vk::MemoryType { property_flags: VISIBLE, heap_index: 0 };
    assert_eq!(find_memory_type(&p, 0b11, VISIBLE), None);
}

// ============================================================================
// uniform_memory_flags
// ============================================================================

#[test]
fn test_uniform_flags_prefer_device_local() {
    assert!(uniform_memory_flags(true).contains(LOCAL | VISIBLE | COHERENT));
    assert!(!uniform_memory_flags(false).contains(LOCAL));
    assert!(uniform_memory_flags(false).contains(VISIBLE | COHERENT));
}
