use super::*;

// ============================================================================
// Append behavior
// ============================================================================

#[test]
fn test_appends_back_to_back() {
    let mut ranges = RangeAllocator::new(100);
    assert_eq!(ranges.allocate(12), Some(0));
    assert_eq!(ranges.allocate(24), Some(12));
    assert_eq!(ranges.allocate(36), Some(36));
    assert_eq!(ranges.end(), 72);
    assert_eq!(ranges.used(), 72);
}

#[test]
fn test_overflow_fails_without_side_effects() {
    let mut ranges = RangeAllocator::new(32);
    assert_eq!(ranges.allocate(30), Some(0));
    assert_eq!(ranges.allocate(4), None);
    assert_eq!(ranges.end(), 30);
    assert_eq!(ranges.allocate(2), Some(30));
}

#[test]
fn test_zero_size_reserves_nothing() {
    let mut ranges = RangeAllocator::new(16);
    ranges.allocate(8);
    assert_eq!(ranges.allocate(0), Some(8));
    assert_eq!(ranges.end(), 8);
}

// ============================================================================
// Reclamation
// ============================================================================

#[test]
fn test_free_at_end_shrinks() {
    let mut ranges = RangeAllocator::new(64);
    ranges.allocate(16);
    let b = ranges.allocate(16).unwrap();
    ranges.free(b, 16);
    assert_eq!(ranges.end(), 16);
    assert_eq!(ranges.fragment_count(), 0);
}

#[test]
fn test_hole_is_reused_first_fit() {
    let mut ranges = RangeAllocator::new(64);
    let a = ranges.allocate(16).unwrap();
    ranges.allocate(16);
    ranges.free(a, 16);
    assert_eq!(ranges.fragment_count(), 1);

    assert_eq!(ranges.allocate(10), Some(0));
    assert_eq!(ranges.allocate(6), Some(10));
    assert_eq!(ranges.fragment_count(), 0);
    assert_eq!(ranges.allocate(4), Some(32));
}

#[test]
fn test_adjacent_holes_coalesce() {
    let mut ranges = RangeAllocator::new(64);
    let a = ranges.allocate(8).unwrap();
    let b = ranges.allocate(8).unwrap();
    let c = ranges.allocate(8).unwrap();
    ranges.allocate(8);

    ranges.free(a, 8);
    ranges.free(c, 8);
    assert_eq!(ranges.fragment_count(), 2);
    ranges.free(b, 8);
    assert_eq!(ranges.fragment_count(), 1);
    assert_eq!(ranges.allocate(24), Some(0));
}

#[test]
fn test_tail_free_absorbs_trailing_hole() {
    let mut ranges = RangeAllocator::new(64);
    ranges.allocate(8);
    let b = ranges.allocate(8).unwrap();
    let c = ranges.allocate(8).unwrap();
    ranges.free(b, 8);
    ranges.free(c, 8);
    assert_eq!(ranges.end(), 8);
    assert_eq!(ranges.fragment_count(), 0);
    assert_eq!(ranges.used(), 8);
}

#[test]
fn test_reverse_free_restores_state() {
    let mut ranges = RangeAllocator::new(64);
    ranges.allocate(4);
    let before = ranges.end();
    let x = ranges.allocate(10).unwrap();
    let y = ranges.allocate(20).unwrap();
    ranges.free(y, 20);
    ranges.free(x, 10);
    assert_eq!(ranges.end(), before);
}
